use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::AccountInfo;
use crate::repositories::accounts::{
    AccountRepository, AuthOutcome, RegisterOutcome, TokenOutcome,
};

pub enum AccountRequest {
    Register {
        username: String,
        display_name: String,
        password: String,
        email: Option<String>,
        response: oneshot::Sender<Result<AccountInfo, ServiceError>>,
    },
    Login {
        username_or_email: String,
        password: String,
        response: oneshot::Sender<Result<AccountInfo, ServiceError>>,
    },
    ChargeTokens {
        username: String,
        amount: i64,
        response: oneshot::Sender<Result<i64, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct AccountRequestHandler {
    repository: AccountRepository,
}

impl AccountRequestHandler {
    pub fn new(sql_conn: SqlitePool) -> Self {
        let repository = AccountRepository::new(sql_conn);

        AccountRequestHandler { repository }
    }

    pub async fn init(&self) -> Result<(), anyhow::Error> {
        self.repository.init_schema().await
    }

    async fn register(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<AccountInfo, ServiceError> {
        let outcome = self
            .repository
            .register(username, display_name, password, email)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        match outcome {
            RegisterOutcome::Created(account) => Ok(AccountInfo::from(&account)),
            RegisterOutcome::UsernameTaken => Err(ServiceError::UsernameTaken),
            RegisterOutcome::EmailTaken => Err(ServiceError::EmailTaken),
        }
    }

    async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AccountInfo, ServiceError> {
        let outcome = self
            .repository
            .authenticate(username_or_email, password)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        match outcome {
            AuthOutcome::Authenticated(account) => Ok(AccountInfo::from(&account)),
            AuthOutcome::Rejected => Err(ServiceError::AuthFailed),
        }
    }

    /// Charge the relational balance. This is the quick-predict charging
    /// path; it deliberately does not touch the JSON ledger.
    async fn charge_tokens(&self, username: &str, amount: i64) -> Result<i64, ServiceError> {
        let outcome = self
            .repository
            .deduct_tokens(username, amount)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        match outcome {
            TokenOutcome::Updated { tokens_remaining } => Ok(tokens_remaining),
            TokenOutcome::InsufficientBalance => Err(ServiceError::InsufficientBalance),
            TokenOutcome::UserNotFound => Err(ServiceError::UserNotFound),
        }
    }
}

#[async_trait]
impl RequestHandler<AccountRequest> for AccountRequestHandler {
    async fn handle_request(&self, request: AccountRequest) {
        match request {
            AccountRequest::Register {
                username,
                display_name,
                password,
                email,
                response,
            } => {
                let result = self
                    .register(&username, &display_name, &password, email)
                    .await;
                let _ = response.send(result);
            }
            AccountRequest::Login {
                username_or_email,
                password,
                response,
            } => {
                let result = self.login(&username_or_email, &password).await;
                let _ = response.send(result);
            }
            AccountRequest::ChargeTokens {
                username,
                amount,
                response,
            } => {
                let result = self.charge_tokens(&username, amount).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AccountService;

impl AccountService {
    pub fn new() -> Self {
        AccountService {}
    }
}

#[async_trait]
impl Service<AccountRequest, AccountRequestHandler> for AccountService {}

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::repositories::json_store::StoreError;
use crate::settings::Settings;

mod accounts;
mod http;
mod ledger;

/// Failure taxonomy shared by all services. The domain outcomes (user not
/// found, insufficient tokens, spin limit, uniqueness, bad credentials) are
/// returned to clients as `{ok: false}` bodies with HTTP 200; the rest map
/// to 500.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient tokens")]
    InsufficientBalance,
    #[error("no spins left today")]
    NoSpinsLeft,
    #[error("username exists")]
    UsernameTaken,
    #[error("email exists")]
    EmailTaken,
    #[error("Invalid username or password")]
    AuthFailed,
    #[error("store malformed: {0}")]
    MalformedStore(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("communication error: {0} - {1}")]
    Communication(String, String),
}

impl ServiceError {
    /// True for outcomes that belong to the request, not the service.
    fn is_domain_outcome(&self) -> bool {
        matches!(
            self,
            ServiceError::UserNotFound
                | ServiceError::InsufficientBalance
                | ServiceError::NoSpinsLeft
                | ServiceError::UsernameTaken
                | ServiceError::EmailTaken
                | ServiceError::AuthFailed
        )
    }

    /// Map a repository failure, keeping a corrupt store distinguishable
    /// from ordinary i/o trouble.
    fn from_storage(e: anyhow::Error) -> Self {
        match e.downcast_ref::<StoreError>() {
            Some(StoreError::Malformed { .. }) => ServiceError::MalformedStore(e.to_string()),
            _ => ServiceError::Storage(e.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: SqlitePool, settings: Settings) -> Result<(), anyhow::Error> {
    let (ledger_tx, mut ledger_rx) = mpsc::channel(512);
    let (account_tx, mut account_rx) = mpsc::channel(512);

    let mut ledger_service = ledger::LedgerService::new();
    let mut account_service = accounts::AccountService::new();

    log::info!("Starting ledger service.");
    let ledger_handler = ledger::LedgerRequestHandler::new(&settings.storage);
    tokio::spawn(async move {
        ledger_service.run(ledger_handler, &mut ledger_rx).await;
    });

    log::info!("Starting account service.");
    let account_handler = accounts::AccountRequestHandler::new(pool);
    account_handler.init().await?;
    tokio::spawn(async move {
        account_service.run(account_handler, &mut account_rx).await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(ledger_tx, account_tx, &settings).await
}

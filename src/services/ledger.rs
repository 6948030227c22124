use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::{RequestHandler, Service, ServiceError};
use crate::models::predictions::{LeaderboardEntry, NewPrediction, PredictionRecord};
use crate::models::users::BalanceView;
use crate::repositories::json_store::JsonStore;
use crate::repositories::predictions::PredictionFileRepository;
use crate::repositories::users::{
    BackfillSummary, DeductOutcome, SpinOutcome, SpinStatusView, UserFileRepository,
};
use crate::settings::Storage;

/// Tokens consumed by one prediction submission.
pub const PREDICTION_COST: i64 = 10;

#[derive(Clone, Debug, Serialize)]
pub struct SpinSuccess {
    pub reward: i64,
    pub tokens_remaining: i64,
    pub spins_left: i64,
}

pub enum LedgerRequest {
    GetBalance {
        username: String,
        response: oneshot::Sender<Result<BalanceView, ServiceError>>,
    },
    GetUser {
        username: String,
        response: oneshot::Sender<Result<Value, ServiceError>>,
    },
    GetReferralCode {
        username: String,
        response: oneshot::Sender<Result<Option<String>, ServiceError>>,
    },
    SubmitPrediction {
        username: String,
        payload: NewPrediction,
        response: oneshot::Sender<Result<PredictionRecord, ServiceError>>,
    },
    ListPredictions {
        username: String,
        response: oneshot::Sender<Result<Vec<PredictionRecord>, ServiceError>>,
    },
    Spin {
        username: String,
        response: oneshot::Sender<Result<SpinSuccess, ServiceError>>,
    },
    SpinStatus {
        username: String,
        response: oneshot::Sender<Result<SpinStatusView, ServiceError>>,
    },
    EnsureDefaultTokens {
        response: oneshot::Sender<Result<BackfillSummary, ServiceError>>,
    },
    Leaderboard {
        top: usize,
        response: oneshot::Sender<Result<Vec<LeaderboardEntry>, ServiceError>>,
    },
    ListUsers {
        response: oneshot::Sender<Result<Vec<Value>, ServiceError>>,
    },
    ListAllPredictions {
        response: oneshot::Sender<Result<Vec<PredictionRecord>, ServiceError>>,
    },
    ListReferrals {
        response: oneshot::Sender<Result<Vec<Value>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct LedgerRequestHandler {
    users: UserFileRepository,
    predictions: PredictionFileRepository,
    referrals: JsonStore,
}

impl LedgerRequestHandler {
    pub fn new(storage: &Storage) -> Self {
        LedgerRequestHandler {
            users: UserFileRepository::new(JsonStore::new(storage.users_file())),
            predictions: PredictionFileRepository::new(JsonStore::new(
                storage.predictions_file(),
            )),
            referrals: JsonStore::new(storage.referrals_file()),
        }
    }

    fn get_balance(&self, username: &str) -> Result<BalanceView, ServiceError> {
        self.users
            .balance(username)
            .map_err(ServiceError::from_storage)?
            .ok_or(ServiceError::UserNotFound)
    }

    fn get_user(&self, username: &str) -> Result<Value, ServiceError> {
        let user = self
            .users
            .get(username)
            .map_err(ServiceError::from_storage)?
            .ok_or(ServiceError::UserNotFound)?;
        Ok(user.sanitized())
    }

    fn get_referral_code(&self, username: &str) -> Result<Option<String>, ServiceError> {
        let user = self
            .users
            .get(username)
            .map_err(ServiceError::from_storage)?
            .ok_or(ServiceError::UserNotFound)?;
        Ok(user.referral_code)
    }

    /// The prediction-submission workflow: deduct the fee and append the
    /// record, both against freshly re-read state. If the append fails after
    /// the deduction persisted, the fee is credited back so the caller sees
    /// all-or-nothing behavior.
    fn submit_prediction(
        &self,
        username: &str,
        payload: NewPrediction,
    ) -> Result<PredictionRecord, ServiceError> {
        match self
            .users
            .deduct(username, PREDICTION_COST)
            .map_err(ServiceError::from_storage)?
        {
            DeductOutcome::UserNotFound => return Err(ServiceError::UserNotFound),
            DeductOutcome::InsufficientBalance => return Err(ServiceError::InsufficientBalance),
            DeductOutcome::Deducted { .. } => {}
        }

        match self.predictions.append(username, payload) {
            Ok(record) => Ok(record),
            Err(append_err) => {
                if let Err(refund_err) = self.users.credit(username, PREDICTION_COST) {
                    log::error!(
                        "Failed to refund {} tokens to {} after append failure: {}",
                        PREDICTION_COST,
                        username,
                        refund_err
                    );
                }
                Err(ServiceError::from_storage(append_err))
            }
        }
    }

    fn spin(&self, username: &str) -> Result<SpinSuccess, ServiceError> {
        match self.users.spin(username).map_err(ServiceError::from_storage)? {
            SpinOutcome::UserNotFound => Err(ServiceError::UserNotFound),
            SpinOutcome::Exhausted => Err(ServiceError::NoSpinsLeft),
            SpinOutcome::Spun {
                reward,
                tokens_remaining,
                spins_left,
            } => Ok(SpinSuccess {
                reward,
                tokens_remaining,
                spins_left,
            }),
        }
    }

    fn spin_status(&self, username: &str) -> Result<SpinStatusView, ServiceError> {
        self.users
            .spin_status(username)
            .map_err(ServiceError::from_storage)?
            .ok_or(ServiceError::UserNotFound)
    }

    fn ensure_default_tokens(&self) -> Result<BackfillSummary, ServiceError> {
        self.users
            .ensure_default_tokens()
            .map_err(ServiceError::from_storage)
    }

    fn list_users(&self) -> Result<Vec<Value>, ServiceError> {
        let users = self.users.list().map_err(ServiceError::from_storage)?;
        Ok(users.iter().map(|u| u.sanitized()).collect())
    }

    fn list_referrals(&self) -> Result<Vec<Value>, ServiceError> {
        self.referrals
            .read()
            .map_err(|e| ServiceError::from_storage(e.into()))
    }
}

#[async_trait]
impl RequestHandler<LedgerRequest> for LedgerRequestHandler {
    async fn handle_request(&self, request: LedgerRequest) {
        match request {
            LedgerRequest::GetBalance { username, response } => {
                let _ = response.send(self.get_balance(&username));
            }
            LedgerRequest::GetUser { username, response } => {
                let _ = response.send(self.get_user(&username));
            }
            LedgerRequest::GetReferralCode { username, response } => {
                let _ = response.send(self.get_referral_code(&username));
            }
            LedgerRequest::SubmitPrediction {
                username,
                payload,
                response,
            } => {
                let _ = response.send(self.submit_prediction(&username, payload));
            }
            LedgerRequest::ListPredictions { username, response } => {
                let _ = response.send(
                    self.predictions
                        .list_for_user(&username)
                        .map_err(ServiceError::from_storage),
                );
            }
            LedgerRequest::Spin { username, response } => {
                let _ = response.send(self.spin(&username));
            }
            LedgerRequest::SpinStatus { username, response } => {
                let _ = response.send(self.spin_status(&username));
            }
            LedgerRequest::EnsureDefaultTokens { response } => {
                let _ = response.send(self.ensure_default_tokens());
            }
            LedgerRequest::Leaderboard { top, response } => {
                let _ = response.send(
                    self.predictions
                        .leaderboard(top)
                        .map_err(ServiceError::from_storage),
                );
            }
            LedgerRequest::ListUsers { response } => {
                let _ = response.send(self.list_users());
            }
            LedgerRequest::ListAllPredictions { response } => {
                let _ = response.send(
                    self.predictions
                        .list_all()
                        .map_err(ServiceError::from_storage),
                );
            }
            LedgerRequest::ListReferrals { response } => {
                let _ = response.send(self.list_referrals());
            }
        }
    }
}

pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        LedgerService {}
    }
}

#[async_trait]
impl Service<LedgerRequest, LedgerRequestHandler> for LedgerService {
    // All requests mutate or read one shared file pair, so they are handled
    // in arrival order on this task instead of being spawned concurrently.
    // Two simultaneous deducts therefore cannot both observe the same
    // balance.
    async fn run(&mut self, handler: LedgerRequestHandler, receiver: &mut mpsc::Receiver<LedgerRequest>) {
        while let Some(request) = receiver.recv().await {
            handler.handle_request(request).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::StoredUser;
    use serde_json::json;
    use tempfile::TempDir;

    fn handler_with(users: &[StoredUser]) -> (TempDir, LedgerRequestHandler) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage {
            data_dir: dir.path().to_string_lossy().into_owned(),
        };
        storage.provision().expect("provision");
        let handler = LedgerRequestHandler::new(&storage);

        let store = JsonStore::new(storage.users_file());
        store.write(users).expect("seed");
        (dir, handler)
    }

    fn user(name: &str, tokens: Option<i64>) -> StoredUser {
        let mut user = StoredUser::new(name);
        user.tokens = tokens;
        user
    }

    fn payload() -> NewPrediction {
        NewPrediction {
            input: Some(json!({"team1": "CSK", "team2": "MI"})),
            result: Some(json!({"predicted_winner": "CSK"})),
            note: None,
        }
    }

    #[test]
    fn submission_charges_the_fee_and_records_the_prediction() {
        let (_dir, handler) = handler_with(&[user("alice", Some(25))]);

        let record = handler
            .submit_prediction("alice", payload())
            .expect("submit");
        assert_eq!(record.user, "alice");

        let balance = handler.get_balance("alice").expect("balance");
        assert_eq!(balance.tokens, 15);

        let listed = handler
            .predictions
            .list_for_user("alice")
            .expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn insufficient_balance_changes_neither_store() {
        let (_dir, handler) = handler_with(&[user("bob", Some(5))]);

        let outcome = handler.submit_prediction("bob", payload());
        assert!(matches!(outcome, Err(ServiceError::InsufficientBalance)));

        let balance = handler.get_balance("bob").expect("balance");
        assert_eq!(balance.tokens, 5);
        assert!(handler
            .predictions
            .list_for_user("bob")
            .expect("list")
            .is_empty());
    }

    #[test]
    fn submission_for_unknown_user_is_refused() {
        let (_dir, handler) = handler_with(&[]);
        let outcome = handler.submit_prediction("ghost", payload());
        assert!(matches!(outcome, Err(ServiceError::UserNotFound)));
    }

    #[test]
    fn exact_fee_balance_is_spendable_once() {
        let (_dir, handler) = handler_with(&[user("alice", Some(PREDICTION_COST))]);

        handler
            .submit_prediction("alice", payload())
            .expect("submit");
        assert_eq!(handler.get_balance("alice").expect("balance").tokens, 0);

        let second = handler.submit_prediction("alice", payload());
        assert!(matches!(second, Err(ServiceError::InsufficientBalance)));
        assert_eq!(
            handler
                .predictions
                .list_for_user("alice")
                .expect("list")
                .len(),
            1
        );
    }

    #[test]
    fn spin_limit_is_reported_not_thrown() {
        let (_dir, handler) = handler_with(&[user("alice", Some(15))]);

        handler.spin("alice").expect("first spin");
        handler.spin("alice").expect("second spin");
        let third = handler.spin("alice");
        assert!(matches!(third, Err(ServiceError::NoSpinsLeft)));
    }

    #[test]
    fn sanitized_listings_never_leak_credentials() {
        let mut seeded = user("alice", Some(10));
        seeded.password_hash = Some("deadbeef".to_string());
        seeded.salt = Some("0123456789abcdef".to_string());
        let (_dir, handler) = handler_with(&[seeded]);

        let listed = handler.list_users().expect("list");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].get("password_hash").is_none());
        assert!(listed[0].get("salt").is_none());

        let single = handler.get_user("alice").expect("get");
        assert!(single.get("salt").is_none());
    }

    #[test]
    fn corrupt_users_file_surfaces_as_malformed_store() {
        let (dir, handler) = handler_with(&[]);
        std::fs::write(dir.path().join("users.json"), "{broken").expect("corrupt");

        let outcome = handler.get_balance("alice");
        assert!(matches!(outcome, Err(ServiceError::MalformedStore(_))));
    }
}

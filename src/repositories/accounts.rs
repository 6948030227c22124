use anyhow::Error;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::users::Account;
use crate::utils;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    email TEXT UNIQUE,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    tokens INTEGER NOT NULL DEFAULT 100,
    referral_code TEXT NOT NULL UNIQUE,
    referred_by TEXT,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL,
    last_login DATETIME
)
"#;

#[derive(Clone, Debug)]
pub enum RegisterOutcome {
    Created(Account),
    UsernameTaken,
    EmailTaken,
}

#[derive(Clone, Debug)]
pub enum AuthOutcome {
    Authenticated(Account),
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenOutcome {
    Updated { tokens_remaining: i64 },
    InsufficientBalance,
    UserNotFound,
}

/// Salted digest for stored credentials: sha256 of salt prepended to the
/// password, hex encoded. A fresh 16-character salt is drawn when none is
/// supplied.
pub fn hash_password(password: &str, salt: Option<&str>) -> (String, String) {
    let salt = match salt {
        Some(salt) => salt.to_string(),
        None => Uuid::new_v4().simple().to_string()[..16].to_string(),
    };
    let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    (hex::encode(digest), salt)
}

pub fn verify_password(password: &str, password_hash: &str, salt: &str) -> bool {
    let (computed, _) = hash_password(password, Some(salt));
    computed == password_hash
}

/// Relational account store. Registration and login live here; its `tokens`
/// column is charged only by the quick-predict endpoint and is never
/// reconciled with the JSON ledger.
#[derive(Clone)]
pub struct AccountRepository {
    conn: SqlitePool,
}

impl AccountRepository {
    pub fn new(conn: SqlitePool) -> Self {
        Self { conn }
    }

    pub async fn init_schema(&self) -> Result<(), Error> {
        sqlx::query(SCHEMA).execute(&self.conn).await?;
        Ok(())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.conn)
            .await?;
        Ok(account)
    }

    async fn get_by_username_or_email(&self, key: &str) -> Result<Option<Account>, Error> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM users WHERE username = ?1 OR email = ?1")
                .bind(key)
                .fetch_optional(&self.conn)
                .await?;
        Ok(account)
    }

    /// Create an account with the default token grant. Uniqueness violations
    /// come back as labeled outcomes, whether caught by the pre-checks or by
    /// the UNIQUE constraints on a concurrent commit.
    pub async fn register(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<RegisterOutcome, Error> {
        if self.get_by_username(username).await?.is_some() {
            return Ok(RegisterOutcome::UsernameTaken);
        }

        let email = email.unwrap_or_else(|| format!("{username}@cricket.local"));
        let existing_email =
            sqlx::query_as::<_, Account>("SELECT * FROM users WHERE email = ?1")
                .bind(&email)
                .fetch_optional(&self.conn)
                .await?;
        if existing_email.is_some() {
            return Ok(RegisterOutcome::EmailTaken);
        }

        let (password_hash, salt) = hash_password(password, None);
        let id = Uuid::new_v4().hyphenated().to_string();
        let referral_code = utils::generate_referral_code();
        let created_at = Utc::now().naive_utc();

        let inserted = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users
                (id, username, display_name, email, password_hash, salt,
                 tokens, referral_code, referred_by, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 100, ?7, NULL, 1, ?8)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(display_name)
        .bind(&email)
        .bind(&password_hash)
        .bind(&salt)
        .bind(&referral_code)
        .bind(created_at)
        .fetch_one(&self.conn)
        .await;

        match inserted {
            Ok(account) => Ok(RegisterOutcome::Created(account)),
            // A concurrent insert can slip past the pre-checks; the UNIQUE
            // constraint is the arbiter, with the message only telling the
            // two columns apart.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                if db.message().contains("users.email") {
                    Ok(RegisterOutcome::EmailTaken)
                } else {
                    Ok(RegisterOutcome::UsernameTaken)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials against the stored salt and hash. `last_login` is
    /// only touched on success.
    pub async fn authenticate(&self, key: &str, password: &str) -> Result<AuthOutcome, Error> {
        let account = match self.get_by_username_or_email(key).await? {
            Some(account) => account,
            None => return Ok(AuthOutcome::Rejected),
        };

        if !verify_password(password, &account.password_hash, &account.salt) {
            return Ok(AuthOutcome::Rejected);
        }
        if !account.is_active {
            return Ok(AuthOutcome::Rejected);
        }

        let now = Utc::now().naive_utc();
        let refreshed = sqlx::query_as::<_, Account>(
            "UPDATE users SET last_login = ?1 WHERE id = ?2 RETURNING *",
        )
        .bind(now)
        .bind(&account.id)
        .fetch_one(&self.conn)
        .await?;

        Ok(AuthOutcome::Authenticated(refreshed))
    }

    /// Charge the balance with one conditional statement. The balance check
    /// and the write are a single UPDATE, so concurrent charges for the same
    /// user cannot both spend the same tokens; the losing statement simply
    /// matches no row.
    pub async fn deduct_tokens(&self, username: &str, amount: i64) -> Result<TokenOutcome, Error> {
        let remaining = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET tokens = tokens - ?1 WHERE username = ?2 AND tokens >= ?1 RETURNING tokens",
        )
        .bind(amount)
        .bind(username)
        .fetch_optional(&self.conn)
        .await?;

        match remaining {
            Some(tokens_remaining) => Ok(TokenOutcome::Updated { tokens_remaining }),
            None => {
                if self.get_by_username(username).await?.is_some() {
                    Ok(TokenOutcome::InsufficientBalance)
                } else {
                    Ok(TokenOutcome::UserNotFound)
                }
            }
        }
    }

    /// Counterpart to `deduct_tokens`. No request path credits the
    /// relational balance today; spin rewards land on the JSON ledger.
    #[allow(dead_code)]
    pub async fn add_tokens(&self, username: &str, amount: i64) -> Result<TokenOutcome, Error> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET tokens = tokens + ?1 WHERE username = ?2 RETURNING tokens",
        )
        .bind(amount)
        .bind(username)
        .fetch_optional(&self.conn)
        .await?;

        match updated {
            Some(tokens_remaining) => Ok(TokenOutcome::Updated { tokens_remaining }),
            None => Ok(TokenOutcome::UserNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repo() -> AccountRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        let repo = AccountRepository::new(pool);
        repo.init_schema().await.expect("schema");
        repo
    }

    #[test]
    fn hashing_is_deterministic_per_salt() {
        let (hash, salt) = hash_password("secret", None);
        assert_eq!(salt.len(), 16);
        assert!(verify_password("secret", &hash, &salt));
        assert!(!verify_password("wrong", &hash, &salt));

        let (rehash, _) = hash_password("secret", Some(&salt));
        assert_eq!(hash, rehash);
    }

    #[tokio::test]
    async fn register_grants_default_tokens_and_a_referral_code() {
        let repo = repo().await;
        let outcome = repo
            .register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        let account = match outcome {
            RegisterOutcome::Created(account) => account,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(account.tokens, 100);
        assert_eq!(account.referral_code.len(), 8);
        assert_eq!(account.email.as_deref(), Some("alice@cricket.local"));
        assert!(account.is_active);
        assert!(account.last_login.is_none());
        assert_ne!(account.password_hash, "secret");
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_labeled_failures() {
        let repo = repo().await;
        repo.register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        let dup_name = repo
            .register("alice", "Alice Again", "other", Some("new@cricket.local".into()))
            .await
            .expect("register");
        assert!(matches!(dup_name, RegisterOutcome::UsernameTaken));

        let dup_email = repo
            .register("alice2", "Alice Two", "other", Some("alice@cricket.local".into()))
            .await
            .expect("register");
        assert!(matches!(dup_email, RegisterOutcome::EmailTaken));
    }

    #[tokio::test]
    async fn authenticate_checks_credentials_and_stamps_last_login() {
        let repo = repo().await;
        repo.register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        let rejected = repo.authenticate("alice", "wrong").await.expect("auth");
        assert!(matches!(rejected, AuthOutcome::Rejected));
        let untouched = repo
            .get_by_username("alice")
            .await
            .expect("get")
            .expect("present");
        assert!(untouched.last_login.is_none());

        let accepted = repo.authenticate("alice", "secret").await.expect("auth");
        let account = match accepted {
            AuthOutcome::Authenticated(account) => account,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(account.last_login.is_some());
    }

    #[tokio::test]
    async fn authenticate_accepts_the_email_as_key() {
        let repo = repo().await;
        repo.register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        let outcome = repo
            .authenticate("alice@cricket.local", "secret")
            .await
            .expect("auth");
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
    }

    #[tokio::test]
    async fn token_mutations_are_independent_of_the_json_ledger_defaults() {
        let repo = repo().await;
        repo.register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        let deducted = repo.deduct_tokens("alice", 10).await.expect("deduct");
        assert_eq!(
            deducted,
            TokenOutcome::Updated {
                tokens_remaining: 90
            }
        );

        let refused = repo.deduct_tokens("alice", 1000).await.expect("deduct");
        assert_eq!(refused, TokenOutcome::InsufficientBalance);

        let granted = repo.add_tokens("alice", 15).await.expect("credit");
        assert_eq!(
            granted,
            TokenOutcome::Updated {
                tokens_remaining: 105
            }
        );

        assert_eq!(
            repo.deduct_tokens("ghost", 1).await.expect("deduct"),
            TokenOutcome::UserNotFound
        );
    }

    #[tokio::test]
    async fn concurrent_charges_cannot_overspend() {
        let repo = repo().await;
        repo.register("alice", "Alice", "secret", None)
            .await
            .expect("register");

        // 100 tokens cover only one of these; whichever UPDATE runs second
        // must match no row.
        let (first, second) = tokio::join!(
            repo.deduct_tokens("alice", 60),
            repo.deduct_tokens("alice", 60)
        );
        let outcomes = [first.expect("deduct"), second.expect("deduct")];
        assert!(outcomes.contains(&TokenOutcome::Updated {
            tokens_remaining: 40
        }));
        assert!(outcomes.contains(&TokenOutcome::InsufficientBalance));

        let account = repo
            .get_by_username("alice")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(account.tokens, 40);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Day-scoped spin counter embedded in a stored user. `count` is reset
/// whenever `date` differs from the current UTC day; it never exceeds two
/// between resets.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpinData {
    pub date: String,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reward: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_spin: Option<String>,
}

impl SpinData {
    pub fn fresh(date: String) -> Self {
        SpinData {
            date,
            count: 0,
            last_reward: None,
            last_spin: None,
        }
    }
}

/// A user record in the flat JSON store. `tokens` being absent means the
/// balance was never provisioned; reads report the 100-token default without
/// persisting it. Unknown fields round-trip untouched through `extra`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoredUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_data: Option<SpinData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredUser {
    // Ledger users are only ever created by seeding the store file; nothing
    // in the request paths constructs one.
    #[cfg(test)]
    pub fn new(username: &str) -> Self {
        StoredUser {
            username: username.to_string(),
            display_name: None,
            password_hash: None,
            salt: None,
            tokens: None,
            referral_code: None,
            referred_by: None,
            spin_data: None,
            extra: Map::new(),
        }
    }

    /// Client-facing projection: the full record minus credential material.
    pub fn sanitized(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut fields)) => {
                fields.remove("password_hash");
                fields.remove("salt");
                Value::Object(fields)
            }
            _ => Value::Null,
        }
    }
}

/// Balance read result. `default_applied` reports that the stored record had
/// no `tokens` field and the 100-token default was substituted in the view.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BalanceView {
    pub tokens: i64,
    pub default_applied: bool,
}

/// Relational account row, the registration/login side of the split user
/// state. Its `tokens` column is independent of the JSON ledger.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub salt: String,
    pub tokens: i64,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub last_login: Option<chrono::NaiveDateTime>,
}

/// Account fields safe to return to clients.
#[derive(Clone, Debug, Serialize)]
pub struct AccountInfo {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub tokens: i64,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        AccountInfo {
            id: account.id.clone(),
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            tokens: account.tokens,
            referral_code: account.referral_code.clone(),
            referred_by: account.referred_by.clone(),
            created_at: account.created_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            last_login: account
                .last_login
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitized_never_exposes_credentials() {
        let mut user = StoredUser::new("alice");
        user.password_hash = Some("deadbeef".to_string());
        user.salt = Some("0123456789abcdef".to_string());
        user.tokens = Some(42);

        let safe = user.sanitized();
        assert!(safe.get("password_hash").is_none());
        assert!(safe.get("salt").is_none());
        assert_eq!(safe["tokens"], json!(42));
        assert_eq!(safe["username"], json!("alice"));
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "username": "bob",
            "tokens": 10,
            "favourite_team": "CSK"
        });
        let user: StoredUser = serde_json::from_value(raw).expect("parse");
        assert_eq!(user.extra["favourite_team"], json!("CSK"));

        let back = serde_json::to_value(&user).expect("serialize");
        assert_eq!(back["favourite_team"], json!("CSK"));
    }

    #[test]
    fn absent_tokens_deserializes_as_none() {
        let user: StoredUser =
            serde_json::from_value(json!({ "username": "carol" })).expect("parse");
        assert!(user.tokens.is_none());
        assert!(user.spin_data.is_none());
    }
}

use anyhow::Error;
use rand::Rng;
use serde::Serialize;

use super::json_store::JsonStore;
use crate::models::users::{BalanceView, SpinData, StoredUser};
use crate::utils;

/// Balance reported for a record with no `tokens` field. Reads substitute it
/// without persisting; only the admin backfill writes it down.
pub const DEFAULT_TOKENS: i64 = 100;

pub const SPIN_REWARDS: [i64; 4] = [5, 15, 50, 100];
pub const MAX_DAILY_SPINS: i64 = 2;

#[derive(Clone, Debug, PartialEq)]
pub enum DeductOutcome {
    Deducted { tokens_remaining: i64 },
    InsufficientBalance,
    UserNotFound,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpinOutcome {
    Spun {
        reward: i64,
        tokens_remaining: i64,
        spins_left: i64,
    },
    Exhausted,
    UserNotFound,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpinStatusView {
    pub spins_left: i64,
    pub last_reward: Option<i64>,
    pub date: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct BackfillSummary {
    pub updated_count: usize,
    pub updated_users: Vec<String>,
}

/// Token ledger over the flat users file. Every operation re-reads the whole
/// collection and mutations rewrite it; the owning service processes
/// requests sequentially so two deducts cannot interleave.
#[derive(Clone, Debug)]
pub struct UserFileRepository {
    store: JsonStore,
}

impl UserFileRepository {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<StoredUser>, Error> {
        Ok(self.store.read()?)
    }

    pub fn get(&self, username: &str) -> Result<Option<StoredUser>, Error> {
        let users = self.list()?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    /// Stored balance, or the non-persisted default when the field is absent.
    pub fn balance(&self, username: &str) -> Result<Option<BalanceView>, Error> {
        let user = match self.get(username)? {
            Some(user) => user,
            None => return Ok(None),
        };

        let view = match user.tokens {
            Some(tokens) => BalanceView {
                tokens,
                default_applied: false,
            },
            None => BalanceView {
                tokens: DEFAULT_TOKENS,
                default_applied: true,
            },
        };
        Ok(Some(view))
    }

    /// Deduct against freshly re-read state. An absent `tokens` field counts
    /// as zero here, unlike the balance read; the default is only a reporting
    /// convention until the backfill materializes it.
    pub fn deduct(&self, username: &str, amount: i64) -> Result<DeductOutcome, Error> {
        let mut users = self.list()?;
        let user = match users.iter_mut().find(|u| u.username == username) {
            Some(user) => user,
            None => return Ok(DeductOutcome::UserNotFound),
        };

        let tokens = user.tokens.unwrap_or(0);
        if tokens < amount {
            return Ok(DeductOutcome::InsufficientBalance);
        }

        let remaining = tokens - amount;
        user.tokens = Some(remaining);
        self.store.write(&users)?;
        Ok(DeductOutcome::Deducted {
            tokens_remaining: remaining,
        })
    }

    /// Credit `amount`, creating the `tokens` field at zero when absent.
    /// Returns the new balance, or `None` when the user does not exist.
    pub fn credit(&self, username: &str, amount: i64) -> Result<Option<i64>, Error> {
        let mut users = self.list()?;
        let user = match users.iter_mut().find(|u| u.username == username) {
            Some(user) => user,
            None => return Ok(None),
        };

        let updated = user.tokens.unwrap_or(0) + amount;
        user.tokens = Some(updated);
        self.store.write(&users)?;
        Ok(Some(updated))
    }

    /// Idempotent admin backfill: give every record missing a `tokens` field
    /// the default balance. Existing values, including zero, are untouched.
    pub fn ensure_default_tokens(&self) -> Result<BackfillSummary, Error> {
        let mut users = self.list()?;
        let mut updated_users = Vec::new();

        for user in users.iter_mut() {
            if user.tokens.is_none() {
                user.tokens = Some(DEFAULT_TOKENS);
                updated_users.push(user.username.clone());
            }
        }

        if !updated_users.is_empty() {
            self.store.write(&users)?;
        }
        Ok(BackfillSummary {
            updated_count: updated_users.len(),
            updated_users,
        })
    }

    pub fn spin(&self, username: &str) -> Result<SpinOutcome, Error> {
        self.spin_on(username, &utils::utc_today())
    }

    /// One turn of the daily wheel. A stored date other than `today` rolls
    /// the counter over before the limit check; the rollover itself is only
    /// persisted when a spin actually happens.
    pub fn spin_on(&self, username: &str, today: &str) -> Result<SpinOutcome, Error> {
        let mut users = self.list()?;
        let user = match users.iter_mut().find(|u| u.username == username) {
            Some(user) => user,
            None => return Ok(SpinOutcome::UserNotFound),
        };

        let mut spin_data = match &user.spin_data {
            Some(data) if data.date == today => data.clone(),
            _ => SpinData::fresh(today.to_string()),
        };

        if spin_data.count >= MAX_DAILY_SPINS {
            return Ok(SpinOutcome::Exhausted);
        }

        let reward = SPIN_REWARDS[rand::thread_rng().gen_range(0..SPIN_REWARDS.len())];
        let tokens_remaining = user.tokens.unwrap_or(0) + reward;

        user.tokens = Some(tokens_remaining);
        spin_data.count += 1;
        spin_data.last_reward = Some(reward);
        spin_data.last_spin = Some(utils::utc_timestamp());
        let spins_left = MAX_DAILY_SPINS - spin_data.count;
        user.spin_data = Some(spin_data);

        self.store.write(&users)?;
        Ok(SpinOutcome::Spun {
            reward,
            tokens_remaining,
            spins_left,
        })
    }

    pub fn spin_status(&self, username: &str) -> Result<Option<SpinStatusView>, Error> {
        self.spin_status_on(username, &utils::utc_today())
    }

    /// Read-only projection of the spin state. The day rollover is applied to
    /// the in-memory view only; the stored record is never mutated here, so a
    /// concurrent spin still sees the stale date and rolls over itself.
    pub fn spin_status_on(
        &self,
        username: &str,
        today: &str,
    ) -> Result<Option<SpinStatusView>, Error> {
        let user = match self.get(username)? {
            Some(user) => user,
            None => return Ok(None),
        };

        let spin_data = match user.spin_data {
            Some(data) if data.date == today => data,
            _ => SpinData::fresh(today.to_string()),
        };

        Ok(Some(SpinStatusView {
            spins_left: MAX_DAILY_SPINS - spin_data.count,
            last_reward: spin_data.last_reward,
            date: today.to_string(),
        }))
    }
}

use std::collections::HashMap;

use anyhow::Error;
use uuid::Uuid;

use super::json_store::JsonStore;
use crate::models::predictions::{LeaderboardEntry, NewPrediction, PredictionRecord};
use crate::utils;

/// Append-only prediction log over the predictions file. Records are never
/// updated or deleted.
#[derive(Clone, Debug)]
pub struct PredictionFileRepository {
    store: JsonStore,
}

impl PredictionFileRepository {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> Result<Vec<PredictionRecord>, Error> {
        Ok(self.store.read()?)
    }

    pub fn list_for_user(&self, username: &str) -> Result<Vec<PredictionRecord>, Error> {
        let records = self.list_all()?;
        Ok(records.into_iter().filter(|p| p.user == username).collect())
    }

    /// Append a record with a generated id and the current UTC timestamp,
    /// returning the stored entry.
    pub fn append(
        &self,
        username: &str,
        payload: NewPrediction,
    ) -> Result<PredictionRecord, Error> {
        let mut records = self.list_all()?;
        let record = PredictionRecord {
            id: Uuid::new_v4().hyphenated().to_string(),
            user: username.to_string(),
            timestamp: utils::utc_timestamp(),
            input: payload.input,
            result: payload.result,
            note: payload.note,
        };
        records.push(record.clone());
        self.store.write(&records)?;
        Ok(record)
    }

    /// Users ranked by prediction count, descending.
    pub fn leaderboard(&self, top: usize) -> Result<Vec<LeaderboardEntry>, Error> {
        let records = self.list_all()?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &records {
            *counts.entry(record.user.clone()).or_default() += 1;
        }

        let mut entries: Vec<LeaderboardEntry> = counts
            .into_iter()
            .map(|(user, predictions)| LeaderboardEntry { user, predictions })
            .collect();
        entries.sort_by(|a, b| b.predictions.cmp(&a.predictions).then(a.user.cmp(&b.user)));
        entries.truncate(top);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn repo() -> (TempDir, PredictionFileRepository) {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonStore::new(dir.path().join("predictions.json"));
        (dir, PredictionFileRepository::new(store))
    }

    fn payload(note: &str) -> NewPrediction {
        NewPrediction {
            input: Some(json!({"team1": "CSK", "team2": "MI"})),
            result: Some(json!({"predicted_winner": "CSK"})),
            note: Some(json!(note)),
        }
    }

    #[test]
    fn append_assigns_id_and_timestamp() {
        let (_dir, repo) = repo();
        let record = repo.append("alice", payload("first")).expect("append");

        assert_eq!(record.user, "alice");
        assert!(!record.id.is_empty());
        assert!(record.timestamp.contains('T'));

        let stored = repo.list_for_user("alice").expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
    }

    #[test]
    fn listing_filters_by_user() {
        let (_dir, repo) = repo();
        repo.append("alice", payload("a")).expect("append");
        repo.append("bob", payload("b")).expect("append");
        repo.append("alice", payload("c")).expect("append");

        assert_eq!(repo.list_for_user("alice").expect("list").len(), 2);
        assert_eq!(repo.list_for_user("bob").expect("list").len(), 1);
        assert!(repo.list_for_user("ghost").expect("list").is_empty());
    }

    #[test]
    fn leaderboard_ranks_by_count() {
        let (_dir, repo) = repo();
        for _ in 0..3 {
            repo.append("alice", payload("x")).expect("append");
        }
        repo.append("bob", payload("y")).expect("append");

        let board = repo.leaderboard(20).expect("leaderboard");
        assert_eq!(board[0].user, "alice");
        assert_eq!(board[0].predictions, 3);
        assert_eq!(board[1].user, "bob");

        let capped = repo.leaderboard(1).expect("leaderboard");
        assert_eq!(capped.len(), 1);
    }
}

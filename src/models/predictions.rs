use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append-only prediction record in the predictions file. The `input` and
/// `result` payloads are stored exactly as submitted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictionRecord {
    pub id: String,
    pub user: String,
    pub timestamp: String,
    pub input: Option<Value>,
    pub result: Option<Value>,
    pub note: Option<Value>,
}

/// Body of `POST /users/{username}/predictions`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewPrediction {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub note: Option<Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
    pub user: String,
    pub predictions: usize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPredictionRequest {
    pub team1: String,
    pub team2: String,
    pub venue: String,
    pub weather: String,
    pub runs_team1: i64,
    pub runs_team2: i64,
    pub wickets_team1: i64,
    pub wickets_team2: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchPrediction {
    pub team1: String,
    pub team2: String,
    pub predicted_winner: String,
    pub team1_score: f64,
    pub team2_score: f64,
    pub winning_probability: f64,
    pub confidence: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WicketPredictionRequest {
    pub team1: String,
    pub team2: String,
    pub overs: i64,
    #[serde(default = "default_wickets")]
    pub wickets_team1: i64,
    #[serde(default = "default_wickets")]
    pub wickets_team2: i64,
}

fn default_wickets() -> i64 {
    3
}

#[derive(Clone, Debug, Serialize)]
pub struct WicketPrediction {
    pub team1: String,
    pub team2: String,
    pub overs: i64,
    pub predicted_wickets: i64,
    pub predicted_boundaries: i64,
    pub predicted_sixes: i64,
    pub predicted_extras: i64,
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{dispatch, failure_response, AppState};
use crate::models::predictions::{
    MatchPredictionRequest, NewPrediction, WicketPredictionRequest,
};
use crate::predictor;
use crate::services::accounts::AccountRequest;
use crate::services::ledger::{LedgerRequest, PREDICTION_COST};
use crate::services::ServiceError;

/// Full match prediction. When a username accompanies the request the fee is
/// charged against the relational account balance; the JSON ledger is only
/// touched by the save-prediction endpoint. The two balances are independent
/// by design.
pub async fn predict_match(
    State(state): State<AppState>,
    Json(req): Json<MatchPredictionRequest>,
) -> impl IntoResponse {
    let prediction = predictor::predict_match(&req);
    let mut body = match serde_json::to_value(&prediction) {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
        }
    };

    let username = req.username.as_deref().map(str::trim).unwrap_or("");
    if username.is_empty() {
        body["note"] = json!("Demo prediction (not charged)");
        return (StatusCode::OK, Json(body));
    }

    let charge = dispatch(&state.account_channel, |response| {
        AccountRequest::ChargeTokens {
            username: username.to_string(),
            amount: PREDICTION_COST,
            response,
        }
    })
    .await;

    match charge {
        Ok(tokens_remaining) => {
            body["charged_user"] = json!(username);
            body["tokens_remaining"] = json!(tokens_remaining);
            (StatusCode::OK, Json(body))
        }
        // No account yet: serve the prediction uncharged rather than failing.
        Err(ServiceError::UserNotFound) => {
            body["note"] = json!("Demo prediction (user account not found)");
            (StatusCode::OK, Json(body))
        }
        Err(error) => failure_response(&error),
    }
}

pub async fn predict_wickets(Json(req): Json<WicketPredictionRequest>) -> impl IntoResponse {
    Json(json!(predictor::predict_wickets(&req)))
}

#[derive(Deserialize)]
pub struct QuickPredictQuery {
    team1: String,
    team2: String,
    team1_score: i64,
    team2_score: i64,
    // Accepted for interface compatibility; the scoring formula ignores it.
    #[allow(dead_code)]
    overs: i64,
    #[serde(default = "default_venue")]
    venue: String,
    #[serde(default = "default_weather")]
    weather: String,
}

fn default_venue() -> String {
    "Neutral".to_string()
}

fn default_weather() -> String {
    "Sunny".to_string()
}

pub async fn quick_predict(Query(query): Query<QuickPredictQuery>) -> impl IntoResponse {
    let request = MatchPredictionRequest {
        team1: query.team1,
        team2: query.team2,
        venue: query.venue,
        weather: query.weather,
        runs_team1: query.team1_score,
        runs_team2: query.team2_score,
        wickets_team1: 3,
        wickets_team2: 3,
        username: None,
    };
    Json(json!(predictor::predict_match(&request)))
}

pub async fn submit_prediction(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<NewPrediction>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::SubmitPrediction {
            username,
            payload,
            response,
        }
    })
    .await;

    match result {
        Ok(prediction) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "prediction": prediction })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn list_user_predictions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::ListPredictions { username, response }
    })
    .await;

    match result {
        Ok(predictions) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "predictions": predictions })),
        ),
        Err(error) => failure_response(&error),
    }
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_top")]
    top: usize,
}

fn default_top() -> usize {
    20
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::Leaderboard {
            top: query.top,
            response,
        }
    })
    .await;

    match result {
        Ok(entries) => (StatusCode::OK, Json(json!({ "top": entries }))),
        Err(error) => failure_response(&error),
    }
}

pub async fn admin_list_predictions(State(state): State<AppState>) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::ListAllPredictions { response }
    })
    .await;

    match result {
        Ok(predictions) => (StatusCode::OK, Json(json!(predictions))),
        Err(error) => failure_response(&error),
    }
}

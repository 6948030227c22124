use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::accounts::AccountRequest;
use super::ledger::LedgerRequest;
use super::ServiceError;
use crate::models::teams::{self, SEASON, TEAMS, VENUES};
use crate::settings::Settings;

mod predictions;
mod users;

pub const API_VERSION: &str = "2.0";

#[derive(Clone)]
struct AppState {
    ledger_channel: mpsc::Sender<LedgerRequest>,
    account_channel: mpsc::Sender<AccountRequest>,
    frontend_url: String,
}

/// Round-trip a request through a service channel.
async fn dispatch<R, T>(
    channel: &mpsc::Sender<R>,
    make: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();
    channel
        .send(make(response_tx))
        .await
        .map_err(|e| ServiceError::Communication("http".to_string(), e.to_string()))?;
    response_rx
        .await
        .map_err(|e| ServiceError::Communication("http".to_string(), e.to_string()))?
}

/// Domain outcomes ride an HTTP 200 with `{ok: false}`; service faults are
/// genuine 500s. Clients must inspect the body, not the status code.
fn failure_response(error: &ServiceError) -> (StatusCode, Json<Value>) {
    let status = if error.is_domain_outcome() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "ok": false, "error": error.to_string() })))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the crickcast prediction API!",
        "version": API_VERSION,
        "features": [
            "Match Prediction",
            "Wicket Prediction",
            "Team Information",
            "Token Ledger",
            "Daily Spin Rewards"
        ]
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "API is running",
        "version": API_VERSION,
        "season": SEASON,
        "teams": TEAMS.len(),
        "venues": VENUES.len()
    }))
}

async fn list_teams() -> impl IntoResponse {
    let codes: Vec<&str> = TEAMS.iter().map(|t| t.name).collect();
    Json(json!({
        "teams": codes,
        "count": codes.len(),
        "season": SEASON
    }))
}

async fn team_info(Path(team_name): Path<String>) -> impl IntoResponse {
    let normalized = teams::normalize_name(&team_name);
    match teams::short_name(&normalized).and_then(teams::by_code) {
        Some(team) => Json(json!(team)),
        None => Json(json!({ "error": format!("Team '{team_name}' not found") })),
    }
}

async fn list_venues() -> impl IntoResponse {
    Json(json!({
        "venues": VENUES,
        "count": VENUES.len(),
        "season": SEASON
    }))
}

async fn team_stats() -> impl IntoResponse {
    let stats: Vec<Value> = TEAMS
        .iter()
        .map(|team| {
            json!({
                "name": team.name,
                "fullName": team.full_name,
                "captain": team.captain,
                "titles": team.titles,
                "topScorer": team.top_scorer,
                "topBowler": team.top_bowler
            })
        })
        .collect();
    Json(json!({ "teams_stats": stats, "count": TEAMS.len() }))
}

#[derive(Deserialize)]
struct CompareQuery {
    team1: String,
    team2: String,
}

async fn compare_teams(Query(query): Query<CompareQuery>) -> impl IntoResponse {
    let first = teams::short_name(&teams::normalize_name(&query.team1)).and_then(teams::by_code);
    let second = teams::short_name(&teams::normalize_name(&query.team2)).and_then(teams::by_code);

    let (first, second) = match (first, second) {
        (Some(a), Some(b)) => (a, b),
        _ => return Json(json!({ "error": "One or both teams not found" })),
    };

    let title_gap = first.titles as i64 - second.titles as i64;
    let message = if title_gap == 0 {
        "Teams have equal titles".to_string()
    } else {
        format!("{} has {} more titles", first.name, title_gap.abs())
    };

    Json(json!({
        "team1": first,
        "team2": second,
        "comparison": { "titles": title_gap, "message": message }
    }))
}

pub async fn start_http_server(
    ledger_channel: mpsc::Sender<LedgerRequest>,
    account_channel: mpsc::Sender<AccountRequest>,
    settings: &Settings,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        ledger_channel,
        account_channel,
        frontend_url: settings.frontend.url.clone(),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/teams", get(list_teams))
        .route("/team/{team_name}", get(team_info))
        .route("/venues", get(list_venues))
        .route("/stats/teams", get(team_stats))
        .route("/stats/compare", get(compare_teams))
        .route("/predict/match", post(predictions::predict_match))
        .route("/predict/wickets", post(predictions::predict_wickets))
        .route("/predict", get(predictions::quick_predict))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/referral", get(users::get_referral))
        .route("/users/{username}/balance", get(users::get_balance))
        .route(
            "/users/{username}/predictions",
            get(predictions::list_user_predictions).post(predictions::submit_prediction),
        )
        .route("/users/{username}/spin", post(users::spin))
        .route("/users/{username}/spin_status", get(users::spin_status))
        .route("/leaderboard", get(predictions::leaderboard))
        .route("/_admin/list_users", get(users::admin_list_users))
        .route(
            "/_admin/list_predictions",
            get(predictions::admin_list_predictions),
        )
        .route("/_admin/list_referrals", get(users::admin_list_referrals))
        .route(
            "/_admin/ensure_default_tokens",
            post(users::admin_ensure_default_tokens),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

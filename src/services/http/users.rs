use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{dispatch, failure_response, AppState};
use crate::models::users::{LoginRequest, RegisterRequest};
use crate::services::accounts::AccountRequest;
use crate::services::ledger::LedgerRequest;
use crate::services::ServiceError;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let username = req.username.trim().to_string();
    let password = req.password.trim().to_string();
    if username.is_empty() {
        return (
            StatusCode::OK,
            Json(json!({ "ok": false, "error": "username is required" })),
        );
    }
    if password.is_empty() {
        return (
            StatusCode::OK,
            Json(json!({ "ok": false, "error": "password is required" })),
        );
    }
    let display_name = req
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| username.clone());

    let result = dispatch(&state.account_channel, |response| {
        AccountRequest::Register {
            username,
            display_name,
            password,
            email: req.email,
            response,
        }
    })
    .await;

    match result {
        Ok(account) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "user": account,
                "token": Uuid::new_v4().hyphenated().to_string()
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let key = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| req.email.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string);
    let password = req.password.trim().to_string();

    let key = match key {
        Some(key) if !password.is_empty() => key,
        _ => {
            return (
                StatusCode::OK,
                Json(json!({
                    "ok": false,
                    "error": "username and password are required"
                })),
            )
        }
    };

    let result = dispatch(&state.account_channel, |response| AccountRequest::Login {
        username_or_email: key,
        password,
        response,
    })
    .await;

    match result {
        Ok(account) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "user": account,
                "token": Uuid::new_v4().hyphenated().to_string()
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| LedgerRequest::GetUser {
        username,
        response,
    })
    .await;

    match result {
        Ok(user) => (StatusCode::OK, Json(json!({ "ok": true, "user": user }))),
        Err(error) => failure_response(&error),
    }
}

#[derive(Deserialize)]
pub struct ReferralQuery {
    base_url: Option<String>,
}

pub async fn get_referral(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<ReferralQuery>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::GetReferralCode { username, response }
    })
    .await;

    let code = match result {
        Ok(Some(code)) => code,
        Ok(None) => {
            return (
                StatusCode::OK,
                Json(json!({ "ok": false, "error": "no referral code found" })),
            )
        }
        Err(error) => return failure_response(&error),
    };

    // Explicit override first, then the deployment environment, then the
    // configured default.
    let frontend = query
        .base_url
        .or_else(|| std::env::var("FRONTEND_URL").ok())
        .unwrap_or_else(|| state.frontend_url.clone());
    let link = format!("{}?ref={}", frontend.trim_end_matches('/'), code);

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "referral_code": code,
            "referral_link": link
        })),
    )
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::GetBalance {
            username: username.clone(),
            response,
        }
    })
    .await;

    match result {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "username": username,
                "tokens": balance.tokens,
                "default_applied": balance.default_applied
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn spin(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| LedgerRequest::Spin {
        username,
        response,
    })
    .await;

    match result {
        Ok(spin) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "reward": spin.reward,
                "tokens_remaining": spin.tokens_remaining,
                "spins_left": spin.spins_left
            })),
        ),
        Err(ServiceError::NoSpinsLeft) => (
            StatusCode::OK,
            Json(json!({
                "ok": false,
                "error": "no spins left today",
                "spins_left": 0
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn spin_status(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::SpinStatus { username, response }
    })
    .await;

    match result {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "spins_left": status.spins_left,
                "last_reward": status.last_reward,
                "date": status.date
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

pub async fn admin_list_users(State(state): State<AppState>) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::ListUsers { response }
    })
    .await;

    match result {
        Ok(users) => (StatusCode::OK, Json(json!(users))),
        Err(error) => failure_response(&error),
    }
}

pub async fn admin_list_referrals(State(state): State<AppState>) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::ListReferrals { response }
    })
    .await;

    match result {
        Ok(referrals) => (StatusCode::OK, Json(json!(referrals))),
        Err(error) => failure_response(&error),
    }
}

pub async fn admin_ensure_default_tokens(State(state): State<AppState>) -> impl IntoResponse {
    let result = dispatch(&state.ledger_channel, |response| {
        LedgerRequest::EnsureDefaultTokens { response }
    })
    .await;

    match result {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "updated_count": summary.updated_count,
                "updated_users": summary.updated_users
            })),
        ),
        Err(error) => failure_response(&error),
    }
}

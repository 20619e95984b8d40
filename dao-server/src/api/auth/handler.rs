//! Authentication handlers

use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::auth::{Principal, SESSION_HEADER};
use crate::core::ServerState;
use crate::db::models::User;
use crate::utils::{AppError, AppResult};
use shared::ApiResponse;

#[derive(Serialize)]
pub struct HelloResponse {
    pub nonce: String,
}

/// GET /v1/auth/hello - issue a signing nonce
pub async fn hello(State(state): State<ServerState>) -> Json<ApiResponse<HelloResponse>> {
    let nonce = state.facade.auth.login_hello().await;
    Json(ApiResponse::ok(HelloResponse { nonce }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub address: String,
    pub nonce: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub created: bool,
}

/// POST /v1/auth/login - verify the signed nonce and open a session
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let outcome = state
        .facade
        .auth
        .login(&payload.address, &payload.nonce, &payload.signature)
        .await?;
    Ok(Json(ApiResponse::ok(LoginResponse {
        token: outcome.token,
        user: outcome.user,
        created: outcome.created,
    })))
}

fn session_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)
}

/// POST /v1/auth/logout - revoke the presented session
pub async fn logout(
    State(state): State<ServerState>,
    _principal: Principal,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<()>>> {
    let token = session_token(&headers)?;
    state.facade.auth.logout(token).await?;
    Ok(Json(ApiResponse::ok(())))
}

/// POST /v1/auth/cancel - mark the account for deletion and revoke the session
pub async fn cancel(
    State(state): State<ServerState>,
    principal: Principal,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<()>>> {
    let token = session_token(&headers)?;
    state.facade.auth.cancel(&principal.user_key, token).await?;
    Ok(Json(ApiResponse::ok(())))
}

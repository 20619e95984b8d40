//! DAO handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::{OptionalPrincipal, Principal};
use crate::core::ServerState;
use crate::db::models::Dao;
use crate::facade::{CreateDaoInput, DaoView, UpdateDaoInput};
use crate::utils::AppResult;
use shared::ApiResponse;

/// POST /v1/daos - create a DAO and its chat group
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<CreateDaoInput>,
) -> AppResult<Json<ApiResponse<DaoView>>> {
    let dao = state.facade.create_dao(&principal.address, payload).await?;
    Ok(Json(ApiResponse::ok(dao)))
}

/// GET /v1/daos/{id} - DAO detail with the caller's follow state
pub async fn get(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DaoView>>> {
    let viewer = principal.as_ref().map(|p| p.address.as_str());
    let dao = state.facade.get_dao(viewer, &id).await?;
    Ok(Json(ApiResponse::ok(dao)))
}

/// PUT /v1/daos/{id} - owner-only profile update
pub async fn update(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDaoInput>,
) -> AppResult<Json<ApiResponse<Dao>>> {
    let dao = state
        .facade
        .update_dao(&principal.address, &id, payload)
        .await?;
    Ok(Json(ApiResponse::ok(dao)))
}

/// GET /v1/daos/mine - DAOs the caller owns
pub async fn mine(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<ApiResponse<Vec<Dao>>>> {
    let daos = state.facade.my_daos(&principal.address).await?;
    Ok(Json(ApiResponse::ok(daos)))
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_suggest_limit")]
    pub limit: u64,
}

fn default_suggest_limit() -> u64 {
    10
}

/// GET /v1/daos/suggest - name prefix suggestions
pub async fn suggest(
    State(state): State<ServerState>,
    Query(query): Query<SuggestQuery>,
) -> AppResult<Json<ApiResponse<Vec<Dao>>>> {
    let daos = state
        .facade
        .suggest_daos(&query.q, query.limit.min(50))
        .await?;
    Ok(Json(ApiResponse::ok(daos)))
}

/// GET /v1/daos/bookmarks - DAOs the caller follows
pub async fn bookmarks(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<ApiResponse<Vec<Dao>>>> {
    let daos = state.facade.bookmarked_daos(&principal.address).await?;
    Ok(Json(ApiResponse::ok(daos)))
}

#[derive(Serialize)]
pub struct FollowResponse {
    /// False when a private DAO is waiting on the subscription payment
    pub completed: bool,
}

/// PUT /v1/daos/{id}/follow - follow, or start a paid subscription
pub async fn follow(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<FollowResponse>>> {
    let completed = state.facade.follow_dao(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(FollowResponse { completed })))
}

/// DELETE /v1/daos/{id}/follow - leave the DAO and its chat group
pub async fn unfollow(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.unfollow_dao(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

//! User profile handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::{OptionalPrincipal, Principal};
use crate::core::ServerState;
use crate::db::models::User;
use crate::posts::format::FormattedPost;
use crate::utils::AppResult;
use shared::{ApiResponse, Paged, Pagination};

/// GET /v1/users/{address} - public profile by wallet address
pub async fn profile(
    State(state): State<ServerState>,
    Path(address): Path<String>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.facade.user_profile(&address).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

/// PUT /v1/users/me - update the caller's profile
pub async fn update_me(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<UpdateMeRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state
        .facade
        .update_user(&principal.user_key, payload.nickname, payload.avatar)
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// GET /v1/users/{address}/posts - a user's feed, visibility-filtered
pub async fn posts_of(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Path(address): Path<String>,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<FormattedPost>>>> {
    let viewer = principal.as_ref().map(|p| p.address.as_str());
    let page = state
        .facade
        .posts
        .feed(viewer, None, Some(address), pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

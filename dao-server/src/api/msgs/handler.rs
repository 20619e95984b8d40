//! Notification handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::core::ServerState;
use crate::notify::{MsgGroup, MsgItem};
use crate::utils::AppResult;
use shared::{ApiResponse, MsgFromType, Paged, Pagination};

/// GET /v1/msgs/groups - conversations grouped by sender, newest first
pub async fn groups(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<ApiResponse<Vec<MsgGroup>>>> {
    let groups = state.facade.notify.group_list(&principal.address).await?;
    Ok(Json(ApiResponse::ok(groups)))
}

#[derive(Deserialize)]
pub struct PairQuery {
    pub from: String,
    pub from_type: MsgFromType,
}

/// GET /v1/msgs/pair - one conversation, newest first
pub async fn pair(
    State(state): State<ServerState>,
    principal: Principal,
    Query(query): Query<PairQuery>,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<MsgItem>>>> {
    let page = state
        .facade
        .notify
        .list_pair(&principal.address, &query.from, query.from_type, pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

#[derive(Deserialize)]
pub struct ReadRequest {
    pub from: String,
}

/// PUT /v1/msgs/read - move the read watermark for a sender
pub async fn put_read(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<ReadRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .facade
        .notify
        .put_read(&principal.address, &payload.from)
        .await?;
    Ok(Json(ApiResponse::ok(())))
}

#[derive(Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

/// GET /v1/msgs/unread - total unread across all conversations
pub async fn unread(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<ApiResponse<UnreadResponse>>> {
    let unread = state.facade.notify.unread_total(&principal.address).await?;
    Ok(Json(ApiResponse::ok(UnreadResponse { unread })))
}

#[derive(Deserialize)]
pub struct DeletePairQuery {
    pub from: String,
    pub from_type: MsgFromType,
}

/// DELETE /v1/msgs/pair - drop an entire conversation
pub async fn delete_pair(
    State(state): State<ServerState>,
    principal: Principal,
    Query(query): Query<DeletePairQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .facade
        .notify
        .delete_pair(&principal.address, &query.from, query.from_type)
        .await?;
    Ok(Json(ApiResponse::ok(())))
}

/// DELETE /v1/msgs/{send_id} - drop a single message
pub async fn delete_one(
    State(state): State<ServerState>,
    principal: Principal,
    Path(send_id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .facade
        .notify
        .delete_one(&principal.address, &send_id)
        .await?;
    Ok(Json(ApiResponse::ok(())))
}

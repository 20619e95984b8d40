//! Red-packet handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;

use crate::auth::Principal;
use crate::core::ServerState;
use crate::db::models::{Redpacket, RedpacketClaim};
use crate::redpacket::CreatePacketInput;
use crate::utils::AppResult;
use shared::{ApiResponse, Paged, Pagination};

/// POST /v1/redpackets - fund and open a red packet
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<CreatePacketInput>,
) -> AppResult<Json<ApiResponse<Redpacket>>> {
    let packet = state
        .facade
        .redpackets
        .create(&principal.address, payload)
        .await?;
    Ok(Json(ApiResponse::ok(packet)))
}

/// POST /v1/redpackets/{id}/claim - claim one share
pub async fn claim(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<RedpacketClaim>>> {
    let claim = state
        .facade
        .redpackets
        .claim(&principal.address, &id)
        .await?;
    Ok(Json(ApiResponse::ok(claim)))
}

#[derive(Serialize)]
pub struct PacketDetail {
    pub packet: Redpacket,
    pub claims: Vec<RedpacketClaim>,
}

/// GET /v1/redpackets/{id} - packet with its claim list
pub async fn detail(
    State(state): State<ServerState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PacketDetail>>> {
    let (packet, claims) = state.facade.redpackets.detail(&id).await?;
    Ok(Json(ApiResponse::ok(PacketDetail { packet, claims })))
}

/// GET /v1/redpackets/sent - packets the caller funded
pub async fn sent(
    State(state): State<ServerState>,
    principal: Principal,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<Redpacket>>>> {
    let page = state
        .facade
        .redpackets
        .sent_by(&principal.address, pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /v1/redpackets/claimed - shares the caller collected
pub async fn claimed(
    State(state): State<ServerState>,
    principal: Principal,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<RedpacketClaim>>>> {
    let page = state
        .facade
        .redpackets
        .claimed_by(&principal.address, pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

//! Tag handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::Tag;
use crate::db::repository::TagRepository;
use crate::utils::AppResult;
use shared::ApiResponse;

#[derive(Deserialize)]
pub struct HotQuery {
    #[serde(default = "default_hot_limit")]
    pub limit: u64,
}

fn default_hot_limit() -> u64 {
    20
}

/// GET /v1/tags/hot - most-quoted tags
pub async fn hot(
    State(state): State<ServerState>,
    Query(query): Query<HotQuery>,
) -> AppResult<Json<ApiResponse<Vec<Tag>>>> {
    let tags = TagRepository::new(state.db.clone())
        .hot(query.limit.min(100))
        .await?;
    Ok(Json(ApiResponse::ok(tags)))
}

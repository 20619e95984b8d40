//! Post and comment handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{OptionalPrincipal, Principal};
use crate::core::ServerState;
use crate::db::models::{Comment, CommentReply};
use crate::posts::comments::{CreateCommentInput, CreateReplyInput, FormattedComment};
use crate::posts::format::FormattedPost;
use crate::posts::{ContentPartInput, CreatePostInput, RetweetInput};
use crate::search::QueryKind;
use crate::utils::AppResult;
use shared::{ApiResponse, Paged, Pagination, Visibility};

fn viewer_of(principal: &Option<Principal>) -> Option<&str> {
    principal.as_ref().map(|p| p.address.as_str())
}

/// POST /v1/posts - publish a post
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<CreatePostInput>,
) -> AppResult<Json<ApiResponse<FormattedPost>>> {
    let post = state.facade.posts.create(&principal.address, payload).await?;
    Ok(Json(ApiResponse::ok(post)))
}

/// GET /v1/posts/timeline - home timeline, cache-index backed
pub async fn timeline(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Arc<Paged<FormattedPost>>>>> {
    let page = state
        .facade
        .posts
        .timeline(viewer_of(&principal), pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub address: String,
}

impl SearchQuery {
    fn kind(&self) -> QueryKind {
        if !self.tag.is_empty() {
            QueryKind::Tag(self.tag.clone())
        } else if !self.address.is_empty() {
            QueryKind::Address(self.address.clone())
        } else if !self.q.is_empty() {
            QueryKind::Default(self.q.clone())
        } else {
            QueryKind::Any
        }
    }
}

/// GET /v1/posts/search - full-text / tag / address search
pub async fn search(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(query): Query<SearchQuery>,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<FormattedPost>>>> {
    let page = state
        .facade
        .posts
        .search(viewer_of(&principal), query.kind(), pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub dao_id: Option<String>,
    pub address: Option<String>,
}

/// GET /v1/posts/feed - DAO or author feed
pub async fn feed(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(query): Query<FeedQuery>,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<FormattedPost>>>> {
    let page = state
        .facade
        .posts
        .feed(viewer_of(&principal), query.dao_id, query.address, pager)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /v1/posts/retweet - retweet a post, comment or reply
pub async fn retweet(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<RetweetInput>,
) -> AppResult<Json<ApiResponse<FormattedPost>>> {
    let post = state
        .facade
        .posts
        .retweet(&principal.address, payload)
        .await?;
    Ok(Json(ApiResponse::ok(post)))
}

/// GET /v1/posts/{id} - post detail, counts the view
pub async fn get(
    State(state): State<ServerState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<FormattedPost>>> {
    let post = state.facade.posts.get(viewer_of(&principal), &id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

/// PUT /v1/posts/{id} - replace contents and tags
pub async fn update(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<CreatePostInput>,
) -> AppResult<Json<ApiResponse<FormattedPost>>> {
    let post = state
        .facade
        .posts
        .update(&principal.address, &id, payload)
        .await?;
    Ok(Json(ApiResponse::ok(post)))
}

/// DELETE /v1/posts/{id} - delete with cascade
pub async fn remove(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.posts.delete(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

#[derive(Deserialize)]
pub struct VisibilityRequest {
    pub visibility: Visibility,
}

/// PUT /v1/posts/{id}/visibility - flip visibility, tag quotas follow
pub async fn set_visibility(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<VisibilityRequest>,
) -> AppResult<Json<ApiResponse<FormattedPost>>> {
    let post = state
        .facade
        .posts
        .set_visibility(&principal.address, &id, payload.visibility)
        .await?;
    Ok(Json(ApiResponse::ok(post)))
}

/// PUT /v1/posts/{id}/stick - toggle the sticky flag
pub async fn stick(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<i64>>> {
    let is_top = state.facade.posts.stick(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(is_top)))
}

/// PUT /v1/posts/{id}/star - star a public post
pub async fn star(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.posts.star(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

/// DELETE /v1/posts/{id}/star
pub async fn unstar(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.posts.unstar(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

/// PUT /v1/posts/{id}/collect - collect a public post
pub async fn collect(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.posts.collect(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

/// DELETE /v1/posts/{id}/collect
pub async fn uncollect(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.facade.posts.uncollect(&principal.address, &id).await?;
    Ok(Json(ApiResponse::ok(())))
}

// ========== Comments ==========

#[derive(Deserialize)]
pub struct CreateCommentBody {
    pub contents: Vec<ContentPartInput>,
}

/// POST /v1/posts/{id}/comments - comment on a visible post
pub async fn create_comment(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<CreateCommentBody>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .facade
        .comments
        .create(
            &principal.address,
            CreateCommentInput {
                post_id: id,
                contents: payload.contents,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(comment)))
}

/// GET /v1/posts/{id}/comments - comment page with replies merged
pub async fn list_comments(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(pager): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Paged<FormattedComment>>>> {
    let page = state.facade.comments.list(&id, pager).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /v1/comments/reply - reply to a comment
pub async fn create_reply(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<CreateReplyInput>,
) -> AppResult<Json<ApiResponse<CommentReply>>> {
    let reply = state
        .facade
        .comments
        .reply(&principal.address, payload)
        .await?;
    Ok(Json(ApiResponse::ok(reply)))
}

/// DELETE /v1/comments/{id} - comment author or post author may delete
pub async fn delete_comment(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .facade
        .comments
        .delete(&principal.address, &id)
        .await?;
    Ok(Json(ApiResponse::ok(())))
}

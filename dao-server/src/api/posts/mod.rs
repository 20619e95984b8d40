//! Post, comment and engagement routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /v1/posts | POST | session |
//! | /v1/posts/timeline | GET | optional |
//! | /v1/posts/search | GET | optional |
//! | /v1/posts/feed | GET | optional |
//! | /v1/posts/retweet | POST | session |
//! | /v1/posts/{id} | GET / PUT / DELETE | optional / session |
//! | /v1/posts/{id}/visibility | PUT | session |
//! | /v1/posts/{id}/stick | PUT | session |
//! | /v1/posts/{id}/star | PUT / DELETE | session |
//! | /v1/posts/{id}/collect | PUT / DELETE | session |
//! | /v1/posts/{id}/comments | GET / POST | optional / session |
//! | /v1/comments/reply | POST | session |
//! | /v1/comments/{id} | DELETE | session |

mod handler;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/v1/posts", routes())
        .nest("/v1/comments", comment_routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/timeline", get(handler::timeline))
        .route("/search", get(handler::search))
        .route("/feed", get(handler::feed))
        .route("/retweet", post(handler::retweet))
        .route(
            "/{id}",
            get(handler::get).put(handler::update).delete(handler::remove),
        )
        .route("/{id}/visibility", put(handler::set_visibility))
        .route("/{id}/stick", put(handler::stick))
        .route("/{id}/star", put(handler::star).delete(handler::unstar))
        .route(
            "/{id}/collect",
            put(handler::collect).delete(handler::uncollect),
        )
        .route(
            "/{id}/comments",
            get(handler::list_comments).post(handler::create_comment),
        )
}

fn comment_routes() -> Router<ServerState> {
    Router::new()
        .route("/reply", post(handler::create_reply))
        .route("/{id}", delete(handler::delete_comment))
}

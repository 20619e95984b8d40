//! DAO routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /v1/daos | POST | session |
//! | /v1/daos/mine | GET | session |
//! | /v1/daos/suggest | GET | none |
//! | /v1/daos/bookmarks | GET | session |
//! | /v1/daos/{id} | GET / PUT | optional / session |
//! | /v1/daos/{id}/follow | PUT / DELETE | session |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/daos", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/mine", get(handler::mine))
        .route("/suggest", get(handler::suggest))
        .route("/bookmarks", get(handler::bookmarks))
        .route("/{id}", get(handler::get).put(handler::update))
        .route(
            "/{id}/follow",
            put(handler::follow).delete(handler::unfollow),
        )
}

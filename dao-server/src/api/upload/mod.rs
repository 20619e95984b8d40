//! Blob upload and serving
//!
//! Uploads are content-addressed: the object key is derived from the
//! file's digest, so re-uploading the same bytes yields the same URL.
//! The serving route only exists for the local backend; an S3-backed
//! deployment serves blobs from its public endpoint.

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/v1/blob", post(handler::upload))
        .route("/v1/blob/{*key}", get(handler::serve))
}

//! Authentication routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /v1/auth/hello | GET | none |
//! | /v1/auth/login | POST | none |
//! | /v1/auth/logout | POST | session |
//! | /v1/auth/cancel | POST | session |

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/auth", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/hello", get(handler::hello))
        .route("/login", post(handler::login))
        .route("/logout", post(handler::logout))
        .route("/cancel", post(handler::cancel))
}

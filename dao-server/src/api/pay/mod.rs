//! Payment webhook route
//!
//! The payment gateway calls back here once a transfer settles. The
//! `method` query parameter names what the order paid for and routes
//! the notification to the owning engine.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/v1/pay/notify", post(handler::notify))
}

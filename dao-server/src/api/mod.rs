//! HTTP API
//!
//! Every resource lives in its own module with a `router()` that nests
//! its routes under `/v1`. All endpoints answer with the shared
//! `{code, msg, data}` envelope.

pub mod auth;
pub mod daos;
pub mod health;
pub mod msgs;
pub mod pay;
pub mod posts;
pub mod redpackets;
pub mod tags;
pub mod upload;
pub mod users;

use axum::Router;

use crate::core::ServerState;

/// Assemble the full application router
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(daos::router())
        .merge(posts::router())
        .merge(redpackets::router())
        .merge(msgs::router())
        .merge(tags::router())
        .merge(upload::router())
        .merge(pay::router())
}

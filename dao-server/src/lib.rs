//! DAO social backend
//!
//! A wallet-native social platform server: users are wallet addresses,
//! communities are DAOs with linked chat groups, posts carry ordered
//! content parts and tags, and red packets move tokens through an
//! external payment gateway.
//!
//! # Module structure
//!
//! ```text
//! dao-server/src/
//! ├── core/       # config, state wiring, server, background tasks
//! ├── api/        # HTTP routes and handlers
//! ├── auth/       # wallet-signature login, sessions, extractors
//! ├── posts/      # post engine, comments, response formatting
//! ├── search/     # search backends and the async index bridge
//! ├── cache/      # KV store and the home-timeline cache-index
//! ├── redpacket/  # red-packet state machine and pay signals
//! ├── notify/     # notification fan-out and aggregation
//! ├── chat/       # chat-gateway linking
//! ├── pay/        # payment gateway client
//! ├── storage/    # blob store (local / s3)
//! ├── facade.rs   # cross-engine orchestration
//! ├── db/         # embedded SurrealDB models and repositories
//! └── utils/      # errors, logging, time, validation
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod chat;
pub mod core;
pub mod db;
pub mod facade;
pub mod notify;
pub mod pay;
pub mod posts;
pub mod redpacket;
pub mod search;
pub mod storage;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use facade::Facade;
pub use utils::{init_logger, init_logger_with_file, AppError, AppResult};

/// Startup banner
pub fn print_banner() {
    println!(
        r#"
  ____    _    ___    ____
 |  _ \  / \  / _ \  / ___|  ___ _ ____   _____ _ __
 | | | |/ _ \| | | | \___ \ / _ \ '__\ \ / / _ \ '__|
 | |_| / ___ \ |_| |  ___) |  __/ |   \ V /  __/ |
 |____/_/   \_\___/  |____/ \___|_|    \_/ \___|_|

 version {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

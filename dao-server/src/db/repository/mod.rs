//! Repository Module
//!
//! CRUD + transactional multi-collection writes over the embedded
//! SurrealDB. Engines never issue queries themselves; every statement
//! the server runs lives in one of these repositories.

pub mod comment;
pub mod dao;
pub mod msg;
pub mod post;
pub mod redpacket;
pub mod tag;
pub mod user;

pub use comment::CommentRepository;
pub use dao::DaoRepository;
pub use msg::MsgRepository;
pub use post::{PostQuery, PostRepository};
pub use redpacket::RedpacketRepository;
pub use tag::TagRepository;
pub use user::UserRepository;

use serde::Deserialize;
use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let text = err.to_string();
        // Unique-index violations surface as index errors; translate to
        // Duplicate so engines can map them to the domain conflict.
        if text.contains("already contains") || text.contains("unique") {
            RepoError::Duplicate(text)
        } else {
            RepoError::Database(text)
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Build a RecordId from a table name and plain key
pub fn record_id(table: &str, key: &str) -> RecordId {
    RecordId::from_table_key(table, key)
}

/// Row shape of `SELECT count() ... GROUP ALL`
#[derive(Debug, Deserialize)]
pub(crate) struct CountRow {
    pub count: i64,
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

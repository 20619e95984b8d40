//! Database Module
//!
//! Embedded SurrealDB. The schema (collections + unique indexes) is
//! embedded at build time and applied idempotently at startup.

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const SCHEMA: &str = include_str!("schema.surql");

const NAMESPACE: &str = "dao";
const DATABASE: &str = "social";

/// Open the embedded database at `<work_dir>/database` and apply the schema
pub async fn connect(work_dir: &str) -> Result<Surreal<Db>, AppError> {
    let path = format!("{}/database", work_dir);
    let db = Surreal::new::<RocksDb>(path.as_str())
        .await
        .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
    bootstrap(&db).await?;
    tracing::info!(path = %path, "Database connection established");
    Ok(db)
}

/// In-memory database for tests
pub async fn connect_memory() -> Result<Surreal<Db>, AppError> {
    let db = Surreal::new::<Mem>(())
        .await
        .map_err(|e| AppError::Database(format!("Failed to open in-memory db: {}", e)))?;
    bootstrap(&db).await?;
    Ok(db)
}

async fn bootstrap(db: &Surreal<Db>) -> Result<(), AppError> {
    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| AppError::Database(format!("Failed to select namespace: {}", e)))?;

    db.query(SCHEMA)
        .await
        .map_err(|e| AppError::Database(format!("Failed to apply schema: {}", e)))?;
    tracing::debug!("Database schema applied");
    Ok(())
}

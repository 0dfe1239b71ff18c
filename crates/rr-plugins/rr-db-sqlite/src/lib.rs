//! # rr-db-sqlite Implementation
//!
//! This crate implements the data mapping between the SQLite relational model
//! and the `rr-core` domain models. One [`SqliteStore`] serves every
//! persistence port; uniqueness and foreign keys are enforced by the schema
//! and translated into domain errors here.

mod categories;
mod recipes;
mod users;

use std::fmt;
use std::str::FromStr;

use rr_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so the pool
        // must hold exactly one and never recycle it.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Translates a driver failure into the domain taxonomy.
///
/// Constraint violations are caller-correctable and keep their meaning;
/// anything else is logged with the operation and key and becomes an
/// opaque `Internal`.
pub(crate) fn map_db_error(err: sqlx::Error, operation: &'static str, key: impl fmt::Display) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = db.message();
            return if message.contains("recipes.slug") {
                AppError::recipe_slug_taken()
            } else if message.contains("categories.") {
                AppError::category_name_taken()
            } else if message.contains("users.email") {
                AppError::email_taken()
            } else {
                AppError::Conflict("record already exists".into())
            };
        }
        if db.is_foreign_key_violation() {
            return AppError::validation("reference", "referenced record does not exist");
        }
    }

    error!(operation, key = %key, error = %err, "database operation failed");
    AppError::internal(format!("{operation} failed"))
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

pub(crate) fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

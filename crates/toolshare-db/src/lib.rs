//! # toolshare-db
//!
//! PostgreSQL storage for the toolshare category engine.
//!
//! This crate provides:
//! - Connection pool management
//! - Category repository (hierarchy, attribute schemas, item counts)
//! - External taxonomy repository (bulk replace on import)
//!
//! ## Example
//!
//! ```rust,ignore
//! use toolshare_db::{Database, CategoryStore};
//!
//! #[tokio::main]
//! async fn main() -> toolshare_db::Result<()> {
//!     let db = Database::connect("postgres://localhost/toolshare").await?;
//!     let active = db.categories.list_active().await?;
//!     println!("{} active categories", active.len());
//!     Ok(())
//! }
//! ```

pub mod categories;
pub mod pool;
pub mod taxonomy;

pub mod test_fixtures;

pub use toolshare_core::*;

pub use categories::PgCategoryRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_usage, PoolConfig, PoolUsage};
pub use taxonomy::PgTaxonomyRepository;

/// Combined database access for all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Category hierarchy and attribute schemas.
    pub categories: PgCategoryRepository,
    /// Imported external taxonomy.
    pub taxonomy: PgTaxonomyRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            categories: PgCategoryRepository::new(pool.clone()),
            taxonomy: PgTaxonomyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

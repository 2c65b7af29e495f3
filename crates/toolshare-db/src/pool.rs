//! Connection pool setup for the category store.
//!
//! The CLI opens one short-lived pool per command, so the knobs are limited
//! to size and acquire timeout. Both can be overridden from the environment.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use toolshare_core::{Error, Result};

/// Environment variable overriding [`PoolConfig::max_connections`].
pub const ENV_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";

/// Environment variable overriding [`PoolConfig::acquire_timeout`], in seconds.
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "DATABASE_CONNECT_TIMEOUT_SECS";

/// Room for a raised import concurrency plus one reader.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by [`ENV_MAX_CONNECTIONS`] and
    /// [`ENV_ACQUIRE_TIMEOUT_SECS`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable or zero sizes keep
    /// the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        match lookup(ENV_MAX_CONNECTIONS).map(|v| v.trim().parse::<u32>()) {
            Some(Ok(n)) if n > 0 => config.max_connections = n,
            Some(_) => warn!(
                subsystem = "database",
                component = "pool",
                key = ENV_MAX_CONNECTIONS,
                "Ignoring invalid pool size"
            ),
            None => {}
        }
        match lookup(ENV_ACQUIRE_TIMEOUT_SECS).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(secs)) => config.acquire_timeout = Duration::from_secs(secs),
            Some(Err(_)) => warn!(
                subsystem = "database",
                component = "pool",
                key = ENV_ACQUIRE_TIMEOUT_SECS,
                "Ignoring invalid acquire timeout"
            ),
            None => {}
        }
        config
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Connect with [`PoolConfig::default`].
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Point-in-time connection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUsage {
    pub size: u32,
    pub idle: usize,
}

impl PoolUsage {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Every open connection is checked out.
    pub fn is_saturated(&self) -> bool {
        self.size > 0 && self.idle == 0
    }
}

/// Log pool usage after `op`. Saturation is a warning: import concurrency
/// is probably set higher than the pool allows.
pub fn log_pool_usage(pool: &PgPool, op: &str) -> PoolUsage {
    let usage = PoolUsage::of(pool);
    if usage.is_saturated() {
        warn!(
            subsystem = "database",
            component = "pool",
            op,
            pool_size = usage.size,
            "All pool connections in use"
        );
    } else {
        debug!(
            subsystem = "database",
            component = "pool",
            op,
            pool_size = usage.size,
            pool_idle = usage.idle,
            "Pool usage"
        );
    }
    usage
}

//! Runtime configuration for the taxonomy engine.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Tunables for tree maintenance, import, and suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Maximum hops from a category to its root.
    pub max_depth: usize,
    /// Rows per insert batch during import.
    pub import_batch_size: usize,
    /// Insert batches in flight at once (1 = sequential).
    pub import_concurrency: usize,
    /// Lines inspected by `validate_format`.
    pub format_sample_lines: usize,
    /// Confidence the top suggestion must exceed for auto-selection.
    pub auto_select_threshold: f64,
    /// Timeout for remote taxonomy fetches, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            max_depth: defaults::MAX_CATEGORY_DEPTH,
            import_batch_size: defaults::IMPORT_BATCH_SIZE,
            import_concurrency: defaults::IMPORT_CONCURRENCY,
            format_sample_lines: defaults::FORMAT_SAMPLE_LINES,
            auto_select_threshold: defaults::AUTO_SELECT_THRESHOLD,
            fetch_timeout_secs: defaults::FETCH_TIMEOUT_SECS,
        }
    }
}

impl TaxonomyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TOOLSHARE_MAX_DEPTH` (default: 10)
    /// - `TOOLSHARE_IMPORT_BATCH_SIZE` (default: 1000)
    /// - `TOOLSHARE_IMPORT_CONCURRENCY` (default: 1)
    /// - `TOOLSHARE_FORMAT_SAMPLE_LINES` (default: 100)
    /// - `TOOLSHARE_AUTO_SELECT_THRESHOLD` (default: 80)
    /// - `TOOLSHARE_FETCH_TIMEOUT_SECS` (default: 60)
    ///
    /// Unparseable or zero values fall back to the default.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            max_depth: parse_positive_env("TOOLSHARE_MAX_DEPTH", base.max_depth),
            import_batch_size: parse_positive_env(
                "TOOLSHARE_IMPORT_BATCH_SIZE",
                base.import_batch_size,
            ),
            import_concurrency: parse_positive_env(
                "TOOLSHARE_IMPORT_CONCURRENCY",
                base.import_concurrency,
            ),
            format_sample_lines: parse_positive_env(
                "TOOLSHARE_FORMAT_SAMPLE_LINES",
                base.format_sample_lines,
            ),
            auto_select_threshold: parse_env(
                "TOOLSHARE_AUTO_SELECT_THRESHOLD",
                base.auto_select_threshold,
            ),
            fetch_timeout_secs: parse_positive_env(
                "TOOLSHARE_FETCH_TIMEOUT_SECS",
                base.fetch_timeout_secs,
            ),
        }
    }

    /// Set the import batch size.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.import_batch_size = n;
        self
    }

    /// Set the import concurrency.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.import_concurrency = n;
        self
    }

    /// Set the maximum category depth.
    pub fn with_max_depth(mut self, n: usize) -> Self {
        self.max_depth = n;
        self
    }

    /// Fetch timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Reject settings that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        if self.import_batch_size == 0 {
            return Err(Error::Config(
                "import_batch_size must be at least 1".to_string(),
            ));
        }
        if self.import_concurrency == 0 {
            return Err(Error::Config(
                "import_concurrency must be at least 1".to_string(),
            ));
        }
        if !self.auto_select_threshold.is_finite() {
            return Err(Error::Config(
                "auto_select_threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// Zero is treated like a missing variable.
fn parse_positive_env<T: FromStr + PartialOrd + Default + Copy>(key: &str, default: T) -> T {
    let value = parse_env(key, default);
    if value > T::default() {
        value
    } else {
        default
    }
}

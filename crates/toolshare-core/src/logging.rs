//! Structured logging field name constants for toolshare.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue: orphaned nodes, stored cycles, failed batches |
//! | INFO  | Lifecycle events, import completion |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (per line, per candidate) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "taxonomy", "database", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "tree", "hierarchy", "attributes", "scorer", "importer", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "build", "check_reparent", "validate", "score", "import"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Category UUID being operated on.
pub const CATEGORY_ID: &str = "category_id";

/// Proposed parent UUID in a reparent check.
pub const PARENT_ID: &str = "parent_id";

/// Import source (path or URL).
pub const SOURCE: &str = "source";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of nodes in a built tree.
pub const NODE_COUNT: &str = "node_count";

/// Number of roots in a built forest.
pub const ROOT_COUNT: &str = "root_count";

/// Number of records parsed from an import source.
pub const RECORD_COUNT: &str = "record_count";

/// Number of rows written by an import.
pub const IMPORTED_COUNT: &str = "imported_count";

/// Zero-based batch index of an import write.
pub const BATCH_INDEX: &str = "batch_index";

/// Number of rows in one import batch.
pub const BATCH_SIZE: &str = "batch_size";

/// Number of candidates scored for a suggestion.
pub const CANDIDATE_COUNT: &str = "candidate_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Number of errors collected by a soft-failing operation.
pub const ERROR_COUNT: &str = "error_count";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

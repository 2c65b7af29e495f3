//! Centralized default constants for the toolshare category engine.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// HIERARCHY
// =============================================================================

/// Maximum number of hops from any active category to its root.
pub const MAX_CATEGORY_DEPTH: usize = 10;

/// Recursion cap for tree traversal over possibly corrupt data.
pub const TREE_TRAVERSAL_CAP: usize = 64;

/// Separator used for display paths and import paths.
pub const PATH_SEPARATOR: &str = " > ";

// =============================================================================
// IMPORT
// =============================================================================

/// Rows per taxonomy insert batch.
pub const IMPORT_BATCH_SIZE: usize = 1000;

/// Insert batches issued concurrently after the delete-all completes.
pub const IMPORT_CONCURRENCY: usize = 1;

/// Lines inspected by the format pre-flight.
pub const FORMAT_SAMPLE_LINES: usize = 100;

/// Timeout for fetching a remote taxonomy source.
pub const FETCH_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// SCORING
// =============================================================================

/// Bonus when the item name appears verbatim inside the category path.
pub const SCORE_NAME_IN_PATH: f64 = 40.0;

/// Maximum bonus for name token overlap with the path.
pub const SCORE_NAME_TOKENS_MAX: f64 = 30.0;

/// Maximum bonus for description token overlap with the path.
pub const SCORE_DESCRIPTION_TOKENS_MAX: f64 = 20.0;

/// Bonus per category level, applied up to [`SCORE_DEPTH_CAP_LEVEL`].
pub const SCORE_DEPTH_PER_LEVEL: f64 = 5.0;

/// Level at which the specificity bonus stops growing.
pub const SCORE_DEPTH_CAP_LEVEL: usize = 3;

/// Stability bonus for the item's current category.
pub const SCORE_EXISTING_CATEGORY: f64 = 25.0;

/// Confidence the top suggestion must exceed to be auto-selected.
pub const AUTO_SELECT_THRESHOLD: f64 = 80.0;

/// Upper bound used when clamping confidence for display.
pub const CONFIDENCE_DISPLAY_MAX: f64 = 100.0;

// =============================================================================
// EVENTS
// =============================================================================

/// Buffer capacity of the category event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

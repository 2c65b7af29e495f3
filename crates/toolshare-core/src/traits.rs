//! Store traits for the category engine.
//!
//! The engine never talks to a database directly; it receives these traits
//! so that PostgreSQL, in-memory, and test doubles are interchangeable.

use async_trait::async_trait;
use uuid::Uuid;

use crate::attributes::CategoryAttribute;
use crate::error::Result;
use crate::models::*;

// =============================================================================
// CATEGORY STORE
// =============================================================================

/// Reads and writes category rows and their attribute bindings.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All active categories, ordered by sort order then name.
    async fn list_active(&self) -> Result<Vec<Category>>;

    /// Fetch one category by id, active or not.
    async fn get(&self, id: Uuid) -> Result<Option<Category>>;

    /// Attribute bindings (with nested definitions) for a category, by display order.
    async fn category_attributes(&self, category_id: Uuid) -> Result<Vec<CategoryAttribute>>;

    /// Insert a new category and return its id.
    async fn insert(&self, req: CreateCategoryRequest) -> Result<Uuid>;

    /// Update name, slug, presentation, and metadata in place.
    async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<()>;

    /// Point a category at a new parent (None = root). Callers validate first.
    async fn set_parent(&self, id: Uuid, parent_id: Option<Uuid>) -> Result<()>;

    /// Flip the active flag. Deactivation is the only form of deletion.
    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<()>;

    /// Number of items assigned to a category.
    async fn count_items(&self, id: Uuid) -> Result<i64>;
}

// =============================================================================
// TAXONOMY STORE
// =============================================================================

/// Whole-table replacement storage for an imported external taxonomy.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Delete every external taxonomy row. Returns rows removed.
    async fn delete_all(&self) -> Result<u64>;

    /// Insert one batch of records. Returns rows written.
    async fn insert_batch(&self, records: &[TaxonomyRecord]) -> Result<u64>;

    /// All stored records ordered by level then path.
    async fn list_records(&self) -> Result<Vec<TaxonomyRecord>>;
}

//! In-memory store backends.
//!
//! Used by engine tests and tools that run without PostgreSQL. Failure
//! injection lets tests exercise partial-failure paths.
//!
//! ```rust
//! use toolshare_taxonomy::memory::InMemoryCategoryStore;
//! use toolshare_core::Category;
//!
//! let store = InMemoryCategoryStore::new().with_category(Category::new("Tools", None));
//! assert_eq!(store.len(), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use toolshare_core::{
    new_v7, slugify, Category, CategoryAttribute, CategoryStore, CreateCategoryRequest, Error,
    Result, TaxonomyRecord, TaxonomyStore, UpdateCategoryRequest,
};

// =============================================================================
// CATEGORIES
// =============================================================================

#[derive(Default)]
struct CategoryState {
    categories: HashMap<Uuid, Category>,
    attributes: HashMap<Uuid, Vec<CategoryAttribute>>,
    item_counts: HashMap<Uuid, i64>,
}

/// Category store held in process memory.
#[derive(Clone, Default)]
pub struct InMemoryCategoryStore {
    state: Arc<RwLock<CategoryState>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one category.
    pub fn with_category(self, category: Category) -> Self {
        self.add_category(category);
        self
    }

    pub fn add_category(&self, category: Category) {
        self.write().categories.insert(category.id, category);
    }

    /// Bind an attribute definition to its category.
    pub fn bind_attribute(&self, binding: CategoryAttribute) {
        let mut state = self.write();
        let list = state.attributes.entry(binding.category_id).or_default();
        list.retain(|b| b.definition.name != binding.definition.name);
        list.push(binding);
        list.sort_by_key(|b| b.display_order);
    }

    pub fn set_item_count(&self, category_id: Uuid, count: i64) {
        self.write().item_counts.insert(category_id, count);
    }

    pub fn len(&self) -> usize {
        self.read().categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CategoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CategoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn list_active(&self) -> Result<Vec<Category>> {
        let mut active: Vec<Category> = self
            .read()
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            match (a.sort_order, b.sort_order) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| a.name.cmp(&b.name))
        });
        Ok(active)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.read().categories.get(&id).cloned())
    }

    async fn category_attributes(&self, category_id: Uuid) -> Result<Vec<CategoryAttribute>> {
        Ok(self
            .read()
            .attributes
            .get(&category_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert(&self, req: CreateCategoryRequest) -> Result<Uuid> {
        let slug = slugify(req.slug.as_deref().unwrap_or(&req.name));
        if slug.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Category name '{}' produces an empty slug",
                req.name
            )));
        }
        let mut state = self.write();
        if state.categories.values().any(|c| c.slug == slug) {
            return Err(Error::InvalidInput(format!("slug '{}' already exists", slug)));
        }
        let now = Utc::now();
        let id = new_v7();
        state.categories.insert(
            id,
            Category {
                id,
                name: req.name,
                slug,
                parent_id: req.parent_id,
                icon: req.icon,
                color: req.color,
                sort_order: req.sort_order,
                is_active: true,
                metadata: req.metadata.unwrap_or_else(|| serde_json::json!({})),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<()> {
        let mut state = self.write();
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(Error::CategoryNotFound(id))?;
        if let Some(name) = req.name {
            category.name = name;
        }
        if let Some(slug) = req.slug {
            category.slug = slugify(&slug);
        }
        if let Some(icon) = req.icon {
            category.icon = Some(icon);
        }
        if let Some(color) = req.color {
            category.color = Some(color);
        }
        if let Some(order) = req.sort_order {
            category.sort_order = Some(order);
        }
        if let Some(serde_json::Value::Object(patch)) = req.metadata {
            if let serde_json::Value::Object(existing) = &mut category.metadata {
                existing.extend(patch);
            } else {
                category.metadata = serde_json::Value::Object(patch);
            }
        }
        category.updated_at = Utc::now();
        Ok(())
    }

    async fn set_parent(&self, id: Uuid, parent_id: Option<Uuid>) -> Result<()> {
        let mut state = self.write();
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(Error::CategoryNotFound(id))?;
        category.parent_id = parent_id;
        category.updated_at = Utc::now();
        Ok(())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let mut state = self.write();
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(Error::CategoryNotFound(id))?;
        category.is_active = is_active;
        category.updated_at = Utc::now();
        Ok(())
    }

    async fn count_items(&self, id: Uuid) -> Result<i64> {
        Ok(self.read().item_counts.get(&id).copied().unwrap_or(0))
    }
}

// =============================================================================
// EXTERNAL TAXONOMY
// =============================================================================

#[derive(Default)]
struct TaxonomyState {
    records: Vec<TaxonomyRecord>,
    insert_calls: usize,
    fail_delete: bool,
    /// Zero-based insert call numbers that fail.
    fail_batches: HashSet<usize>,
}

/// External taxonomy store held in process memory.
#[derive(Clone, Default)]
pub struct InMemoryTaxonomyStore {
    state: Arc<Mutex<TaxonomyState>>,
}

impl InMemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records as if a previous import had run.
    pub fn with_records(self, records: Vec<TaxonomyRecord>) -> Self {
        self.lock().records = records;
        self
    }

    /// Make `delete_all` fail.
    pub fn failing_delete(self) -> Self {
        self.lock().fail_delete = true;
        self
    }

    /// Make the n-th call to `insert_batch` (zero-based) fail.
    pub fn failing_batch(self, call: usize) -> Self {
        self.lock().fail_batches.insert(call);
        self
    }

    /// Snapshot of stored records.
    pub fn records(&self) -> Vec<TaxonomyRecord> {
        self.lock().records.clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaxonomyState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TaxonomyStore for InMemoryTaxonomyStore {
    async fn delete_all(&self) -> Result<u64> {
        let mut state = self.lock();
        if state.fail_delete {
            return Err(Error::Internal("simulated delete failure".to_string()));
        }
        let removed = state.records.len() as u64;
        state.records.clear();
        Ok(removed)
    }

    async fn insert_batch(&self, records: &[TaxonomyRecord]) -> Result<u64> {
        let mut state = self.lock();
        let call = state.insert_calls;
        state.insert_calls += 1;
        if state.fail_batches.contains(&call) {
            return Err(Error::Internal(format!(
                "simulated failure on insert call {}",
                call
            )));
        }
        state.records.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn list_records(&self) -> Result<Vec<TaxonomyRecord>> {
        let mut records = self.lock().records.clone();
        records.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.path.cmp(&b.path)));
        Ok(records)
    }
}

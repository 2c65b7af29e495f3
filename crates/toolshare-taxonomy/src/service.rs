//! Category lifecycle operations.
//!
//! Every structural change is checked against a fresh snapshot before it is
//! written, then announced on the event bus. The store is the only
//! synchronization point: two administrators reparenting at the same moment
//! are not serialized here and the last write wins.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};
use uuid::Uuid;

use toolshare_core::{
    CategoryEvent, CategoryEventBus, CategoryStore, CategorySuggestion, CreateCategoryRequest,
    Error, Item, ItemContext, Result, StructuralError, TaxonomyConfig, TaxonomyStore,
    UpdateCategoryRequest, ValidationResult,
};

use crate::cache::TreeCache;
use crate::hierarchy::{self, HierarchySnapshot, HierarchyValidator};
use crate::scoring::{candidates_from_records, CategoryScorer};
use crate::tree::CategoryForest;
use crate::validation::AttributeValidator;

/// Entry point for category administration, validation, and suggestion.
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
    taxonomy: Option<Arc<dyn TaxonomyStore>>,
    events: CategoryEventBus,
    config: TaxonomyConfig,
    cache: TreeCache,
    hierarchy: HierarchyValidator,
    validator: AttributeValidator,
    scorer: CategoryScorer,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>, config: TaxonomyConfig) -> Self {
        Self::with_events(store, config, CategoryEventBus::default())
    }

    /// Build on an existing event bus so other components see the same events.
    pub fn with_events(
        store: Arc<dyn CategoryStore>,
        config: TaxonomyConfig,
        events: CategoryEventBus,
    ) -> Self {
        Self {
            cache: TreeCache::new(Arc::clone(&store), &events),
            hierarchy: HierarchyValidator::new(Arc::clone(&store), config.max_depth),
            validator: AttributeValidator::new(Arc::clone(&store)),
            scorer: CategoryScorer::from_config(&config),
            taxonomy: None,
            store,
            events,
            config,
        }
    }

    /// Enable suggestions against the imported external taxonomy.
    pub fn with_taxonomy(mut self, taxonomy: Arc<dyn TaxonomyStore>) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    pub fn events(&self) -> &CategoryEventBus {
        &self.events
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &HierarchyValidator {
        &self.hierarchy
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create a category, optionally under an active parent.
    pub async fn create(&self, req: CreateCategoryRequest) -> Result<Uuid> {
        if req.name.trim().is_empty() {
            return Err(Error::InvalidInput("category name is required".to_string()));
        }
        if let Some(parent_id) = req.parent_id {
            let snapshot = self.hierarchy.snapshot(Some(parent_id)).await?;
            hierarchy::check_new_child(&snapshot, parent_id, self.config.max_depth)?;
        }

        let parent_id = req.parent_id;
        let id = self.store.insert(req).await?;
        info!(
            subsystem = "taxonomy",
            component = "service",
            op = "create",
            category_id = %id,
            parent_id = ?parent_id,
            "Category created"
        );
        self.events.emit(CategoryEvent::Created {
            category_id: id,
            parent_id,
        });
        Ok(id)
    }

    /// Update name, slug, presentation, or metadata.
    pub async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<()> {
        if matches!(req.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(Error::InvalidInput("category name cannot be blank".to_string()));
        }
        self.store.update(id, req).await?;
        self.events.emit(CategoryEvent::Updated { category_id: id });
        Ok(())
    }

    /// Move a category under a new parent (`None` = make it a root).
    pub async fn reparent(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<()> {
        let snapshot = self.hierarchy.snapshot(new_parent_id).await?;
        hierarchy::check_reparent(&snapshot, id, new_parent_id, self.config.max_depth)?;

        let old_parent_id = snapshot.get(id).and_then(|c| c.parent_id);
        if old_parent_id == new_parent_id {
            debug!(
                subsystem = "taxonomy",
                component = "service",
                op = "reparent",
                category_id = %id,
                "Parent unchanged"
            );
            return Ok(());
        }

        self.store.set_parent(id, new_parent_id).await?;
        info!(
            subsystem = "taxonomy",
            component = "service",
            op = "reparent",
            category_id = %id,
            old_parent_id = ?old_parent_id,
            parent_id = ?new_parent_id,
            "Category reparented"
        );
        self.events.emit(CategoryEvent::Reparented {
            category_id: id,
            old_parent_id,
            new_parent_id,
        });
        Ok(())
    }

    /// Soft-delete a category. Refused while active children or items still
    /// point at it.
    pub async fn deactivate(&self, id: Uuid) -> Result<()> {
        let category = self.store.get(id).await?.ok_or(Error::CategoryNotFound(id))?;
        if !category.is_active {
            return Ok(());
        }

        let snapshot = HierarchySnapshot::new(self.store.list_active().await?);
        let children = snapshot.active_children(id);
        if children > 0 {
            return Err(StructuralError::HasActiveChildren {
                category: id,
                count: children,
            }
            .into());
        }
        let items = self.store.count_items(id).await?;
        if items > 0 {
            return Err(StructuralError::HasItems {
                category: id,
                count: items,
            }
            .into());
        }

        self.store.set_active(id, false).await?;
        info!(
            subsystem = "taxonomy",
            component = "service",
            op = "deactivate",
            category_id = %id,
            "Category deactivated"
        );
        self.events.emit(CategoryEvent::Deactivated { category_id: id });
        Ok(())
    }

    /// Bring a deactivated category back. Its parent must be active and the
    /// category must still fit within the depth limit.
    pub async fn reactivate(&self, id: Uuid) -> Result<()> {
        let mut category = self.store.get(id).await?.ok_or(Error::CategoryNotFound(id))?;
        if category.is_active {
            return Ok(());
        }

        let parent_id = category.parent_id;
        let mut snapshot = self.hierarchy.snapshot(parent_id).await?;
        category.is_active = true;
        snapshot.insert(category);
        hierarchy::check_reparent(&snapshot, id, parent_id, self.config.max_depth)?;

        self.store.set_active(id, true).await?;
        info!(
            subsystem = "taxonomy",
            component = "service",
            op = "reactivate",
            category_id = %id,
            "Category reactivated"
        );
        self.events.emit(CategoryEvent::Reactivated { category_id: id });
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// The active category forest (cached until the next category event).
    pub async fn tree(&self) -> Result<Arc<CategoryForest>> {
        self.cache.get().await
    }

    pub async fn validate(
        &self,
        category_id: Uuid,
        attributes: &Map<String, JsonValue>,
    ) -> Result<ValidationResult> {
        self.validator.validate(category_id, attributes).await
    }

    pub async fn validate_item(&self, item: &Item) -> Result<ValidationResult> {
        self.validator.validate_item(item).await
    }

    /// Ranked suggestions among active internal categories.
    pub async fn suggest(&self, ctx: &ItemContext, limit: usize) -> Result<Vec<CategorySuggestion>> {
        let forest = self.tree().await?;
        let suggestions = self.scorer.suggest(&forest.candidates(), ctx, limit);
        debug!(
            subsystem = "taxonomy",
            component = "service",
            op = "suggest",
            candidate_count = forest.len(),
            returned = suggestions.len(),
            "Suggestions scored"
        );
        Ok(suggestions)
    }

    /// Ranked suggestions among imported external taxonomy entries.
    pub async fn suggest_external(
        &self,
        ctx: &ItemContext,
        limit: usize,
    ) -> Result<Vec<CategorySuggestion>> {
        let taxonomy = self
            .taxonomy
            .as_ref()
            .ok_or_else(|| Error::Config("no external taxonomy store configured".to_string()))?;
        let candidates = candidates_from_records(&taxonomy.list_records().await?);
        Ok(self.scorer.suggest(&candidates, ctx, limit))
    }

    /// Top suggestion when it is confident enough and the item has no category.
    pub async fn auto_select(&self, ctx: &ItemContext) -> Result<Option<CategorySuggestion>> {
        if ctx.existing_category_id.is_some() {
            return Ok(None);
        }
        let forest = self.tree().await?;
        let scored = self.scorer.score(&forest.candidates(), ctx);
        Ok(self
            .scorer
            .auto_select(&scored, ctx.existing_category_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCategoryStore;
    use toolshare_core::Category;

    fn service(store: &InMemoryCategoryStore) -> CategoryService {
        CategoryService::new(Arc::new(store.clone()), TaxonomyConfig::default())
    }

    fn named(name: &str, parent: Option<Uuid>) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            parent_id: parent,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_emits_event_and_tree_updates() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let mut rx = svc.events().subscribe();

        let tools = svc.create(named("Tools", None)).await.unwrap();
        let drills = svc.create(named("Drills", Some(tools))).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), CategoryEvent::Created { .. }));
        let tree = svc.tree().await.unwrap();
        assert_eq!(tree.path_of(drills), Some("Tools > Drills"));
    }

    #[tokio::test]
    async fn test_create_under_inactive_parent_rejected() {
        let store = InMemoryCategoryStore::new();
        let dead = Category::new("Old", None).inactive();
        let dead_id = dead.id;
        store.add_category(dead);
        let svc = service(&store);
        let err = svc.create(named("New", Some(dead_id))).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Structural(StructuralError::ParentInactive(id)) if id == dead_id
        ));
    }

    #[tokio::test]
    async fn test_reparent_rejects_cycle_and_accepts_valid_move() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let a = svc.create(named("A", None)).await.unwrap();
        let b = svc.create(named("B", Some(a))).await.unwrap();
        let c = svc.create(named("C", None)).await.unwrap();

        let err = svc.reparent(a, Some(b)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Structural(StructuralError::CreatesCycle { .. })
        ));

        svc.reparent(b, Some(c)).await.unwrap();
        let tree = svc.tree().await.unwrap();
        assert_eq!(tree.path_of(b), Some("C > B"));
    }

    #[tokio::test]
    async fn test_deactivate_guards() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let parent = svc.create(named("Parent", None)).await.unwrap();
        let child = svc.create(named("Child", Some(parent))).await.unwrap();

        let err = svc.deactivate(parent).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Structural(StructuralError::HasActiveChildren { count: 1, .. })
        ));

        store.set_item_count(child, 2);
        let err = svc.deactivate(child).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Structural(StructuralError::HasItems { count: 2, .. })
        ));

        store.set_item_count(child, 0);
        svc.deactivate(child).await.unwrap();
        svc.deactivate(parent).await.unwrap();
        assert!(svc.tree().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reactivate_requires_active_parent() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let parent = svc.create(named("Parent", None)).await.unwrap();
        let child = svc.create(named("Child", Some(parent))).await.unwrap();
        svc.deactivate(child).await.unwrap();
        svc.deactivate(parent).await.unwrap();

        let err = svc.reactivate(child).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Structural(StructuralError::ParentInactive(_))
        ));

        svc.reactivate(parent).await.unwrap();
        svc.reactivate(child).await.unwrap();
        assert_eq!(svc.tree().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_suggest_ranks_matching_category_first() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let garden = svc.create(named("Garden Tools", None)).await.unwrap();
        let hand = svc
            .create(named("Hand Tools", Some(garden)))
            .await
            .unwrap();
        svc.create(named("Kitchen", None)).await.unwrap();

        let out = svc
            .suggest(&ItemContext::named("Hand Pruner"), 5)
            .await
            .unwrap();
        assert_eq!(out[0].category_id, toolshare_core::CategoryRef::Category(hand));
        assert!(out[0].confidence > 0.0);
    }

    #[tokio::test]
    async fn test_suggest_external_requires_store() {
        let store = InMemoryCategoryStore::new();
        let svc = service(&store);
        let err = svc
            .suggest_external(&ItemContext::named("x"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

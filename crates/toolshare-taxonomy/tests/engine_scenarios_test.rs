//! End-to-end scenarios for the category engine over the in-memory store.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use toolshare_core::{
    AttributeDataType, AttributeDefinition, Category, CategoryAttribute, CategoryEventBus,
    CategoryRef, CreateCategoryRequest, Error, Item, ItemContext, StructuralError, TaxonomyConfig,
    ValidationRules,
};
use toolshare_taxonomy::{
    CategoryForest, CategoryService, HierarchyValidator, InMemoryCategoryStore,
    InMemoryTaxonomyStore, TaxonomyImporter,
};

fn service(store: &InMemoryCategoryStore) -> CategoryService {
    CategoryService::new(Arc::new(store.clone()), TaxonomyConfig::default())
}

fn req(name: &str, parent: Option<Uuid>) -> CreateCategoryRequest {
    CreateCategoryRequest {
        name: name.to_string(),
        parent_id: parent,
        ..Default::default()
    }
}

fn attrs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Build a chain of `len` categories and return their ids, root first.
async fn chain(svc: &CategoryService, prefix: &str, len: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(len);
    let mut parent = None;
    for i in 0..len {
        let id = svc
            .create(req(&format!("{} {}", prefix, i), parent))
            .await
            .unwrap();
        ids.push(id);
        parent = Some(id);
    }
    ids
}

// =============================================================================
// TREE
// =============================================================================

#[tokio::test]
async fn test_tree_keeps_every_active_category() {
    let store = InMemoryCategoryStore::new();
    let tools = Category::new("Tools", None);
    let saws = Category::new("Saws", Some(tools.id));
    let retired = Category::new("Retired", None).inactive();
    // Parent is inactive, so this one is shown as a root.
    let orphan = Category::new("Orphan", Some(retired.id));
    let orphan_id = orphan.id;
    for c in [tools, saws, retired, orphan] {
        store.add_category(c);
    }

    let forest = service(&store).tree().await.unwrap();
    assert_eq!(forest.len(), 3);
    let node = forest.find(orphan_id).unwrap();
    assert_eq!(node.depth, 0);
    assert_eq!(node.path, "Orphan");
}

#[tokio::test]
async fn test_tree_paths_and_flatten_order() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let garden = svc.create(req("Garden", None)).await.unwrap();
    svc.create(req("Shovels", Some(garden))).await.unwrap();
    let rakes = svc.create(req("Rakes", Some(garden))).await.unwrap();
    svc.create(req("Automotive", None)).await.unwrap();

    let forest = svc.tree().await.unwrap();
    assert_eq!(forest.path_of(rakes), Some("Garden > Rakes"));

    let paths: Vec<String> = forest.flatten().into_iter().map(|f| f.path).collect();
    assert_eq!(
        paths,
        vec![
            "Automotive",
            "Garden",
            "Garden > Rakes",
            "Garden > Shovels"
        ]
    );
}

#[tokio::test]
async fn test_tree_cache_refreshes_after_mutation() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let a = svc.create(req("A", None)).await.unwrap();
    assert_eq!(svc.tree().await.unwrap().len(), 1);

    svc.create(req("B", Some(a))).await.unwrap();
    assert_eq!(svc.tree().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_forest_build_never_loops_on_corrupt_data() {
    let mut a = Category::new("A", None);
    let mut b = Category::new("B", None);
    a.parent_id = Some(b.id);
    b.parent_id = Some(a.id);

    let forest = CategoryForest::build(vec![a, b]);
    assert_eq!(forest.len(), 2);
    assert_eq!(forest.flatten().len(), 2);
}

// =============================================================================
// HIERARCHY
// =============================================================================

#[tokio::test]
async fn test_reparent_under_own_descendant_is_rejected() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let ids = chain(&svc, "Level", 4).await;

    let validator = HierarchyValidator::new(Arc::new(store.clone()), 10);
    assert!(!validator.can_reparent(ids[0], Some(ids[3])).await.unwrap());
    assert!(!validator.can_reparent(ids[1], Some(ids[1])).await.unwrap());
    assert!(validator.can_reparent(ids[3], None).await.unwrap());

    let err = svc.reparent(ids[0], Some(ids[3])).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::CreatesCycle { .. })
    ));
    // Nothing moved.
    let forest = svc.tree().await.unwrap();
    assert_eq!(forest.find(ids[0]).unwrap().depth, 0);
}

#[tokio::test]
async fn test_reparent_respects_depth_limit() {
    let store = InMemoryCategoryStore::new();
    let config = TaxonomyConfig::default().with_max_depth(4);
    let svc = CategoryService::new(Arc::new(store.clone()), config);

    // Depths 0..=3.
    let deep = chain(&svc, "Deep", 4).await;
    let branch = chain(&svc, "Branch", 2).await;

    // Under Deep 3 the branch child would sit at depth 5.
    let err = svc.reparent(branch[0], Some(deep[3])).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::DepthExceeded {
            depth: 5,
            max_depth: 4,
            ..
        })
    ));

    svc.reparent(branch[0], Some(deep[2])).await.unwrap();
    let forest = svc.tree().await.unwrap();
    assert_eq!(forest.find(branch[1]).unwrap().depth, 4);
}

#[tokio::test]
async fn test_create_beyond_depth_limit_is_rejected() {
    let store = InMemoryCategoryStore::new();
    let config = TaxonomyConfig::default().with_max_depth(2);
    let svc = CategoryService::new(Arc::new(store.clone()), config);
    // Root plus two levels fills the limit.
    let ids = chain(&svc, "C", 3).await;

    let err = svc.create(req("Too Deep", Some(ids[2]))).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::DepthExceeded { depth: 3, .. })
    ));
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_reparent_to_missing_parent_is_rejected() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let a = svc.create(req("A", None)).await.unwrap();
    let ghost = Uuid::new_v4();

    let err = svc.reparent(a, Some(ghost)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::ParentNotFound(id)) if id == ghost
    ));
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

fn drill_schema(store: &InMemoryCategoryStore, category_id: Uuid) {
    let mut voltage = AttributeDefinition::new("voltage", AttributeDataType::Number);
    voltage.label = "Voltage".to_string();
    voltage.rules = ValidationRules {
        min: Some(1.0),
        max: Some(60.0),
        ..Default::default()
    };
    let mut power = AttributeDefinition::new("power_source", AttributeDataType::SingleSelect)
        .with_options(["corded", "battery"]);
    power.label = "Power source".to_string();
    let mut contact = AttributeDefinition::new("contact", AttributeDataType::Email);
    contact.label = "Contact".to_string();

    store.bind_attribute(CategoryAttribute::new(category_id, voltage, true));
    store.bind_attribute(CategoryAttribute::new(category_id, power, true));
    store.bind_attribute(CategoryAttribute::new(category_id, contact, false));
}

#[tokio::test]
async fn test_validation_collects_every_field_error() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let drills = svc.create(req("Drills", None)).await.unwrap();
    drill_schema(&store, drills);

    let result = svc
        .validate(
            drills,
            &attrs(json!({"voltage": 120, "contact": "not-an-email"})),
        )
        .await
        .unwrap();

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 3);
    assert_eq!(result.errors["voltage"], "Voltage must be at most 60");
    assert_eq!(result.errors["power_source"], "Power source is required");
    assert!(result.errors["contact"].starts_with("Contact"));
}

#[tokio::test]
async fn test_validation_accepts_conforming_attributes() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let drills = svc.create(req("Drills", None)).await.unwrap();
    drill_schema(&store, drills);

    let result = svc
        .validate(
            drills,
            &attrs(json!({"voltage": "18", "power_source": "battery", "extra": true})),
        )
        .await
        .unwrap();
    assert!(result.is_valid, "{:?}", result.errors);
}

#[tokio::test]
async fn test_validate_item_in_inactive_category() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let old = svc.create(req("Old", None)).await.unwrap();
    svc.deactivate(old).await.unwrap();

    let item = Item {
        id: Uuid::new_v4(),
        category_id: old,
        name: "Hammer".to_string(),
        attributes: Map::new(),
        description: None,
        tags: vec![],
        location: None,
    };
    let err = svc.validate_item(&item).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::CategoryInactive(id)) if id == old
    ));
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

#[tokio::test]
async fn test_auto_select_picks_confident_match() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let tools = svc.create(req("Tools", None)).await.unwrap();
    let power = svc.create(req("Power Tools", Some(tools))).await.unwrap();
    let drill = svc
        .create(req("Cordless Drill", Some(power)))
        .await
        .unwrap();
    svc.create(req("Kitchen", None)).await.unwrap();

    let picked = svc
        .auto_select(&ItemContext::named("Cordless Drill"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.category_id, CategoryRef::Category(drill));
    assert_eq!(picked.level, 3);
    assert!(picked.confidence > 80.0);
}

#[tokio::test]
async fn test_auto_select_skips_items_with_category() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    let drill = svc.create(req("Cordless Drill", None)).await.unwrap();

    let ctx = ItemContext::named("Cordless Drill").with_existing(CategoryRef::Category(drill));
    assert!(svc.auto_select(&ctx).await.unwrap().is_none());
}

#[tokio::test]
async fn test_suggestions_are_ranked_and_limited() {
    let store = InMemoryCategoryStore::new();
    let svc = service(&store);
    for name in ["Ladders", "Saws", "Sanders", "Pressure Washers"] {
        svc.create(req(name, None)).await.unwrap();
    }

    let out = svc
        .suggest(&ItemContext::named("Sander"), 2)
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].path, "Sanders");
    assert!(out[0].confidence >= out[1].confidence);
}

#[tokio::test]
async fn test_external_suggestions_after_import() {
    let taxonomy = InMemoryTaxonomyStore::new();
    let bus = CategoryEventBus::default();
    let importer = TaxonomyImporter::new(Arc::new(taxonomy.clone()), TaxonomyConfig::default())
        .with_events(bus.clone());
    let result = importer
        .import_text("1\tHardware\n2\tHardware > Tools\n3\tHardware > Tools > Drills\n")
        .await;
    assert!(result.success);

    let store = InMemoryCategoryStore::new();
    let svc = CategoryService::with_events(Arc::new(store), TaxonomyConfig::default(), bus)
        .with_taxonomy(Arc::new(taxonomy));
    let out = svc
        .suggest_external(&ItemContext::named("drills"), 3)
        .await
        .unwrap();
    assert_eq!(out[0].category_id, CategoryRef::External(3));
    assert_eq!(out[0].path, "Hardware > Tools > Drills");
}

//! # toolshare-taxonomy
//!
//! The category engine for toolshare:
//!
//! - [`tree`]: builds the ordered category forest with depths and display paths
//! - [`hierarchy`]: refuses reparents that would create cycles or exceed the depth limit
//! - [`validation`]: checks item attributes against the category's declared schema
//! - [`scoring`]: ranks candidate categories for a new item
//! - [`import`]: replaces the external taxonomy from a tab-separated source
//! - [`service`]: category lifecycle operations tying the above together
//!
//! All components are written against the store traits in `toolshare-core`;
//! [`memory`] provides in-process implementations.

pub mod cache;
pub mod hierarchy;
pub mod import;
pub mod memory;
pub mod scoring;
pub mod service;
pub mod source;
pub mod tree;
pub mod validation;

pub use cache::TreeCache;
pub use hierarchy::{can_reparent, check_reparent, HierarchySnapshot, HierarchyValidator};
pub use import::{
    parse_taxonomy, validate_format, validate_source, ParsedTaxonomy, TaxonomyImporter,
};
pub use memory::{InMemoryCategoryStore, InMemoryTaxonomyStore};
pub use scoring::{
    auto_select, candidates_from_records, clamp_confidence, rank, score, tokenize,
    CategoryScorer,
};
pub use service::CategoryService;
pub use source::ImportSource;
pub use tree::{CategoryForest, CategoryTreeNode, FlatCategory};
pub use validation::{validate_attributes, AttributeValidator};

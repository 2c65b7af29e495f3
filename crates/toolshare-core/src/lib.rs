//! # toolshare-core
//!
//! Core types, traits, and abstractions for the toolshare category engine.
//!
//! This crate provides the data model (categories, attribute schemas, items,
//! external taxonomy records), the store traits the engine is written
//! against, configuration, and shared logging conventions.

pub mod attributes;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use attributes::*;
pub use config::TaxonomyConfig;
pub use error::{Error, Result, StructuralError};
pub use events::{CategoryEvent, CategoryEventBus};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{extract_timestamp, is_v7, new_v7};

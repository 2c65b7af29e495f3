//! Error types for the toolshare category engine.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using toolshare's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a structural mutation of the category tree was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// A category cannot be its own parent.
    #[error("category {0} cannot be its own parent")]
    SelfReference(Uuid),

    /// The proposed parent is the category itself or one of its descendants.
    #[error("moving category {category} under {parent} would create a cycle")]
    CreatesCycle { category: Uuid, parent: Uuid },

    /// Stored data already contains a cycle on the proposed parent's ancestor chain.
    #[error("ancestor chain of {0} already contains a cycle; refusing to validate")]
    ExistingCycle(Uuid),

    /// The category being moved does not exist among active categories.
    #[error("category {0} not found")]
    CategoryNotFound(Uuid),

    /// The category exists but has been deactivated.
    #[error("category {0} is inactive")]
    CategoryInactive(Uuid),

    /// The proposed parent does not exist.
    #[error("parent category {0} not found")]
    ParentNotFound(Uuid),

    /// The proposed parent exists but has been deactivated.
    #[error("parent category {0} is inactive")]
    ParentInactive(Uuid),

    /// The move would push part of the subtree past the maximum depth.
    #[error("moving category {category} would reach depth {depth}, maximum is {max_depth}")]
    DepthExceeded {
        category: Uuid,
        depth: usize,
        max_depth: usize,
    },

    /// A category still referenced by active children cannot be deactivated.
    #[error("category {category} still has {count} active child categories")]
    HasActiveChildren { category: Uuid, count: usize },

    /// A category still referenced by items cannot be deactivated.
    #[error("category {category} is still assigned to {count} items")]
    HasItems { category: Uuid, count: i64 },
}

/// Core error type for toolshare operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Category not found
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Structural mutation rejected
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Taxonomy import failed before any row was written
    #[error("Import error: {0}")]
    Import(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_category_not_found() {
        let id = Uuid::nil();
        let err = Error::CategoryNotFound(id);
        assert_eq!(err.to_string(), format!("Category not found: {}", id));
    }

    #[test]
    fn test_structural_self_reference_message() {
        let id = Uuid::nil();
        let err: Error = StructuralError::SelfReference(id).into();
        assert_eq!(
            err.to_string(),
            format!("Structural error: category {} cannot be its own parent", id)
        );
    }

    #[test]
    fn test_structural_cycle_message_names_both_ids() {
        let category = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let msg = StructuralError::CreatesCycle { category, parent }.to_string();
        assert!(msg.contains(&category.to_string()));
        assert!(msg.contains(&parent.to_string()));
        assert!(msg.contains("cycle"));
    }

    #[test]
    fn test_structural_depth_message() {
        let msg = StructuralError::DepthExceeded {
            category: Uuid::nil(),
            depth: 11,
            max_depth: 10,
        }
        .to_string();
        assert!(msg.contains("depth 11"));
        assert!(msg.contains("maximum is 10"));
    }

    #[test]
    fn test_error_display_import() {
        let err = Error::Import("source unreachable".to_string());
        assert_eq!(err.to_string(), "Import error: source unreachable");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("batch size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: batch size must be positive"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}

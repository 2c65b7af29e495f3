//! Category mutation events.
//!
//! Every structural or in-place change to the category tree is announced on
//! a [`CategoryEventBus`]. Consumers such as the tree cache subscribe and
//! drop derived state when an event arrives.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A change to the category hierarchy or the imported taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategoryEvent {
    Created {
        category_id: Uuid,
        parent_id: Option<Uuid>,
    },
    Updated {
        category_id: Uuid,
    },
    Reparented {
        category_id: Uuid,
        old_parent_id: Option<Uuid>,
        new_parent_id: Option<Uuid>,
    },
    Deactivated {
        category_id: Uuid,
    },
    Reactivated {
        category_id: Uuid,
    },
    TaxonomyImported {
        imported_count: usize,
    },
}

impl CategoryEvent {
    /// Short event name used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "category.created",
            Self::Updated { .. } => "category.updated",
            Self::Reparented { .. } => "category.reparented",
            Self::Deactivated { .. } => "category.deactivated",
            Self::Reactivated { .. } => "category.reactivated",
            Self::TaxonomyImported { .. } => "taxonomy.imported",
        }
    }
}

/// Broadcast channel for category events.
#[derive(Clone)]
pub struct CategoryEventBus {
    tx: broadcast::Sender<CategoryEvent>,
}

impl CategoryEventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: CategoryEvent) {
        tracing::debug!(
            subsystem = "taxonomy",
            component = "events",
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "CategoryEventBus emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CategoryEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CategoryEventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

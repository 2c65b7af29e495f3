//! Cached category forest, dropped whenever a category event arrives.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::debug;

use toolshare_core::{CategoryEvent, CategoryEventBus, CategoryStore, Result};

use crate::tree::CategoryForest;

/// Lazily built forest shared between readers.
pub struct TreeCache {
    store: Arc<dyn CategoryStore>,
    cached: RwLock<Option<Arc<CategoryForest>>>,
    events: Mutex<broadcast::Receiver<CategoryEvent>>,
}

impl TreeCache {
    /// Subscribe to `bus`; any category mutation announced there invalidates the cache.
    pub fn new(store: Arc<dyn CategoryStore>, bus: &CategoryEventBus) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            events: Mutex::new(bus.subscribe()),
        }
    }

    /// The current forest, rebuilt from the store when stale.
    pub async fn get(&self) -> Result<Arc<CategoryForest>> {
        if self.drain_events().await {
            self.invalidate().await;
        }
        if let Some(forest) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(forest));
        }

        let mut slot = self.cached.write().await;
        if let Some(forest) = slot.as_ref() {
            return Ok(Arc::clone(forest));
        }
        let start = Instant::now();
        let forest = Arc::new(CategoryForest::build(self.store.list_active().await?));
        debug!(
            subsystem = "taxonomy",
            component = "tree_cache",
            op = "rebuild",
            node_count = forest.len(),
            root_count = forest.roots().count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Category tree rebuilt"
        );
        *slot = Some(Arc::clone(&forest));
        Ok(forest)
    }

    /// Drop the cached forest.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// True when anything that changes the category tree arrived.
    async fn drain_events(&self) -> bool {
        let mut rx = self.events.lock().await;
        let mut stale = false;
        loop {
            match rx.try_recv() {
                Ok(CategoryEvent::TaxonomyImported { .. }) => {}
                Ok(event) => {
                    debug!(
                        subsystem = "taxonomy",
                        component = "tree_cache",
                        event_type = event.event_type(),
                        "Invalidating category tree"
                    );
                    stale = true;
                }
                // Missed events; assume the worst.
                Err(TryRecvError::Lagged(_)) => stale = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    stale = true;
                    break;
                }
            }
        }
        stale
    }
}

//! Structural guards for reparenting.
//!
//! All checks run over a snapshot taken with one bulk read, never row by row
//! against the store. The graph walk carries a visited set, so corrupt data
//! with an existing cycle terminates with [`StructuralError::ExistingCycle`]
//! instead of looping.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use toolshare_core::{Category, CategoryStore, Result, StructuralError};

/// Immutable parent-pointer view of the category table.
#[derive(Debug, Clone, Default)]
pub struct HierarchySnapshot {
    categories: HashMap<Uuid, Category>,
}

impl HierarchySnapshot {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// Add or replace one category.
    pub fn insert(&mut self, category: Category) {
        self.categories.insert(category.id, category);
    }

    fn is_active(&self, id: Uuid) -> bool {
        self.categories.get(&id).is_some_and(|c| c.is_active)
    }

    /// Hops from `id` to its root following active parents. Errors if the
    /// chain loops back on itself.
    fn depth_of(&self, id: Uuid) -> std::result::Result<usize, StructuralError> {
        let mut visited = HashSet::new();
        visited.insert(id);
        let mut depth = 0;
        let mut current = self.categories.get(&id).and_then(|c| c.parent_id);
        while let Some(pid) = current {
            if !self.is_active(pid) {
                break;
            }
            if !visited.insert(pid) {
                return Err(StructuralError::ExistingCycle(id));
            }
            depth += 1;
            current = self.categories.get(&pid).and_then(|c| c.parent_id);
        }
        Ok(depth)
    }

    /// Longest downward distance from `id` to an active descendant.
    fn subtree_height(&self, id: Uuid) -> usize {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for c in self.categories.values().filter(|c| c.is_active) {
            if let Some(pid) = c.parent_id {
                children.entry(pid).or_default().push(c.id);
            }
        }

        let mut visited = HashSet::new();
        visited.insert(id);
        let mut height = 0;
        let mut stack = vec![(id, 0usize)];
        while let Some((node, h)) = stack.pop() {
            height = height.max(h);
            for &child in children.get(&node).map(Vec::as_slice).unwrap_or_default() {
                if visited.insert(child) {
                    stack.push((child, h + 1));
                }
            }
        }
        height
    }

    /// Active children of a category.
    pub fn active_children(&self, id: Uuid) -> usize {
        self.categories
            .values()
            .filter(|c| c.is_active && c.parent_id == Some(id))
            .count()
    }
}

/// Decide whether `category_id` may move under `proposed_parent_id`
/// (`None` = make it a root).
pub fn check_reparent(
    snapshot: &HierarchySnapshot,
    category_id: Uuid,
    proposed_parent_id: Option<Uuid>,
    max_depth: usize,
) -> std::result::Result<(), StructuralError> {
    if proposed_parent_id == Some(category_id) {
        return Err(StructuralError::SelfReference(category_id));
    }
    if !snapshot.is_active(category_id) {
        return Err(StructuralError::CategoryNotFound(category_id));
    }
    let Some(parent_id) = proposed_parent_id else {
        return Ok(());
    };
    match snapshot.get(parent_id) {
        None => return Err(StructuralError::ParentNotFound(parent_id)),
        Some(p) if !p.is_active => return Err(StructuralError::ParentInactive(parent_id)),
        Some(_) => {}
    }

    // Walk up from the proposed parent. Meeting the category means the
    // parent is one of its descendants.
    let mut visited = HashSet::new();
    let mut current = Some(parent_id);
    let mut parent_depth = 0usize;
    while let Some(id) = current {
        if id == category_id {
            return Err(StructuralError::CreatesCycle {
                category: category_id,
                parent: parent_id,
            });
        }
        if !visited.insert(id) {
            return Err(StructuralError::ExistingCycle(parent_id));
        }
        let next = snapshot.get(id).and_then(|c| c.parent_id);
        match next {
            Some(n) if snapshot.is_active(n) => {
                parent_depth += 1;
                current = Some(n);
            }
            _ => current = None,
        }
    }

    let deepest = parent_depth + 1 + snapshot.subtree_height(category_id);
    if deepest > max_depth {
        return Err(StructuralError::DepthExceeded {
            category: category_id,
            depth: deepest,
            max_depth,
        });
    }
    Ok(())
}

/// Boolean form of [`check_reparent`].
pub fn can_reparent(
    snapshot: &HierarchySnapshot,
    category_id: Uuid,
    proposed_parent_id: Option<Uuid>,
    max_depth: usize,
) -> bool {
    check_reparent(snapshot, category_id, proposed_parent_id, max_depth).is_ok()
}

/// Decide whether a new category may be created under `parent_id`.
pub fn check_new_child(
    snapshot: &HierarchySnapshot,
    parent_id: Uuid,
    max_depth: usize,
) -> std::result::Result<(), StructuralError> {
    match snapshot.get(parent_id) {
        None => return Err(StructuralError::ParentNotFound(parent_id)),
        Some(p) if !p.is_active => return Err(StructuralError::ParentInactive(parent_id)),
        Some(_) => {}
    }
    let depth = snapshot.depth_of(parent_id)? + 1;
    if depth > max_depth {
        return Err(StructuralError::DepthExceeded {
            category: parent_id,
            depth,
            max_depth,
        });
    }
    Ok(())
}

/// Store-backed reparent guard.
#[derive(Clone)]
pub struct HierarchyValidator {
    store: Arc<dyn CategoryStore>,
    max_depth: usize,
}

impl HierarchyValidator {
    pub fn new(store: Arc<dyn CategoryStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Load active categories plus, when missing from that set, the proposed
    /// parent so an inactive parent is reported as such.
    pub async fn snapshot(&self, extra: Option<Uuid>) -> Result<HierarchySnapshot> {
        let mut snapshot = HierarchySnapshot::new(self.store.list_active().await?);
        if let Some(id) = extra {
            if snapshot.get(id).is_none() {
                if let Some(category) = self.store.get(id).await? {
                    snapshot.insert(category);
                }
            }
        }
        Ok(snapshot)
    }

    /// Check a proposed move, returning the reason on rejection.
    pub async fn check_reparent(
        &self,
        category_id: Uuid,
        proposed_parent_id: Option<Uuid>,
    ) -> Result<()> {
        let snapshot = self.snapshot(proposed_parent_id).await?;
        let outcome = check_reparent(&snapshot, category_id, proposed_parent_id, self.max_depth);
        debug!(
            subsystem = "taxonomy",
            component = "hierarchy",
            op = "check_reparent",
            category_id = %category_id,
            parent_id = ?proposed_parent_id,
            allowed = outcome.is_ok(),
            "Reparent check"
        );
        outcome.map_err(Into::into)
    }

    /// `true` when the move is structurally safe. Store failures are errors.
    pub async fn can_reparent(
        &self,
        category_id: Uuid,
        proposed_parent_id: Option<Uuid>,
    ) -> Result<bool> {
        let snapshot = self.snapshot(proposed_parent_id).await?;
        Ok(can_reparent(
            &snapshot,
            category_id,
            proposed_parent_id,
            self.max_depth,
        ))
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

//! In-memory category forest.
//!
//! The forest is an arena: nodes live in one `Vec` and refer to each other by
//! index. Building it never drops a category. Orphans (parent missing or
//! inactive) and members of parent cycles in corrupt data are promoted to
//! roots.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use toolshare_core::defaults::{PATH_SEPARATOR, TREE_TRAVERSAL_CAP};
use toolshare_core::{CandidateCategory, Category, CategoryRef};

/// A category with its computed position in the forest.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: Category,
    /// Hops from the root (root = 0).
    pub depth: usize,
    /// Ancestor names and this node's name joined by `" > "`.
    pub path: String,
    pub has_children: bool,
    #[serde(skip)]
    parent: Option<usize>,
    #[serde(skip)]
    children: Vec<usize>,
}

impl CategoryTreeNode {
    pub fn id(&self) -> Uuid {
        self.category.id
    }

    pub fn name(&self) -> &str {
        &self.category.name
    }
}

/// `(id, name, path)` triple emitted by [`CategoryForest::flatten`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatCategory {
    pub id: Uuid,
    pub name: String,
    pub path: String,
}

/// Ordered forest of categories.
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    nodes: Vec<CategoryTreeNode>,
    roots: Vec<usize>,
    index: HashMap<Uuid, usize>,
}

impl CategoryForest {
    /// Build a forest from an unordered list of categories.
    pub fn build(categories: Vec<Category>) -> Self {
        let mut nodes: Vec<CategoryTreeNode> = categories
            .into_iter()
            .map(|category| CategoryTreeNode {
                category,
                depth: 0,
                path: String::new(),
                has_children: false,
                parent: None,
                children: Vec::new(),
            })
            .collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.category.id, i).is_some() {
                warn!(
                    subsystem = "taxonomy",
                    component = "tree",
                    category_id = %node.category.id,
                    "Duplicate category id in tree input"
                );
            }
        }

        // Attach to parents
        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = nodes[i]
                .category
                .parent_id
                .and_then(|pid| index.get(&pid).copied())
                .filter(|&p| p != i);
            match parent {
                Some(p) => {
                    nodes[i].parent = Some(p);
                    nodes[p].children.push(i);
                }
                None => {
                    if let Some(pid) = nodes[i].category.parent_id {
                        debug!(
                            subsystem = "taxonomy",
                            component = "tree",
                            category_id = %nodes[i].category.id,
                            parent_id = %pid,
                            "Parent not in active set; promoting to root"
                        );
                    }
                    roots.push(i);
                }
            }
        }

        // Nodes unreachable from any root sit on a parent cycle.
        let mut reached = vec![false; nodes.len()];
        mark_reachable(&nodes, &roots, &mut reached);
        for i in 0..nodes.len() {
            if reached[i] {
                continue;
            }
            warn!(
                subsystem = "taxonomy",
                component = "tree",
                category_id = %nodes[i].category.id,
                "Category is part of a parent cycle; promoting to root"
            );
            if let Some(p) = nodes[i].parent.take() {
                nodes[p].children.retain(|&c| c != i);
            }
            roots.push(i);
            mark_reachable(&nodes, &[i], &mut reached);
        }

        for i in 0..nodes.len() {
            let mut children = std::mem::take(&mut nodes[i].children);
            children.sort_by(|&a, &b| sibling_order(&nodes[a].category, &nodes[b].category));
            nodes[i].has_children = !children.is_empty();
            nodes[i].children = children;
        }
        roots.sort_by(|&a, &b| sibling_order(&nodes[a].category, &nodes[b].category));

        let mut forest = Self {
            nodes,
            roots,
            index,
        };
        forest.assign_paths();
        forest
    }

    /// Depth-first pass computing depth and display path. Subtrees deeper
    /// than the traversal cap are cut loose and become roots.
    fn assign_paths(&mut self) {
        let mut pending: Vec<usize> = self.roots.clone();
        let mut cut = Vec::new();
        while let Some(root) = pending.pop() {
            let root_path = self.nodes[root].category.name.clone();
            let mut stack = vec![(root, 0usize, root_path)];
            while let Some((i, depth, path)) = stack.pop() {
                if depth > TREE_TRAVERSAL_CAP {
                    warn!(
                        subsystem = "taxonomy",
                        component = "tree",
                        category_id = %self.nodes[i].category.id,
                        depth,
                        "Tree depth cap reached; promoting subtree to root"
                    );
                    if let Some(p) = self.nodes[i].parent.take() {
                        self.nodes[p].children.retain(|&c| c != i);
                        self.nodes[p].has_children = !self.nodes[p].children.is_empty();
                    }
                    cut.push(i);
                    pending.push(i);
                    continue;
                }
                self.nodes[i].depth = depth;
                for &c in self.nodes[i].children.iter().rev() {
                    let child_path =
                        format!("{}{}{}", path, PATH_SEPARATOR, self.nodes[c].category.name);
                    stack.push((c, depth + 1, child_path));
                }
                self.nodes[i].path = path;
            }
        }
        if !cut.is_empty() {
            self.roots.extend(cut);
            let nodes = &self.nodes;
            self.roots
                .sort_by(|&a, &b| sibling_order(&nodes[a].category, &nodes[b].category));
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in display order.
    pub fn roots(&self) -> impl Iterator<Item = &CategoryTreeNode> {
        self.roots.iter().map(move |&i| &self.nodes[i])
    }

    /// Children of a node in display order.
    pub fn children<'a>(
        &'a self,
        node: &'a CategoryTreeNode,
    ) -> impl Iterator<Item = &'a CategoryTreeNode> {
        node.children.iter().map(move |&i| &self.nodes[i])
    }

    /// Parent of a node, if it has one in the forest.
    pub fn parent(&self, node: &CategoryTreeNode) -> Option<&CategoryTreeNode> {
        node.parent.map(|i| &self.nodes[i])
    }

    pub fn find(&self, id: Uuid) -> Option<&CategoryTreeNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn path_of(&self, id: Uuid) -> Option<&str> {
        self.find(id).map(|n| n.path.as_str())
    }

    /// Ancestors of a category, root first. Empty for roots and unknown ids.
    pub fn ancestors(&self, id: Uuid) -> Vec<&CategoryTreeNode> {
        let mut chain = Vec::new();
        let mut current = self.index.get(&id).and_then(|&i| self.nodes[i].parent);
        while let Some(i) = current {
            chain.push(&self.nodes[i]);
            current = self.nodes[i].parent;
        }
        chain.reverse();
        chain
    }

    /// Every node below a category, in pre-order.
    pub fn descendants(&self, id: Uuid) -> Vec<&CategoryTreeNode> {
        let Some(&start) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[start].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(&self.nodes[i]);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }

    /// All nodes in pre-order (roots in order, each followed by its subtree).
    pub fn walk(&self) -> Vec<&CategoryTreeNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(&self.nodes[i]);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }

    /// Pre-order `(id, name, path)` triples.
    pub fn flatten(&self) -> Vec<FlatCategory> {
        self.walk()
            .into_iter()
            .map(|n| FlatCategory {
                id: n.category.id,
                name: n.category.name.clone(),
                path: n.path.clone(),
            })
            .collect()
    }

    /// Scoring candidates for every node (level = depth + 1).
    pub fn candidates(&self) -> Vec<CandidateCategory> {
        self.walk()
            .into_iter()
            .map(|n| CandidateCategory {
                id: CategoryRef::Category(n.category.id),
                path: n.path.clone(),
                level: n.depth + 1,
            })
            .collect()
    }
}

fn mark_reachable(nodes: &[CategoryTreeNode], from: &[usize], reached: &mut [bool]) {
    let mut stack: Vec<usize> = from.to_vec();
    while let Some(i) = stack.pop() {
        if reached[i] {
            continue;
        }
        reached[i] = true;
        stack.extend(nodes[i].children.iter().copied());
    }
}

/// Explicit sort order first, then case-insensitive name.
fn sibling_order(a: &Category, b: &Category) -> Ordering {
    match (a.sort_order, b.sort_order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    .then_with(|| a.id.cmp(&b.id))
}

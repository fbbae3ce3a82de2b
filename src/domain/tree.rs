//! Flat-to-nested tree construction for parent-linked entities.
//!
//! Categories and pages both carry an optional `parent_id`; navigation and
//! admin views need them as nested trees. The builder is shape-agnostic:
//! depth limits (categories nest at most two levels) are business rules
//! enforced by the admin services, not here.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, PageRecord};

/// An entity that can participate in a parent-linked tree.
pub trait TreeItem {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
}

/// A materialized tree node wrapping the original entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

/// Convert a flat, ordered collection into a forest of trees.
///
/// Guarantees:
/// - every input item appears in the output exactly once;
/// - an item whose parent is absent from the input becomes a root;
/// - children keep the relative order of the input sequence;
/// - a parent cycle is broken by promoting the node whose edge closes the
///   loop to a root (logged as a warning).
pub fn build_tree<T: TreeItem>(items: Vec<T>) -> Vec<TreeNode<T>> {
    let count = items.len();
    let mut index_by_id: HashMap<Uuid, usize> = HashMap::with_capacity(count);
    for (index, item) in items.iter().enumerate() {
        index_by_id.entry(item.id()).or_insert(index);
    }

    // Resolve each parent reference to an input index, treating dangling and
    // self references as roots.
    let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(count);
    for (index, item) in items.iter().enumerate() {
        let resolved = match item.parent_id() {
            None => None,
            Some(parent_id) => match index_by_id.get(&parent_id) {
                Some(&parent_index) if parent_index != index => Some(parent_index),
                Some(_) => {
                    warn!(
                        target = "atelier::domain::tree",
                        id = %item.id(),
                        "item references itself as parent; promoting to root"
                    );
                    None
                }
                None => {
                    debug!(
                        target = "atelier::domain::tree",
                        id = %item.id(),
                        parent_id = %parent_id,
                        "parent not present in input; treating item as root"
                    );
                    None
                }
            },
        };
        parent_of.push(resolved);
    }

    cut_cycles(&items, &mut parent_of);

    let mut child_indices: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut root_indices: Vec<usize> = Vec::new();
    for (index, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent_index) => child_indices[*parent_index].push(index),
            None => root_indices.push(index),
        }
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    root_indices
        .into_iter()
        .map(|root| assemble(root, &mut slots, &child_indices))
        .collect()
}

/// Break parent cycles by cutting the edge that closes each loop.
///
/// Walks every ancestry chain once; chains that terminate in an already
/// processed node are left untouched.
fn cut_cycles<T: TreeItem>(items: &[T], parent_of: &mut [Option<usize>]) {
    const UNSEEN: u8 = 0;
    const ON_CHAIN: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parent_of.len()];
    for start in 0..parent_of.len() {
        if state[start] != UNSEEN {
            continue;
        }

        let mut chain = Vec::new();
        let mut current = start;
        loop {
            state[current] = ON_CHAIN;
            chain.push(current);

            let Some(parent) = parent_of[current] else {
                break;
            };
            if state[parent] == ON_CHAIN {
                warn!(
                    target = "atelier::domain::tree",
                    id = %items[current].id(),
                    parent_id = %items[parent].id(),
                    "parent cycle detected; promoting item to root"
                );
                parent_of[current] = None;
                break;
            }
            if state[parent] == DONE {
                break;
            }
            current = parent;
        }

        for index in chain {
            state[index] = DONE;
        }
    }
}

fn assemble<T>(
    index: usize,
    slots: &mut Vec<Option<T>>,
    child_indices: &[Vec<usize>],
) -> TreeNode<T> {
    let children = child_indices[index]
        .clone()
        .into_iter()
        .map(|child| assemble(child, slots, child_indices))
        .collect();
    let item = slots[index]
        .take()
        .expect("tree index visited exactly once");
    TreeNode { item, children }
}

impl TreeItem for CategoryRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

impl TreeItem for PageRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Item {
        id: Uuid,
        parent_id: Option<Uuid>,
        label: &'static str,
    }

    impl TreeItem for Item {
        fn id(&self) -> Uuid {
            self.id
        }

        fn parent_id(&self) -> Option<Uuid> {
            self.parent_id
        }
    }

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn item(id: u128, parent: Option<u128>, label: &'static str) -> Item {
        Item {
            id: uuid(id),
            parent_id: parent.map(uuid),
            label,
        }
    }

    fn count_nodes<T>(nodes: &[TreeNode<T>]) -> usize {
        nodes
            .iter()
            .map(|node| 1 + count_nodes(&node.children))
            .sum()
    }

    #[test]
    fn nests_children_under_declared_parents() {
        let tree = build_tree(vec![
            item(1, None, "residential"),
            item(2, Some(1), "single-family"),
            item(3, Some(1), "multi-family"),
            item(4, None, "civic"),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].item.label, "residential");
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].item.label, "single-family");
        assert_eq!(tree[0].children[1].item.label, "multi-family");
        assert_eq!(tree[1].item.label, "civic");
        assert_eq!(count_nodes(&tree), 4);
    }

    #[test]
    fn missing_parent_becomes_root() {
        let tree = build_tree(vec![
            item(1, None, "a"),
            item(2, Some(1), "b"),
            item(3, Some(99), "c"),
        ]);

        let roots: Vec<_> = tree.iter().map(|node| node.item.label).collect();
        assert_eq!(roots, vec!["a", "c"]);
        assert_eq!(tree[0].children[0].item.label, "b");
        assert_eq!(count_nodes(&tree), 3);
    }

    #[test]
    fn children_preserve_input_order() {
        let tree = build_tree(vec![
            item(1, None, "root"),
            item(5, Some(1), "zeta"),
            item(2, Some(1), "alpha"),
            item(9, Some(1), "midway"),
        ]);

        let order: Vec<_> = tree[0]
            .children
            .iter()
            .map(|node| node.item.label)
            .collect();
        assert_eq!(order, vec!["zeta", "alpha", "midway"]);
    }

    #[test]
    fn supports_depth_beyond_two_levels() {
        let tree = build_tree(vec![
            item(1, None, "root"),
            item(2, Some(1), "child"),
            item(3, Some(2), "grandchild"),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].children[0].item.label, "grandchild");
    }

    #[test]
    fn self_parent_is_promoted_to_root() {
        let tree = build_tree(vec![item(1, Some(1), "loner")]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn cycle_is_cut_and_all_nodes_survive() {
        let tree = build_tree(vec![
            item(1, Some(2), "a"),
            item(2, Some(1), "b"),
            item(3, None, "c"),
        ]);

        assert_eq!(count_nodes(&tree), 3);
        // One of the cycle members must have been promoted to a root.
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn longer_cycle_preserves_count() {
        let tree = build_tree(vec![
            item(1, Some(3), "a"),
            item(2, Some(1), "b"),
            item(3, Some(2), "c"),
        ]);

        assert_eq!(count_nodes(&tree), 3);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        let tree: Vec<TreeNode<Item>> = build_tree(Vec::new());
        assert!(tree.is_empty());
    }
}

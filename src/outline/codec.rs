use crate::models::TaskItem;
use std::collections::{HashMap, HashSet};

/// Transient nested form, only materialized while loading a collection.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TreeNode {
    pub item: TaskItem,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    #[cfg(test)]
    pub fn leaf(item: TaskItem) -> Self {
        Self {
            item,
            children: vec![],
        }
    }

    pub fn with_children(item: TaskItem, children: Vec<TreeNode>) -> Self {
        Self { item, children }
    }
}

/// Pre-order walk. Parent links, levels and display order come from the tree shape,
/// whatever the nodes carried before.
pub(crate) fn flatten(roots: &[TreeNode]) -> Vec<TaskItem> {
    flatten_within(roots, usize::MAX)
}

/// Like [`flatten`], but no row ends up deeper than `max_level`: the subtree below a node at
/// `max_level` follows it in pre-order as its siblings.
pub(crate) fn flatten_within(roots: &[TreeNode], max_level: usize) -> Vec<TaskItem> {
    fn push(item: &TaskItem, parent: Option<&str>, level: usize, out: &mut Vec<TaskItem>) {
        let mut item = item.clone();
        item.parent_id = parent.map(str::to_string);
        item.level = level;
        item.display_order = out.len() as u32 + 1;
        out.push(item);
    }

    fn hoist(nodes: &[TreeNode], parent: Option<&str>, level: usize, out: &mut Vec<TaskItem>) {
        for node in nodes {
            push(&node.item, parent, level, out);
            hoist(&node.children, parent, level, out);
        }
    }

    fn walk(
        node: &TreeNode,
        parent: Option<&str>,
        depth: usize,
        max_level: usize,
        out: &mut Vec<TaskItem>,
    ) {
        push(&node.item, parent, depth, out);

        if depth >= max_level {
            hoist(&node.children, parent, depth, out);
            return;
        }
        for child in node.children.iter() {
            walk(child, Some(node.item.id.as_str()), depth + 1, max_level, out);
        }
    }

    let mut out = Vec::new();
    for root in roots {
        walk(root, None, 0, max_level, &mut out);
    }
    out
}

/// Group rows by parent.
///
/// - Sibling order follows `display_order`; ties keep input order.
/// - A row whose parent is missing from the input becomes a root.
/// - Rows caught in a parent cycle are never reachable from a root; they are promoted to
///   roots too, so nothing is dropped.
pub(crate) fn build(items: &[TaskItem]) -> Vec<TreeNode> {
    let mut ordered: Vec<&TaskItem> = items.iter().collect();
    ordered.sort_by_key(|n| n.display_order);

    let present: HashSet<&str> = ordered.iter().map(|n| n.id.as_str()).collect();

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    for (i, n) in ordered.iter().enumerate() {
        match n.parent_id.as_deref() {
            Some(p) if p != n.id && present.contains(p) => {
                children.entry(p).or_default().push(i);
            }
            _ => roots.push(i),
        }
    }

    fn attach(
        i: usize,
        ordered: &[&TaskItem],
        children: &HashMap<&str, Vec<usize>>,
        visited: &mut [bool],
    ) -> TreeNode {
        visited[i] = true;
        let item = ordered[i].clone();

        let mut kids = Vec::new();
        if let Some(idxs) = children.get(item.id.as_str()) {
            for &k in idxs {
                if !visited[k] {
                    kids.push(attach(k, ordered, children, visited));
                }
            }
        }

        TreeNode::with_children(item, kids)
    }

    let mut visited = vec![false; ordered.len()];
    let mut out = Vec::with_capacity(roots.len());
    for i in roots {
        if !visited[i] {
            out.push(attach(i, &ordered, &children, &mut visited));
        }
    }

    for i in 0..ordered.len() {
        if !visited[i] {
            out.push(attach(i, &ordered, &children, &mut visited));
        }
    }

    out
}

/// Turn stored rows (any order, stale levels, any depth) into a canonical flat sequence
/// no deeper than `max_level`.
pub(crate) fn normalize(rows: &[TaskItem], max_level: usize) -> Vec<TaskItem> {
    flatten_within(&build(rows), max_level)
}


#[cfg(all(test, not(target_arch = "wasm32")))]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    /// Forests up to three levels deep; ids are assigned afterwards in pre-order.
    fn arb_forest() -> impl Strategy<Value = Vec<TreeNode>> {
        Just(Vec::<TreeNode>::new()).prop_recursive(3, 32, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(|kids| {
                kids.into_iter()
                    .map(|c| TreeNode::with_children(TaskItem::new(String::new(), String::new()), c))
                    .collect()
            })
        })
    }

    fn relabel(nodes: &mut [TreeNode], next: &mut usize) {
        for n in nodes {
            *next += 1;
            n.item.id = format!("n{next}");
            n.item.name = format!("Task {next}");
            relabel(&mut n.children, next);
        }
    }

    proptest! {
        #[test]
        fn flatten_is_stable_through_build(mut forest in arb_forest()) {
            relabel(&mut forest, &mut 0);
            let flat = flatten(&forest);
            prop_assert!(super::super::invariants::check(&flat, 2).is_ok());
            prop_assert_eq!(&flatten(&build(&flat)), &flat);
            prop_assert_eq!(normalize(&flat, 2), flat);
        }
    }
}

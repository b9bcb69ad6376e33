use super::Tree;
use crate::libs::phylo::node::NodeId;

/// Get IDs of all leaves in subtree rooted at `id`.
pub fn get_leaves(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut stack = vec![id];

    while let Some(curr) = stack.pop() {
        if let Some(node) = tree.get_node(curr) {
            if node.children.is_empty() {
                leaves.push(curr);
            } else {
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
    }
    leaves
}

/// Get names of all leaves in subtree.
pub fn get_leaf_names(tree: &Tree, id: NodeId) -> Vec<Option<String>> {
    get_leaves(tree, id)
        .into_iter()
        .map(|leaf_id| tree.get_node(leaf_id).and_then(|n| n.name.clone()))
        .collect()
}

/// Support values of internal nodes in preorder, the root excluded.
pub fn get_supports(tree: &Tree) -> Vec<f64> {
    let root = match tree.get_root() {
        Some(r) => r,
        None => return Vec::new(),
    };

    super::traversal::preorder(tree, root)
        .into_iter()
        .filter(|&id| id != root)
        .filter_map(|id| tree.get_node(id))
        .filter(|node| !node.is_leaf())
        .filter_map(|node| node.support)
        .collect()
}

/// Arithmetic mean of the non-root support values.
///
/// Returns `None` when the tree has no supported internal node besides the root.
pub fn mean_support(tree: &Tree) -> Option<f64> {
    let supports = get_supports(tree);
    if supports.is_empty() {
        None
    } else {
        Some(supports.iter().sum::<f64>() / supports.len() as f64)
    }
}

use super::Tree;
use crate::libs::phylo::node::NodeId;
use std::collections::VecDeque;

pub fn get_path_from_root(tree: &Tree, id: &NodeId) -> Result<Vec<NodeId>, String> {
    let mut path = Vec::new();
    let mut current = *id;

    if tree.get_node(current).is_none() {
        return Err(format!("Node {} not found", current));
    }

    loop {
        path.push(current);
        match tree.nodes[current].parent {
            Some(p) => current = p,
            None => break,
        }
    }

    path.reverse();
    if let Some(root) = tree.root {
        if path[0] != root {
            return Err("Node is detached from root".to_string());
        }
    }

    Ok(path)
}

/// Find Lowest Common Ancestor (LCA) of two nodes.
pub fn get_common_ancestor(tree: &Tree, a: &NodeId, b: &NodeId) -> Result<NodeId, String> {
    let path_a = get_path_from_root(tree, a)?;
    let path_b = get_path_from_root(tree, b)?;

    let mut lca = None;

    for (u, v) in path_a.iter().zip(path_b.iter()) {
        if u == v {
            lca = Some(*u);
        } else {
            break;
        }
    }

    lca.ok_or_else(|| "Nodes are not in the same tree (no common ancestor)".to_string())
}

/// Calculate distance between two nodes.
/// Returns (weighted_distance, topological_distance).
pub fn get_distance(tree: &Tree, a: &NodeId, b: &NodeId) -> Result<(f64, usize), String> {
    let lca = get_common_ancestor(tree, a, b)?;

    let dist_to_lca = |start: &NodeId, end: &NodeId| -> (f64, usize) {
        let mut weighted = 0.0;
        let mut topo = 0;
        let mut curr = *start;

        while curr != *end {
            match tree.get_node(curr) {
                Some(node) => {
                    weighted += node.length.unwrap_or(0.0);
                    topo += 1;
                    match node.parent {
                        Some(p) => curr = p,
                        None => break,
                    }
                }
                None => break,
            }
        }
        (weighted, topo)
    };

    let (w1, t1) = dist_to_lca(a, &lca);
    let (w2, t2) = dist_to_lca(b, &lca);

    Ok((w1 + w2, t1 + t2))
}

/// Weighted distance from `start` to every node, indexed by NodeId.
///
/// Edges are walked in both directions, so one call yields all patristic
/// distances from a leaf in O(N).
pub fn distances_from(tree: &Tree, start: NodeId) -> Vec<f64> {
    let mut dist = vec![f64::NAN; tree.nodes.len()];
    if tree.get_node(start).is_none() {
        return dist;
    }

    let mut queue = VecDeque::new();
    dist[start] = 0.0;
    queue.push_back(start);

    while let Some(u) = queue.pop_front() {
        let node = &tree.nodes[u];
        let d = dist[u];

        for &child in &node.children {
            if dist[child].is_nan() {
                dist[child] = d + tree.nodes[child].length.unwrap_or(0.0);
                queue.push_back(child);
            }
        }
        if let Some(p) = node.parent {
            if dist[p].is_nan() {
                dist[p] = d + node.length.unwrap_or(0.0);
                queue.push_back(p);
            }
        }
    }

    dist
}

/// Get node ID by name. Returns first match.
pub fn get_node_by_name(tree: &Tree, name: &str) -> Option<NodeId> {
    tree.nodes
        .iter()
        .find(|n| n.name.as_deref() == Some(name))
        .map(|n| n.id)
}

use super::Tree;
use crate::libs::phylo::node::NodeId;
use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// Build a map from leaf name to index (0..N-1).
///
/// Names are sorted, so the indices do not depend on the leaf order of the
/// tree the map is built from.
pub fn build_leaf_map(tree: &Tree) -> Result<HashMap<String, usize>, String> {
    let mut leaf_names = Vec::new();
    for node in &tree.nodes {
        if node.is_leaf() {
            match &node.name {
                Some(name) => leaf_names.push(name.clone()),
                None => return Err("Leaf node missing name".to_string()),
            }
        }
    }

    leaf_names.sort();
    leaf_names.dedup();

    Ok(leaf_names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect())
}

/// Compute bitsets for all nodes in the tree.
/// Returns a map NodeId -> FixedBitSet (the leaves below each node).
pub fn compute_all_bitsets(
    tree: &Tree,
    leaf_map: &HashMap<String, usize>,
) -> Result<HashMap<NodeId, FixedBitSet>, String> {
    let num_leaves = leaf_map.len();
    let mut node_bitsets = HashMap::new();

    if let Some(root) = tree.get_root() {
        // Post-order: Children processed before parents
        for id in tree.postorder(&root)? {
            let node = tree
                .get_node(id)
                .ok_or_else(|| format!("Node {} not found", id))?;
            let mut bitset = FixedBitSet::with_capacity(num_leaves);

            if node.is_leaf() {
                let name = node.name.as_ref().ok_or("Leaf node missing name")?;
                let idx = leaf_map
                    .get(name)
                    .ok_or_else(|| format!("Leaf {} is not in the leaf map", name))?;
                bitset.insert(*idx);
            } else {
                for child in &node.children {
                    if let Some(child_bs) = node_bitsets.get(child) {
                        bitset.union_with(child_bs);
                    }
                }
            }
            node_bitsets.insert(id, bitset);
        }
    }

    Ok(node_bitsets)
}

/// Orient a split to the side that excludes taxon 0.
///
/// Both sides of an unrooted bipartition then map to one key, and the keys
/// of compatible splits nest like clades of a tree rooted at taxon 0.
pub fn normalize_split(bitset: &FixedBitSet, num_leaves: usize) -> FixedBitSet {
    let mut normalized = bitset.clone();
    if num_leaves > 0 && normalized.contains(0) {
        normalized.toggle_range(..num_leaves);
    }
    normalized
}

/// A split is trivial when one side holds at most one taxon.
pub fn is_trivial(split: &FixedBitSet, num_leaves: usize) -> bool {
    let count = split.count_ones(..);
    count <= 1 || count + 1 >= num_leaves
}

/// Split frequencies and branch lengths accumulated over replicate trees.
#[derive(Debug, Default, Clone)]
pub struct SplitCounts {
    /// Number of trees read
    pub trees: usize,
    /// Normalized split -> (trees containing it, summed branch length)
    pub splits: HashMap<FixedBitSet, (usize, f64)>,
    /// Leaf index -> summed terminal branch length
    pub terminal: Vec<f64>,
}

/// Count non-trivial splits over a list of replicate trees.
///
/// Every non-root node contributes the split induced by the edge above it,
/// so a tree contributes each of its splits once.
pub fn count_splits(
    trees: &[Tree],
    leaf_map: &HashMap<String, usize>,
) -> Result<SplitCounts, String> {
    let num_leaves = leaf_map.len();
    let mut counts = SplitCounts {
        terminal: vec![0.0; num_leaves],
        ..Default::default()
    };

    for tree in trees {
        let bitsets = compute_all_bitsets(tree, leaf_map)?;
        let mut seen = std::collections::HashSet::new();

        for (id, bs) in bitsets {
            let node = tree
                .get_node(id)
                .ok_or_else(|| format!("Node {} not found", id))?;
            if node.is_root() {
                continue;
            }
            let length = node.length.unwrap_or(0.0);

            if node.is_leaf() {
                if let Some(idx) = bs.ones().next() {
                    counts.terminal[idx] += length;
                }
                continue;
            }

            let split = normalize_split(&bs, num_leaves);
            if is_trivial(&split, num_leaves) || !seen.insert(split.clone()) {
                continue;
            }
            let entry = counts.splits.entry(split).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += length;
        }
        counts.trees += 1;
    }

    Ok(counts)
}

fn is_compatible(a: &FixedBitSet, b: &FixedBitSet) -> bool {
    a.is_disjoint(b) || a.is_subset(b) || a.is_superset(b)
}

/// Build a consensus tree from split counts.
///
/// Splits are visited by descending support, then descending size, then
/// ascending taxon indices. A split is kept when its support (percentage of
/// trees) is strictly greater than `cutoff * 100` and it is compatible with
/// all splits kept so far. Kept splits become internal nodes carrying their
/// support and mean branch length; leaves carry their mean terminal length.
/// The root holds taxon 0 and has no support.
pub fn consensus_tree(
    counts: &SplitCounts,
    leaf_map: &HashMap<String, usize>,
    cutoff: f64,
) -> Result<Tree, String> {
    let num_leaves = leaf_map.len();
    if counts.trees == 0 {
        return Err("No replicate trees to summarize".to_string());
    }

    let total = counts.trees as f64;
    let mut candidates: Vec<(&FixedBitSet, usize, f64, Vec<usize>)> = counts
        .splits
        .iter()
        .map(|(bs, &(count, len_sum))| (bs, count, len_sum, bs.ones().collect()))
        .collect();
    candidates.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.3.len().cmp(&a.3.len()))
            .then_with(|| a.3.cmp(&b.3))
    });

    // (split, support, mean length)
    let mut kept: Vec<(FixedBitSet, f64, f64)> = Vec::new();
    for (bs, count, len_sum, _) in candidates {
        let support = 100.0 * count as f64 / total;
        if support <= cutoff * 100.0 {
            // Sorted by support, nothing after this passes either
            break;
        }
        if kept.iter().all(|(k, _, _)| is_compatible(k, bs)) {
            kept.push((bs.clone(), support, len_sum / count as f64));
        }
    }

    // Larger clades first, so every parent exists before its children
    kept.sort_by(|a, b| {
        b.0.count_ones(..)
            .cmp(&a.0.count_ones(..))
            .then_with(|| a.0.ones().collect::<Vec<_>>().cmp(&b.0.ones().collect()))
    });

    let mut names = vec![String::new(); num_leaves];
    for (name, &idx) in leaf_map {
        names[idx] = name.clone();
    }

    let mut tree = Tree::new();
    let root = tree.add_node();
    tree.set_root(root);

    // Smallest kept clade containing `bs`, among the first `upto` clades
    let parent_of = |bs: &FixedBitSet, upto: usize, ids: &[NodeId]| -> NodeId {
        (0..upto)
            .rev()
            .find(|&k| kept[k].0.is_superset(bs))
            .map(|k| ids[k])
            .unwrap_or(root)
    };

    let mut clade_ids: Vec<NodeId> = Vec::with_capacity(kept.len());
    for (k, (bs, support, length)) in kept.iter().enumerate() {
        let id = tree.add_node();
        tree.set_support(id, *support);
        tree.set_length(id, *length);
        let parent = parent_of(bs, k, &clade_ids);
        tree.add_child(parent, id)?;
        clade_ids.push(id);
    }

    for (idx, name) in names.iter().enumerate() {
        let id = tree.add_leaf(name.as_str());
        tree.set_length(id, counts.terminal[idx] / total);
        let mut single = FixedBitSet::with_capacity(num_leaves);
        single.insert(idx);
        let parent = parent_of(&single, kept.len(), &clade_ids);
        tree.add_child(parent, id)?;
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rooted at a trifurcation: (X,Y,(Z,W))
    fn tree_with_cherry(names: [&str; 4], inner_len: f64) -> Tree {
        let mut tree = Tree::new();
        let root = tree.add_node();
        tree.set_root(root);
        let ids: Vec<NodeId> = names.iter().map(|n| tree.add_leaf(*n)).collect();
        let inner = tree.add_node();
        tree.add_child(root, ids[0]).unwrap();
        tree.add_child(root, ids[1]).unwrap();
        tree.add_child(root, inner).unwrap();
        tree.add_child(inner, ids[2]).unwrap();
        tree.add_child(inner, ids[3]).unwrap();
        tree.set_length(inner, inner_len);
        for &id in &ids {
            tree.set_length(id, 1.0);
        }
        tree
    }

    #[test]
    fn test_build_leaf_map_sorted() {
        let tree = tree_with_cherry(["D", "B", "C", "A"], 1.0);
        let map = build_leaf_map(&tree).unwrap();
        assert_eq!(map["A"], 0);
        assert_eq!(map["B"], 1);
        assert_eq!(map["C"], 2);
        assert_eq!(map["D"], 3);
    }

    #[test]
    fn test_count_splits_unrooted() {
        // (A,B,(C,D)) and (C,D,(A,B)) display the same unrooted split
        let t1 = tree_with_cherry(["A", "B", "C", "D"], 0.5);
        let t2 = tree_with_cherry(["C", "D", "A", "B"], 1.5);
        let t3 = tree_with_cherry(["A", "C", "B", "D"], 1.0);
        let map = build_leaf_map(&t1).unwrap();

        let counts = count_splits(&[t1, t2, t3], &map).unwrap();
        assert_eq!(counts.trees, 3);
        assert_eq!(counts.splits.len(), 2);

        let mut cd = FixedBitSet::with_capacity(4);
        cd.insert(2);
        cd.insert(3);
        let (count, len_sum) = counts.splits[&cd];
        assert_eq!(count, 2);
        assert!((len_sum - 2.0).abs() < 1e-12);
        assert_eq!(counts.terminal, vec![3.0; 4]);
    }

    #[test]
    fn test_consensus_majority() {
        let trees = vec![
            tree_with_cherry(["A", "B", "C", "D"], 0.5),
            tree_with_cherry(["C", "D", "A", "B"], 1.5),
            tree_with_cherry(["A", "C", "B", "D"], 1.0),
        ];
        let map = build_leaf_map(&trees[0]).unwrap();
        let counts = count_splits(&trees, &map).unwrap();
        let tree = consensus_tree(&counts, &map, 0.5).unwrap();

        // Root holds A, B and the (C,D) clade
        let root = tree.get_root().unwrap();
        assert_eq!(tree.get_node(root).unwrap().children.len(), 3);
        assert_eq!(tree.get_node(root).unwrap().support, None);

        let supports = tree.get_supports();
        assert_eq!(supports.len(), 1);
        assert!((supports[0] - 200.0 / 3.0).abs() < 1e-9);

        let c = tree.get_node_by_name("C").unwrap();
        let d = tree.get_node_by_name("D").unwrap();
        let parent = tree.get_node(c).unwrap().parent.unwrap();
        assert_eq!(tree.get_node(d).unwrap().parent, Some(parent));
        assert!((tree.get_node(parent).unwrap().length.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_consensus_drops_minority_splits() {
        let trees = vec![
            tree_with_cherry(["A", "B", "C", "D"], 1.0),
            tree_with_cherry(["A", "C", "B", "D"], 1.0),
        ];
        let map = build_leaf_map(&trees[0]).unwrap();
        let counts = count_splits(&trees, &map).unwrap();

        // 50% is not a majority: star tree
        let tree = consensus_tree(&counts, &map, 0.5).unwrap();
        assert!(tree.get_supports().is_empty());
        assert_eq!(tree.get_leaves().len(), 4);

        // A zero cutoff keeps the first of the two conflicting splits only
        let tree = consensus_tree(&counts, &map, 0.0).unwrap();
        assert_eq!(tree.get_supports(), vec![50.0]);
    }
}

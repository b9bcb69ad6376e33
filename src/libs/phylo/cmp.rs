use super::tree::{stat, Tree};
use crate::libs::error::{PhyloGeoError, Result};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// What the comparator and the result filter need from a tree.
///
/// Trees from neighbor joining and from bootstrap consensus both implement
/// it through [`Tree`], but nothing downstream depends on the arena layout.
pub trait Phylogeny {
    /// Names of all leaves, in tree order. Duplicates are reported as-is.
    fn leaf_names(&self) -> Vec<String>;

    /// Sum of branch lengths on the path between two named leaves.
    fn patristic_distance(&self, a: &str, b: &str) -> Option<f64>;

    /// Confidence values of the internal nodes, the root excluded.
    fn confidences(&self) -> Vec<f64>;

    /// Pairwise patristic distances among `names`, as a square matrix.
    ///
    /// Returns `None` if a name is not a leaf of this tree.
    fn patristic_matrix(&self, names: &[String]) -> Option<Vec<Vec<f64>>> {
        let n = names.len();
        let mut mat = vec![vec![0.0; n]; n];
        for (i, j) in (0..n).tuple_combinations() {
            let d = self.patristic_distance(&names[i], &names[j])?;
            mat[i][j] = d;
            mat[j][i] = d;
        }
        Some(mat)
    }

    /// Mean of [`Phylogeny::confidences`]; `None` when there are none.
    fn mean_confidence(&self) -> Option<f64> {
        let values = self.confidences();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

impl Phylogeny for Tree {
    fn leaf_names(&self) -> Vec<String> {
        self.get_leaf_names().into_iter().flatten().collect()
    }

    fn patristic_distance(&self, a: &str, b: &str) -> Option<f64> {
        let ia = self.get_node_by_name(a)?;
        let ib = self.get_node_by_name(b)?;
        self.get_distance(&ia, &ib).ok().map(|(weighted, _)| weighted)
    }

    fn confidences(&self) -> Vec<f64> {
        stat::get_supports(self)
    }

    fn mean_confidence(&self) -> Option<f64> {
        stat::mean_support(self)
    }

    // One traversal per leaf instead of one LCA walk per pair
    fn patristic_matrix(&self, names: &[String]) -> Option<Vec<Vec<f64>>> {
        let ids = names
            .iter()
            .map(|name| self.get_node_by_name(name))
            .collect::<Option<Vec<_>>>()?;

        let mat = ids
            .iter()
            .map(|&from| {
                let dist = self.distances_from(from);
                ids.iter().map(|&to| dist[to]).collect()
            })
            .collect();
        Some(mat)
    }
}

/// Check that two trees carry the same leaf names, each exactly once.
///
/// Returns the shared names in sorted order.
pub fn shared_leaves<A, B>(t1: &A, t2: &B) -> Result<Vec<String>>
where
    A: Phylogeny + ?Sized,
    B: Phylogeny + ?Sized,
{
    let (set1, dup1) = count_names(t1.leaf_names());
    let (set2, dup2) = count_names(t2.leaf_names());

    let only_left: Vec<String> = set1.difference(&set2).cloned().collect();
    let only_right: Vec<String> = set2.difference(&set1).cloned().collect();
    let duplicated: Vec<String> = dup1.union(&dup2).cloned().collect();

    if !only_left.is_empty() || !only_right.is_empty() || !duplicated.is_empty() {
        return Err(PhyloGeoError::IncompatibleLeafSet {
            only_left,
            only_right,
            duplicated,
        });
    }

    Ok(set1.into_iter().collect())
}

fn count_names(names: Vec<String>) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    let dups = counts
        .iter()
        .filter(|(_, &c)| c > 1)
        .map(|(name, _)| name.clone())
        .collect();
    (counts.into_keys().collect(), dups)
}

/// Least-squares distance between two trees with identical leaf sets.
///
/// Sum over every unordered pair of distinct leaves of
/// `|d1(i,j) - d2(i,j)|`, where `d` is the patristic distance.
///
/// ```
/// use phylogeo::libs::phylo::{least_squares, DissimilarityMatrix};
/// use phylogeo::libs::phylo::build::nj;
///
/// let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
/// let t1 = nj(&DissimilarityMatrix::from_fn(names.clone(), |_, _| 1.0)).unwrap();
/// let t2 = nj(&DissimilarityMatrix::from_fn(names, |_, _| 0.5)).unwrap();
/// assert!((least_squares(&t1, &t2).unwrap() - 1.5).abs() < 1e-9);
/// ```
pub fn least_squares<A, B>(t1: &A, t2: &B) -> Result<f64>
where
    A: Phylogeny + ?Sized,
    B: Phylogeny + ?Sized,
{
    let names = shared_leaves(t1, t2)?;

    let missing = || PhyloGeoError::Tree("leaf without a path to the root".to_string());
    let m1 = t1.patristic_matrix(&names).ok_or_else(missing)?;
    let m2 = t2.patristic_matrix(&names).ok_or_else(missing)?;

    let ls = (0..names.len())
        .tuple_combinations()
        .map(|(i, j)| (m1[i][j] - m2[i][j]).abs())
        .sum();

    Ok(ls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::phylo::NodeId;
    use approx::assert_relative_eq;

    // (A:a,B:b,(C:c,D:d):e)
    fn quartet(lengths: [f64; 5], names: [&str; 4]) -> Tree {
        let mut tree = Tree::new();
        let root = tree.add_node();
        tree.set_root(root);
        let leaves: Vec<NodeId> = names.iter().map(|n| tree.add_leaf(*n)).collect();
        let inner = tree.add_node();
        tree.add_child(root, leaves[0]).unwrap();
        tree.add_child(root, leaves[1]).unwrap();
        tree.add_child(root, inner).unwrap();
        tree.add_child(inner, leaves[2]).unwrap();
        tree.add_child(inner, leaves[3]).unwrap();
        for (id, len) in [leaves[0], leaves[1], leaves[2], leaves[3], inner]
            .into_iter()
            .zip(lengths)
        {
            tree.set_length(id, len);
        }
        tree
    }

    #[test]
    fn test_ls_identical_is_zero() {
        let t = quartet([0.1, 0.2, 0.3, 0.4, 0.5], ["A", "B", "C", "D"]);
        assert_eq!(least_squares(&t, &t).unwrap(), 0.0);
    }

    #[test]
    fn test_ls_symmetric() {
        let t1 = quartet([0.1, 0.2, 0.3, 0.4, 0.5], ["A", "B", "C", "D"]);
        let t2 = quartet([0.3, 0.1, 0.2, 0.2, 0.05], ["A", "C", "B", "D"]);
        let d12 = least_squares(&t1, &t2).unwrap();
        let d21 = least_squares(&t2, &t1).unwrap();
        assert!(d12 > 0.0);
        assert_relative_eq!(d12, d21, epsilon = 1e-12);
    }

    #[test]
    fn test_ls_branch_length_difference() {
        // Only the internal branch differs, by 1.0; it lies on the
        // paths A-C, A-D, B-C and B-D.
        let t1 = quartet([1.0, 1.0, 1.0, 1.0, 1.0], ["A", "B", "C", "D"]);
        let t2 = quartet([1.0, 1.0, 1.0, 1.0, 2.0], ["A", "B", "C", "D"]);
        assert_relative_eq!(least_squares(&t1, &t2).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ls_matches_pairwise_definition() {
        let t1 = quartet([0.1, 0.2, 0.3, 0.4, 0.5], ["A", "B", "C", "D"]);
        let t2 = quartet([0.3, 0.1, 0.2, 0.2, 0.05], ["D", "C", "B", "A"]);

        let names = ["A", "B", "C", "D"];
        let mut expected = 0.0;
        for i in 0..4 {
            for j in (i + 1)..4 {
                let d1 = t1.patristic_distance(names[i], names[j]).unwrap();
                let d2 = t2.patristic_distance(names[i], names[j]).unwrap();
                expected += (d1 - d2).abs();
            }
        }
        assert_relative_eq!(least_squares(&t1, &t2).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_ls_leaf_mismatch() {
        let t1 = quartet([1.0; 5], ["A", "B", "C", "D"]);
        let t2 = quartet([1.0; 5], ["A", "B", "C", "E"]);
        match least_squares(&t1, &t2) {
            Err(PhyloGeoError::IncompatibleLeafSet {
                only_left,
                only_right,
                ..
            }) => {
                assert_eq!(only_left, vec!["D".to_string()]);
                assert_eq!(only_right, vec!["E".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ls_duplicate_leaf() {
        let t1 = quartet([1.0; 5], ["A", "B", "C", "D"]);
        let t2 = quartet([1.0; 5], ["A", "B", "C", "C"]);
        assert!(matches!(
            least_squares(&t1, &t2),
            Err(PhyloGeoError::IncompatibleLeafSet { .. })
        ));
    }

    #[test]
    fn test_mean_confidence_excludes_root() {
        let mut t = quartet([1.0; 5], ["A", "B", "C", "D"]);
        let root = t.get_root().unwrap();
        t.set_support(root, 0.0);
        let inner = t.get_node(root).unwrap().children[2];
        t.set_support(inner, 80.0);
        assert_eq!(t.confidences(), vec![80.0]);
        assert_eq!(t.mean_confidence(), Some(80.0));
    }
}

use super::matrix::DissimilarityMatrix;
use super::node::NodeId;
use super::tree::Tree;
use crate::libs::error::{PhyloGeoError, Result};

/// Build an unrooted tree from a distance matrix using Neighbor-Joining.
///
/// At every step the pair `(i, j)` minimising
/// `d(i,j) - r(i) - r(j)`, with `r(i) = sum_k d(i,k) / (m - 2)`, is joined
/// under a new node. Pairs are scanned as `(1,0), (2,0), (2,1), (3,0), ...`
/// and only a strictly smaller value replaces the current best, so ties go
/// to the earliest pair. The new cluster takes the slot of the lower index.
/// Negative branch lengths are clamped to zero.
///
/// When three clusters remain they are attached to a final node, which
/// becomes the (trifurcating) root.
pub fn nj(matrix: &DissimilarityMatrix) -> Result<Tree> {
    let names = matrix.names();
    let n = names.len();

    if n < 3 {
        return Err(PhyloGeoError::InsufficientTaxa { count: n });
    }

    let mut tree = Tree::new();
    let mut active: Vec<NodeId> = names.iter().map(|name| tree.add_leaf(name.as_str())).collect();
    let mut dm = matrix.to_square();

    while active.len() > 3 {
        let m = active.len();

        let r: Vec<f64> = dm
            .iter()
            .map(|row| row.iter().sum::<f64>() / (m - 2) as f64)
            .collect();

        // 1. Find the pair minimising the NJ criterion
        let mut min_i = 1;
        let mut min_j = 0;
        let mut min_q = dm[1][0] - r[1] - r[0];
        for i in 1..m {
            for j in 0..i {
                let q = dm[i][j] - r[i] - r[j];
                if q < min_q {
                    min_q = q;
                    min_i = i;
                    min_j = j;
                }
            }
        }

        // 2. Join them under a new node
        let d_ij = dm[min_i][min_j];
        let len_i = (d_ij + r[min_i] - r[min_j]) / 2.0;
        let len_j = d_ij - len_i;

        let new_node = tree.add_node();
        tree.add_child(new_node, active[min_i])?;
        tree.add_child(new_node, active[min_j])?;
        tree.set_length(active[min_i], len_i.max(0.0));
        tree.set_length(active[min_j], len_j.max(0.0));

        // 3. Distances from the new cluster, stored in slot min_j
        for k in 0..m {
            if k != min_i && k != min_j {
                let d = (dm[min_i][k] + dm[min_j][k] - d_ij) / 2.0;
                dm[min_j][k] = d;
                dm[k][min_j] = d;
            }
        }
        active[min_j] = new_node;

        active.remove(min_i);
        dm.remove(min_i);
        for row in dm.iter_mut() {
            row.remove(min_i);
        }
    }

    // Join the last three clusters at the root
    let (d01, d02, d12) = (dm[0][1], dm[0][2], dm[1][2]);
    let lengths = [
        (d01 + d02 - d12) / 2.0,
        (d01 + d12 - d02) / 2.0,
        (d02 + d12 - d01) / 2.0,
    ];

    let root = tree.add_node();
    for (&id, len) in active.iter().zip(lengths) {
        tree.add_child(root, id)?;
        tree.set_length(id, len.max(0.0));
    }
    tree.set_root(root);

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix(names: &[&str], square: &[&[f64]]) -> DissimilarityMatrix {
        let names = names.iter().map(|s| s.to_string()).collect();
        DissimilarityMatrix::from_fn(names, |i, j| square[i][j])
    }

    fn patristic(tree: &Tree, a: &str, b: &str) -> f64 {
        let ia = tree.get_node_by_name(a).unwrap();
        let ib = tree.get_node_by_name(b).unwrap();
        tree.get_distance(&ia, &ib).unwrap().0
    }

    #[test]
    fn test_nj_too_few_taxa() {
        let mat = matrix(&["A", "B"], &[&[0.0, 1.0], &[1.0, 0.0]]);
        assert!(matches!(
            nj(&mat),
            Err(PhyloGeoError::InsufficientTaxa { count: 2 })
        ));
    }

    #[test]
    fn test_nj_three_taxa() {
        // A-B 3, A-C 4, B-C 5
        let mat = matrix(
            &["A", "B", "C"],
            &[&[0.0, 3.0, 4.0], &[3.0, 0.0, 5.0], &[4.0, 5.0, 0.0]],
        );
        let tree = nj(&mat).unwrap();

        let root = tree.get_root().unwrap();
        assert_eq!(tree.get_node(root).unwrap().children.len(), 3);

        let a = tree.get_node_by_name("A").unwrap();
        let b = tree.get_node_by_name("B").unwrap();
        let c = tree.get_node_by_name("C").unwrap();
        assert_relative_eq!(tree.get_node(a).unwrap().length.unwrap(), 1.0);
        assert_relative_eq!(tree.get_node(b).unwrap().length.unwrap(), 2.0);
        assert_relative_eq!(tree.get_node(c).unwrap().length.unwrap(), 3.0);
    }

    #[test]
    fn test_nj_additive_matrix() {
        // Tree ((A:2,B:3):4,C:5,D:6) realises this additive matrix
        let mat = matrix(
            &["A", "B", "C", "D"],
            &[
                &[0.0, 5.0, 11.0, 12.0],
                &[5.0, 0.0, 12.0, 13.0],
                &[11.0, 12.0, 0.0, 11.0],
                &[12.0, 13.0, 11.0, 0.0],
            ],
        );
        let tree = nj(&mat).unwrap();

        assert_eq!(tree.get_leaves().len(), 4);
        let names = ["A", "B", "C", "D"];
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_relative_eq!(
                    patristic(&tree, names[i], names[j]),
                    mat.get(i, j),
                    epsilon = 1e-9
                );
            }
        }

        // A and B form a cherry
        let a = tree.get_node_by_name("A").unwrap();
        let b = tree.get_node_by_name("B").unwrap();
        assert_eq!(
            tree.get_node(a).unwrap().parent,
            tree.get_node(b).unwrap().parent
        );
    }

    #[test]
    fn test_nj_ties_are_deterministic() {
        // All distances equal: every pair ties, so (1,0) is joined first
        let mat = matrix(
            &["A", "B", "C", "D"],
            &[
                &[0.0, 1.0, 1.0, 1.0],
                &[1.0, 0.0, 1.0, 1.0],
                &[1.0, 1.0, 0.0, 1.0],
                &[1.0, 1.0, 1.0, 0.0],
            ],
        );
        let t1 = nj(&mat).unwrap();
        let t2 = nj(&mat).unwrap();
        assert_eq!(t1.to_newick(), t2.to_newick());

        let a = t1.get_node_by_name("A").unwrap();
        let b = t1.get_node_by_name("B").unwrap();
        assert_eq!(
            t1.get_node(a).unwrap().parent,
            t1.get_node(b).unwrap().parent
        );
    }
}

/// A named, symmetric distance matrix stored as its lower triangle.
///
/// Row `i` holds the values for columns `0..=i`, so symmetry holds by
/// construction and the diagonal is the last entry of each row.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    names: Vec<String>,
    lower: Vec<Vec<f64>>,
}

impl DissimilarityMatrix {
    /// Build from names and a lower-triangular matrix.
    ///
    /// ```
    /// use phylogeo::libs::phylo::DissimilarityMatrix;
    ///
    /// let names = vec!["A".to_string(), "B".to_string()];
    /// let mat = DissimilarityMatrix::new(names, vec![vec![0.0], vec![0.5, 0.0]]).unwrap();
    /// assert_eq!(mat.get(0, 1), 0.5);
    /// assert_eq!(mat.get(1, 0), 0.5);
    /// ```
    pub fn new(names: Vec<String>, lower: Vec<Vec<f64>>) -> Result<Self, String> {
        if names.len() != lower.len() {
            return Err(format!(
                "{} names but {} matrix rows",
                names.len(),
                lower.len()
            ));
        }
        for (i, row) in lower.iter().enumerate() {
            if row.len() != i + 1 {
                return Err(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    i + 1
                ));
            }
            if row[i] != 0.0 {
                return Err(format!("Diagonal entry {} is {}, expected 0", i, row[i]));
            }
        }
        Ok(Self { names, lower })
    }

    /// Build by evaluating `f(i, j)` for every `j <= i`.
    pub fn from_fn<F>(names: Vec<String>, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let lower = (0..names.len())
            .map(|i| (0..=i).map(|j| if i == j { 0.0 } else { f(i, j) }).collect())
            .collect();
        Self { names, lower }
    }

    pub fn size(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn lower_triangle(&self) -> &[Vec<f64>] {
        &self.lower
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j <= i {
            self.lower[i][j]
        } else {
            self.lower[j][i]
        }
    }

    /// Expand into a full square matrix.
    pub fn to_square(&self) -> Vec<Vec<f64>> {
        let n = self.size();
        (0..n)
            .map(|i| (0..n).map(|j| self.get(i, j)).collect())
            .collect()
    }

    /// Smallest and largest value anywhere in the matrix.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.lower.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Relaxed PHYLIP: the taxon count, then one full row per taxon.
    pub fn to_phylip(&self) -> String {
        let mut out = format!("{}\n", self.size());
        for (i, name) in self.names.iter().enumerate() {
            let row: Vec<String> = (0..self.size())
                .map(|j| crate::libs::phylo::tree::io::format_float(self.get(i, j)))
                .collect();
            out.push_str(&format!("{}\t{}\n", name, row.join("\t")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(DissimilarityMatrix::new(names(&["A", "B"]), vec![vec![0.0]]).is_err());
        assert!(
            DissimilarityMatrix::new(names(&["A", "B"]), vec![vec![0.0], vec![0.5]]).is_err()
        );
        assert!(DissimilarityMatrix::new(
            names(&["A", "B"]),
            vec![vec![0.0], vec![0.5, 0.1]]
        )
        .is_err());
    }

    #[test]
    fn test_from_fn_symmetric() {
        let mat = DissimilarityMatrix::from_fn(names(&["A", "B", "C"]), |i, j| (i + j) as f64);
        let sq = mat.to_square();
        for i in 0..3 {
            assert_eq!(sq[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(sq[i][j], sq[j][i]);
            }
        }
        assert_eq!(mat.get(0, 2), 2.0);
        assert_eq!(mat.range(), Some((0.0, 3.0)));
    }

    #[test]
    fn test_to_phylip() {
        let mat = DissimilarityMatrix::from_fn(names(&["A", "B"]), |_, _| 0.25);
        assert_eq!(mat.to_phylip(), "2\nA\t0\t0.25\nB\t0.25\t0\n");
    }
}

//! Climatic measurements and the trees derived from them.

use crate::libs::error::{PhyloGeoError, Result, Stage};
use crate::libs::phylo::{build, DissimilarityMatrix, Tree};
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;

/// What to do with a variable whose values are all identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Treat every pair of specimens as zero distance apart.
    #[default]
    Zero,
    /// Fail with `DegenerateMatrix`.
    Error,
}

impl std::str::FromStr for DegeneratePolicy {
    type Err = PhyloGeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(DegeneratePolicy::Zero),
            "error" => Ok(DegeneratePolicy::Error),
            other => Err(PhyloGeoError::InvalidConfig(format!(
                "degenerate policy must be `zero` or `error`, got `{}`",
                other
            ))),
        }
    }
}

/// Climatic values keyed by specimen, one column per variable.
///
/// Rows keep their file order; specimen ids are unique.
#[derive(Debug, Clone)]
pub struct ClimaticTable {
    ids: Vec<String>,
    columns: IndexMap<String, Vec<f64>>,
}

impl ClimaticTable {
    /// Build a table from specimen ids and named columns.
    pub fn new(ids: Vec<String>, columns: IndexMap<String, Vec<f64>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(PhyloGeoError::DuplicateSpecimen(id.clone()));
            }
        }
        for (name, values) in &columns {
            if values.len() != ids.len() {
                return Err(PhyloGeoError::InvalidConfig(format!(
                    "column {} has {} values for {} specimens",
                    name,
                    values.len(),
                    ids.len()
                )));
            }
        }
        Ok(Self { ids, columns })
    }

    /// Read comma-separated text with a header row.
    ///
    /// `id_column` names the specimen column; `variables` are the numeric
    /// columns to load. Other columns are ignored.
    pub fn from_reader<R: Read>(reader: R, id_column: &str, variables: &[String]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PhyloGeoError::MissingColumn(name.to_string()))
        };
        let id_idx = position(id_column)?;
        let var_idx = variables
            .iter()
            .map(|v| position(v))
            .collect::<Result<Vec<_>>>()?;

        let mut ids = Vec::new();
        let mut columns: IndexMap<String, Vec<f64>> = variables
            .iter()
            .map(|v| (v.clone(), Vec::new()))
            .collect();

        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            ids.push(record.get(id_idx).unwrap_or_default().to_string());

            for (name, &idx) in variables.iter().zip(&var_idx) {
                let raw = record.get(idx).unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| PhyloGeoError::InvalidValue {
                        row: row + 1,
                        column: name.clone(),
                        value: raw.to_string(),
                    })?;
                columns[name.as_str()].push(value);
            }
        }

        Self::new(ids, columns)
    }

    /// Read a file through `intspan::reader` (`stdin` reads standard input).
    pub fn from_path(infile: &str, id_column: &str, variables: &[String]) -> Result<Self> {
        if infile != "stdin" && !std::path::Path::new(infile).is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("climatic table {} not found", infile),
            )
            .into());
        }
        Self::from_reader(intspan::reader(infile), id_column, variables)
    }

    /// Specimen ids in file order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn variables(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub fn column(&self, variable: &str) -> Option<&[f64]> {
        self.columns.get(variable).map(|v| v.as_slice())
    }

    /// Row index of a specimen.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }
}

/// Round to `digits` decimals the way `format!` prints them: the stored
/// binary value is rounded exactly, exact halves to even.
pub fn round_decimal(value: f64, digits: usize) -> f64 {
    format!("{:.*}", digits, value).parse().unwrap_or(value)
}

/// Scale to 6 decimals, round half to even, scale back.
fn round_half_even6(value: f64) -> f64 {
    (value * 1e6).round_ties_even() / 1e6
}

/// Normalized pairwise distances for one climatic variable.
///
/// Raw distances are `|v[i] - v[j]|` rounded to 6 decimals. They are then
/// rescaled with the single global minimum and maximum of the raw matrix,
/// `(raw - min) / (max - min)`, and rounded to 6 decimals again.
pub fn dissimilarity_matrix(
    table: &ClimaticTable,
    variable: &str,
    policy: DegeneratePolicy,
) -> Result<DissimilarityMatrix> {
    let values = table
        .column(variable)
        .ok_or_else(|| PhyloGeoError::MissingColumn(variable.to_string()))?;

    let raw = DissimilarityMatrix::from_fn(table.ids().to_vec(), |i, j| {
        round_decimal((values[i] - values[j]).abs(), 6)
    });

    let (min, max) = raw.range().unwrap_or((0.0, 0.0));
    let span = max - min;
    if span == 0.0 {
        debug!("{}: all values identical", variable);
        return match policy {
            DegeneratePolicy::Zero => Ok(DissimilarityMatrix::from_fn(
                table.ids().to_vec(),
                |_, _| 0.0,
            )),
            DegeneratePolicy::Error => Err(PhyloGeoError::DegenerateMatrix {
                variable: variable.to_string(),
            }),
        };
    }

    Ok(DissimilarityMatrix::from_fn(
        table.ids().to_vec(),
        |i, j| round_half_even6((raw.get(i, j) - min) / span),
    ))
}

/// One neighbor-joining tree per variable, in the given order.
///
/// Failures are tagged with the climatic stage and the variable.
pub fn climatic_trees(
    table: &ClimaticTable,
    variables: &[String],
    policy: DegeneratePolicy,
) -> Result<IndexMap<String, (DissimilarityMatrix, Tree)>> {
    let mut trees = IndexMap::new();
    for variable in variables {
        let built = dissimilarity_matrix(table, variable, policy)
            .and_then(|matrix| build::nj(&matrix).map(|tree| (matrix, tree)))
            .map_err(|e| e.at(Stage::Climatic, variable.as_str()))?;
        trees.insert(variable.clone(), built);
    }
    info!("Built {} climatic trees", trees.len());
    Ok(trees)
}

//! Keep the (gene, climatic variable) pairs whose trees agree, and write
//! them out.

use crate::libs::climate::{round_decimal, ClimaticTable};
use crate::libs::error::{PhyloGeoError, Result, Stage};
use crate::libs::phylo::{least_squares, Phylogeny};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::io::Write;

/// Header of the result file, spelling included.
pub const HEADER: [&str; 6] = [
    "Gene",
    "Phylogeographic tree",
    "Name of species",
    "Position in ASM",
    "Bootsrap mean",
    "Least-Square distance",
];

/// One qualifying (gene, climatic variable) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Reference gene label; the gene key when no label is set
    pub gene: String,
    pub climatic_variable: String,
    /// First leaf of the genetic tree that is a row of the climatic table
    pub specimen: String,
    /// Gene key of the alignment the tree was built from
    pub position: String,
    pub bootstrap_mean: f64,
    /// Least-squares distance, rounded to 2 decimals
    pub ls: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Minimum mean support, inclusive
    pub bootstrap_threshold: f64,
    /// Maximum least-squares distance, inclusive
    pub ls_threshold: f64,
    pub reference_gene: String,
}

/// Genes whose mean support reaches the threshold, with that mean.
///
/// A tree without supported internal nodes has no mean and is dropped.
pub fn select_genes<'a, T>(
    genetic: &'a IndexMap<String, T>,
    threshold: f64,
) -> Vec<(&'a String, &'a T, f64)>
where
    T: Phylogeny,
{
    let mut selected = Vec::new();
    for (gene, tree) in genetic {
        match tree.mean_confidence() {
            Some(mean) if mean >= threshold => selected.push((gene, tree, mean)),
            Some(mean) => debug!("{}: mean support {:.2} below {}", gene, mean, threshold),
            None => warn!("{}: consensus tree has no supported splits", gene),
        }
    }
    selected
}

/// Compare every retained genetic tree with every climatic tree.
///
/// Results come out gene by gene, and within a gene in the order of
/// `climatic`. Comparison failures are fatal and name the pair.
pub fn aggregate<C, G>(
    climatic: &IndexMap<String, C>,
    genetic: &IndexMap<String, G>,
    table: &ClimaticTable,
    params: &FilterParams,
) -> Result<Vec<ComparisonResult>>
where
    C: Phylogeny,
    G: Phylogeny,
{
    let selected = select_genes(genetic, params.bootstrap_threshold);
    info!(
        "{} of {} genes reach the bootstrap threshold",
        selected.len(),
        genetic.len()
    );

    let mut results = Vec::new();
    for (gene, gen_tree, mean) in selected {
        for (variable, clim_tree) in climatic {
            let key = format!("{}/{}", gene, variable);
            let ls = least_squares(gen_tree, clim_tree).map_err(|e| e.at(Stage::Comparison, &key))?;
            debug!("{}: LS = {}", key, ls);
            if ls > params.ls_threshold {
                continue;
            }

            let specimen = gen_tree
                .leaf_names()
                .into_iter()
                .find(|name| table.position(name).is_some())
                .ok_or_else(|| {
                    PhyloGeoError::NoMatchingRecord {
                        gene: gene.clone(),
                        variable: variable.clone(),
                    }
                    .at(Stage::Comparison, &key)
                })?;

            let label = if params.reference_gene.is_empty() {
                gene.clone()
            } else {
                params.reference_gene.clone()
            };
            results.push(ComparisonResult {
                gene: label,
                climatic_variable: variable.clone(),
                specimen,
                position: gene.clone(),
                bootstrap_mean: mean,
                ls: round_decimal(ls, 2),
            });
        }
    }
    info!("{} pairs qualify", results.len());
    Ok(results)
}

/// Write the header and one line per result.
///
/// Fields after the first are separated by `", "`, the header included.
pub fn write_results<W: Write>(results: &[ComparisonResult], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(spaced(HEADER.iter().map(|s| s.to_string())))?;
    for r in results {
        wtr.write_record(spaced([
            r.gene.clone(),
            r.climatic_variable.clone(),
            r.specimen.clone(),
            r.position.clone(),
            r.bootstrap_mean.to_string(),
            r.ls.to_string(),
        ]))?;
    }
    wtr.flush()?;
    Ok(())
}

fn spaced<I: IntoIterator<Item = String>>(fields: I) -> Vec<String> {
    fields
        .into_iter()
        .enumerate()
        .map(|(i, f)| if i == 0 { f } else { format!(" {}", f) })
        .collect()
}

//! Bootstrap consensus trees, one per gene.
//!
//! Every gene is an independent unit of work: its resamples come from its own
//! seeded RNG, so the outcome does not depend on how genes are scheduled
//! across workers.

use crate::libs::alignment::{Alignment, GeneAlignmentSet};
use crate::libs::error::{PhyloGeoError, Result, Stage};
use crate::libs::phylo::tree::support;
use crate::libs::phylo::{build, Tree};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag asking running workers to stop.
///
/// Workers look at it between two resamples.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a failed gene does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneErrorPolicy {
    /// Log the failure and drop the gene.
    #[default]
    Continue,
    /// Fail the run with the first failed gene.
    Abort,
}

impl std::str::FromStr for GeneErrorPolicy {
    type Err = PhyloGeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continue" => Ok(GeneErrorPolicy::Continue),
            "abort" => Ok(GeneErrorPolicy::Abort),
            other => Err(PhyloGeoError::InvalidConfig(format!(
                "gene error policy must be `continue` or `abort`, got `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Resamples per gene
    pub reps: usize,
    pub seed: u64,
    /// Splits need more than `cutoff * 100` percent support
    pub cutoff: f64,
    /// Per-gene wall clock limit
    pub timeout: Option<Duration>,
    /// Worker count; `None` uses the global rayon pool
    pub threads: Option<usize>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            reps: 100,
            seed: 42,
            cutoff: 0.5,
            timeout: None,
            threads: None,
        }
    }
}

/// RNG seed of one gene.
pub fn gene_seed(seed: u64, gene: &str) -> u64 {
    seed ^ xxhash_rust::xxh3::xxh3_64(gene.as_bytes())
}

/// Resample the columns of one alignment `opts.reps` times, build a
/// neighbor-joining tree from each resample and reduce them to a consensus
/// tree whose internal nodes carry split support in percent.
pub fn bootstrap_gene(
    gene: &str,
    aln: &Alignment,
    opts: &BootstrapOptions,
    cancel: &CancelToken,
) -> Result<Tree> {
    if aln.num_sequences() < 3 {
        return Err(PhyloGeoError::InsufficientSequences {
            gene: gene.to_string(),
            reason: format!("{} sequences, need at least 3", aln.num_sequences()),
        });
    }
    if aln.num_columns() == 0 {
        return Err(PhyloGeoError::InsufficientSequences {
            gene: gene.to_string(),
            reason: "alignment has no columns".to_string(),
        });
    }

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(gene_seed(opts.seed, gene));
    let mut trees = Vec::with_capacity(opts.reps);

    for done in 0..opts.reps {
        if cancel.is_cancelled() {
            return Err(PhyloGeoError::Cancelled {
                gene: gene.to_string(),
                done,
                total: opts.reps,
            });
        }
        if let Some(limit) = opts.timeout {
            if start.elapsed() >= limit {
                return Err(PhyloGeoError::Timeout {
                    gene: gene.to_string(),
                    secs: limit.as_secs(),
                    done,
                    total: opts.reps,
                });
            }
        }

        let columns = aln.resample_columns(&mut rng);
        let matrix = aln.identity_matrix(&columns);
        trees.push(build::nj(&matrix)?);
    }

    let first = trees.first().ok_or_else(|| PhyloGeoError::InsufficientSequences {
        gene: gene.to_string(),
        reason: "no resamples requested".to_string(),
    })?;
    let leaf_map = support::build_leaf_map(first)?;
    let counts = support::count_splits(&trees, &leaf_map)?;
    let tree = support::consensus_tree(&counts, &leaf_map, opts.cutoff)?;

    debug!(
        "{}: {} resamples, {} candidate splits, {:.2?}",
        gene,
        counts.trees,
        counts.splits.len(),
        start.elapsed()
    );
    Ok(tree)
}

/// Run [`bootstrap_gene`] for every gene in parallel.
///
/// Outcomes come back in the input order of `set`, one per gene, whatever
/// the order in which workers finish. Genes that failed to load pass their
/// error through untouched.
pub fn build_consensus_trees(
    set: GeneAlignmentSet,
    opts: &BootstrapOptions,
    cancel: &CancelToken,
) -> Result<Vec<(String, Result<Tree>)>> {
    let entries: Vec<(String, Result<Alignment>)> = set.into_iter().collect();
    info!(
        "Bootstrapping {} genes with {} resamples each",
        entries.len(),
        opts.reps
    );

    let work = move || {
        entries
            .into_par_iter()
            .map(|(gene, loaded)| {
                let outcome = loaded.and_then(|aln| bootstrap_gene(&gene, &aln, opts, cancel));
                (gene, outcome)
            })
            .collect::<Vec<_>>()
    };

    let outcomes = match opts.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| PhyloGeoError::InvalidConfig(e.to_string()))?;
            pool.install(work)
        }
        None => work(),
    };
    Ok(outcomes)
}

/// Merge per-gene outcomes into one mapping.
///
/// `Continue` logs and skips failed genes. `Abort` returns the first failure
/// in input order, tagged with the bootstrap stage and the gene.
pub fn merge_outcomes(
    outcomes: Vec<(String, Result<Tree>)>,
    policy: GeneErrorPolicy,
) -> Result<IndexMap<String, Tree>> {
    let mut trees = IndexMap::new();
    for (gene, outcome) in outcomes {
        match outcome {
            Ok(tree) => {
                trees.insert(gene, tree);
            }
            Err(e) => match policy {
                GeneErrorPolicy::Continue => warn!("Skipping gene {}: {}", gene, e),
                GeneErrorPolicy::Abort => return Err(e.at(Stage::Bootstrap, gene)),
            },
        }
    }
    Ok(trees)
}

//! Run parameters, loaded from a TOML file.

use crate::libs::bootstrap::{BootstrapOptions, GeneErrorPolicy};
use crate::libs::climate::DegeneratePolicy;
use crate::libs::error::{PhyloGeoError, Result};
use crate::libs::filter::FilterParams;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    // Inputs
    /// Climatic table
    pub file_name: String,
    /// Specimen id column, then the climatic variables
    pub names: Vec<String>,
    /// Aligned FASTA files, one gene each
    pub alignments: Vec<String>,
    pub output: String,

    // Bootstrap
    #[serde(alias = "bootstrapAmount")]
    pub bootstrap_amount: usize,
    pub seed: u64,
    pub consensus_cutoff: f64,
    pub threads: Option<usize>,
    /// Seconds per gene
    pub gene_timeout: Option<u64>,
    pub on_gene_error: GeneErrorPolicy,

    // Filters
    pub bootstrap_threshold: f64,
    pub ls_threshold: f64,
    pub reference_gene_filename: String,
    pub degenerate: DegeneratePolicy,

    // Debug
    #[serde(alias = "makeDebugFiles")]
    pub make_debug_files: bool,
    pub debug_dir: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            file_name: "geo.csv".to_string(),
            names: vec![
                "id".to_string(),
                "ALLSKY_SFC_SW_DWN".to_string(),
                "T2M".to_string(),
            ],
            alignments: vec![],
            output: "output.csv".to_string(),
            bootstrap_amount: 100,
            seed: 42,
            consensus_cutoff: 0.5,
            threads: None,
            gene_timeout: None,
            on_gene_error: GeneErrorPolicy::Continue,
            bootstrap_threshold: 10.0,
            ls_threshold: 60.0,
            reference_gene_filename: String::new(),
            degenerate: DegeneratePolicy::Zero,
            make_debug_files: false,
            debug_dir: "debug".to_string(),
        }
    }
}

impl Params {
    /// Load parameters from a TOML file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PhyloGeoError::InvalidConfig(msg));

        if self.names.len() < 2 {
            return fail("`names` needs the id column and at least one variable".to_string());
        }
        if self.bootstrap_amount < 1 {
            return fail("`bootstrap_amount` must be at least 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.bootstrap_threshold) {
            return fail(format!(
                "`bootstrap_threshold` must be in [0, 100], got {}",
                self.bootstrap_threshold
            ));
        }
        if self.ls_threshold.is_nan() || self.ls_threshold < 0.0 {
            return fail(format!(
                "`ls_threshold` must not be negative, got {}",
                self.ls_threshold
            ));
        }
        if !(0.0..1.0).contains(&self.consensus_cutoff) {
            return fail(format!(
                "`consensus_cutoff` must be in [0, 1), got {}",
                self.consensus_cutoff
            ));
        }
        if self.threads == Some(0) {
            return fail("`threads` must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn id_column(&self) -> &str {
        self.names.first().map(|s| s.as_str()).unwrap_or_default()
    }

    pub fn variables(&self) -> &[String] {
        self.names.get(1..).unwrap_or_default()
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            reps: self.bootstrap_amount,
            seed: self.seed,
            cutoff: self.consensus_cutoff,
            timeout: self.gene_timeout.map(Duration::from_secs),
            threads: self.threads,
        }
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            bootstrap_threshold: self.bootstrap_threshold,
            ls_threshold: self.ls_threshold,
            reference_gene: self.reference_gene_filename.clone(),
        }
    }

    /// A sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# phylogeo.toml
# Command line options override these settings

# =============================================================================
# INPUTS
# =============================================================================

# Climatic table, comma-separated, with a header row
file_name = "geo.csv"

# Specimen id column, then the climatic variables to compare
names = ["id", "ALLSKY_SFC_SW_DWN", "T2M"]

# Aligned FASTA files, one per gene; the file stem is the gene key
alignments = ["1_35.fasta", "36_70.fasta"]

# Result file
output = "output.csv"

# =============================================================================
# BOOTSTRAP
# =============================================================================

# Resamples per gene (bootstrapAmount is accepted too)
bootstrap_amount = 100

# Seed of the per-gene random number generators
seed = 42

# Splits need strictly more than this fraction of resamples (0.5 = majority)
consensus_cutoff = 0.5

# Worker threads (omit to use all CPUs)
# threads = 4

# Seconds allowed per gene (omit for no limit)
# gene_timeout = 600

# What a failed gene does to the run: continue, abort
on_gene_error = "continue"

# =============================================================================
# FILTERS
# =============================================================================

# Minimum mean bootstrap support of a gene, in percent
bootstrap_threshold = 10

# Maximum least-squares distance between a genetic and a climatic tree
ls_threshold = 60

# Label written in the Gene column (empty: the gene key)
reference_gene_filename = "seq very small.fasta"

# Climatic variable with identical values everywhere: zero, error
degenerate = "zero"

# =============================================================================
# DEBUG
# =============================================================================

# Write matrices and trees of every stage (makeDebugFiles is accepted too)
make_debug_files = false
debug_dir = "debug"
"#
        .to_string()
    }
}

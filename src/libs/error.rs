//! Error taxonomy shared by every pipeline stage.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PhyloGeoError>;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Climatic,
    Bootstrap,
    Comparison,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Climatic => "climatic",
            Stage::Bootstrap => "bootstrap",
            Stage::Comparison => "comparison",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum PhyloGeoError {
    /// Every value of a climatic variable is identical, so the range is zero.
    #[error("Climatic variable {variable} has zero variance across specimens")]
    DegenerateMatrix { variable: String },

    /// Tree construction needs at least three taxa.
    #[error("Neighbor joining needs at least 3 taxa, got {count}")]
    InsufficientTaxa { count: usize },

    /// A gene alignment is too small to bootstrap.
    #[error("Gene {gene}: {reason}")]
    InsufficientSequences { gene: String, reason: String },

    /// Two trees do not share an identical leaf set.
    #[error(
        "Trees have different leaf sets. In tree 1 only: {only_left:?}; in tree 2 only: {only_right:?}; duplicated: {duplicated:?}"
    )]
    IncompatibleLeafSet {
        only_left: Vec<String>,
        only_right: Vec<String>,
        duplicated: Vec<String>,
    },

    /// None of the leaves of a genetic tree is a row of the climatic table.
    #[error("No climatic record matches any leaf of gene {gene} (compared with {variable})")]
    NoMatchingRecord { gene: String, variable: String },

    #[error("Column {0} not found in the climatic table")]
    MissingColumn(String),

    #[error("Row {row}, column {column}: cannot parse {value:?} as a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Specimen {0} appears more than once")]
    DuplicateSpecimen(String),

    #[error("Alignment {gene}: {reason}")]
    InvalidAlignment { gene: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Gene {gene}: cancelled after {done} of {total} resamples")]
    Cancelled {
        gene: String,
        done: usize,
        total: usize,
    },

    #[error("Gene {gene}: timed out after {secs}s ({done} of {total} resamples)")]
    Timeout {
        gene: String,
        secs: u64,
        done: usize,
        total: usize,
    },

    /// Tree arena inconsistency.
    #[error("Tree logic error: {0}")]
    Tree(String),

    /// Wraps a failure with the stage and the gene or variable being processed.
    #[error("{stage} stage failed for {key}: {source}")]
    Stage {
        stage: Stage,
        key: String,
        #[source]
        source: Box<PhyloGeoError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl PhyloGeoError {
    /// Attach the stage and key that produced this error.
    pub fn at(self, stage: Stage, key: impl Into<String>) -> Self {
        PhyloGeoError::Stage {
            stage,
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping `Stage` wrappers.
    pub fn root_cause(&self) -> &PhyloGeoError {
        match self {
            PhyloGeoError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<String> for PhyloGeoError {
    fn from(msg: String) -> Self {
        PhyloGeoError::Tree(msg)
    }
}

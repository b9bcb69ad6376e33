//! Aligned sequences, one alignment per gene.
//!
//! Alignments are produced upstream by an external aligner; this module only
//! holds the rows and derives distances from them.

use crate::libs::error::{PhyloGeoError, Result, Stage};
use crate::libs::phylo::DissimilarityMatrix;
use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

/// Gene key -> alignment, in load order.
///
/// A gene whose file could not be read keeps its error, so the failure is
/// handled with that gene alone.
pub type GeneAlignmentSet = IndexMap<String, Result<Alignment>>;

/// A multiple sequence alignment: equally long rows keyed by specimen id.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    ids: Vec<String>,
    rows: Vec<Vec<u8>>,
}

impl Alignment {
    /// Build an alignment, checking row lengths and id uniqueness.
    ///
    /// `gene` is only used in error messages.
    pub fn new(gene: &str, entries: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(entries.len());
        let mut rows: Vec<Vec<u8>> = Vec::with_capacity(entries.len());

        for (id, row) in entries {
            if !seen.insert(id.clone()) {
                return Err(PhyloGeoError::InvalidAlignment {
                    gene: gene.to_string(),
                    reason: format!("sequence {} appears more than once", id),
                });
            }
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(PhyloGeoError::InvalidAlignment {
                        gene: gene.to_string(),
                        reason: format!(
                            "sequence {} has {} columns, expected {}",
                            id,
                            row.len(),
                            first.len()
                        ),
                    });
                }
            }
            ids.push(id);
            rows.push(row);
        }

        Ok(Self { ids, rows })
    }

    /// Read an aligned FASTA file. `stdin` reads standard input.
    pub fn from_fasta(gene: &str, infile: &str) -> Result<Self> {
        if infile != "stdin" && !Path::new(infile).is_file() {
            return Err(PhyloGeoError::InvalidAlignment {
                gene: gene.to_string(),
                reason: format!("{} is not a file", infile),
            });
        }
        let reader = intspan::reader(infile);
        let mut fa_in = noodles_fasta::io::Reader::new(reader);

        let mut entries = Vec::new();
        for result in fa_in.records() {
            let record = result?;
            let name: Vec<u8> = record.name().into();
            let name = String::from_utf8_lossy(&name).into_owned();
            let seq = record.sequence().get(..).unwrap_or_default().to_vec();
            entries.push((name, seq));
        }

        Self::new(gene, entries)
    }

    /// Sequence ids, in row order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn num_sequences(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Column indices drawn uniformly with replacement, as many as the
    /// alignment is wide.
    pub fn resample_columns<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let len = self.num_columns();
        (0..len).map(|_| rng.gen_range(0..len)).collect()
    }

    /// Identity distances over the given columns.
    ///
    /// `1 - matches / columns`, comparing bytes case-insensitively; a gap
    /// facing a gap is a match.
    pub fn identity_matrix(&self, columns: &[usize]) -> DissimilarityMatrix {
        DissimilarityMatrix::from_fn(self.ids.clone(), |i, j| {
            identity_distance(&self.rows[i], &self.rows[j], columns)
        })
    }

    /// Identity distances over every column.
    pub fn full_identity_matrix(&self) -> DissimilarityMatrix {
        let columns: Vec<usize> = (0..self.num_columns()).collect();
        self.identity_matrix(&columns)
    }
}

fn identity_distance(a: &[u8], b: &[u8], columns: &[usize]) -> f64 {
    if columns.is_empty() {
        return 1.0;
    }
    let matches = columns
        .iter()
        .filter(|&&c| a[c].eq_ignore_ascii_case(&b[c]))
        .count();
    1.0 - matches as f64 / columns.len() as f64
}

/// Load one alignment per file; the gene key is the file stem.
///
/// Only a gene key taken twice fails the whole set. Unreadable or malformed
/// files are kept as per-gene errors.
pub fn load_alignments<S: AsRef<str>>(infiles: &[S]) -> Result<GeneAlignmentSet> {
    let mut set = GeneAlignmentSet::new();
    for infile in infiles {
        let infile = infile.as_ref();
        let gene = Path::new(infile)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| infile.to_string());
        if set.contains_key(&gene) {
            let key = gene.clone();
            return Err(PhyloGeoError::InvalidAlignment {
                gene,
                reason: format!("gene key of {} is already taken", infile),
            }
            .at(Stage::Bootstrap, key));
        }
        let alignment = Alignment::from_fasta(&gene, infile);
        set.insert(gene, alignment);
    }
    Ok(set)
}

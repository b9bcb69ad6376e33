pub mod build;
pub mod cmp;
pub mod matrix;
pub mod node;
pub mod tree;

pub use cmp::{least_squares, Phylogeny};
pub use matrix::DissimilarityMatrix;
pub use node::{Node, NodeId};
pub use tree::Tree;

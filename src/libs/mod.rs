pub mod alignment;
pub mod bootstrap;
pub mod climate;
pub mod config;
pub mod error;
pub mod filter;
pub mod phylo;

pub use error::{PhyloGeoError, Result};

#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Gap-filling of draft genome assemblies with linked-read data.
//!
//! Every gap of a GFA 2.0 assembly graph is attempted independently: the linked reads whose
//! barcodes occur around both flanks are assembled locally between two anchor _k_-mers, for a
//! grid of _k_-mer sizes and abundance thresholds tried from the most to the least conservative.
//! Each candidate filling sequence is graded with letters (`A` best, `D` worst) against either a
//! reference sequence or the flanking contigs, and the first acceptable combination wins.
//! Accepted sequences are merged back into the graph as new segments linked to their flanks.
//!
pub mod alignment;
pub mod assembler;
pub mod config;
pub mod error;
pub mod extract;
pub mod genomic;
pub mod gfa;
pub mod grid;
pub mod orchestrator;
pub mod quality;
pub mod report;
pub mod search;

#[cfg(test)]
pub(crate) mod test_utils;

/// Default _k_-mer sizes, tried from the highest
pub const DEFAULT_KMERS: [usize; 4] = [51, 41, 31, 21];
/// Default solid _k_-mer abundance thresholds, tried from the highest
pub const DEFAULT_ABUNDANCES: [u32; 2] = [3, 2];
/// Default maximum length of a filled sequence
pub const DEFAULT_MAX_LENGTH: usize = 10_000;
/// Extra length granted over the gap distance when the gap is longer than the default maximum
pub const MAX_LENGTH_MARGIN: usize = 1_000;
/// Version written when the input graph carries no header
pub const GFA_HEADER: &str = "H\tVN:Z:2.0";

/// Result with fatal run errors
pub type Result<T> = std::result::Result<T, crate::error::Error>;

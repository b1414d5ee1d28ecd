use crate::grid::ParameterGrid;
use crate::quality::GradeThresholds;
use std::path::PathBuf;

/// How candidates are graded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Against the reference sequence of each gap, found in this directory
    Reference(PathBuf),
    /// Against the flanking contigs
    Contigs,
}

/// Where the reads of each gap come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadsInput {
    /// One file of already extracted reads used for every gap
    Union(PathBuf),
    /// Barcodes counted in a BAM, reads taken from a barcoded FASTQ
    Barcoded {
        /// Indexed BAM of the linked reads mapped on the assembly
        bam: PathBuf,
        /// FASTQ with `BX:Z:` barcodes in the descriptions
        reads: PathBuf,
        /// Window on each flank where barcodes are counted
        chunk: u64,
        /// Minimal occurrences of a barcode
        min_freq: usize,
    },
}

/// Parameters of the per-gap search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// _k_-mer sizes
    pub kmers: Vec<usize>,
    /// Solid _k_-mer abundance thresholds
    pub abundances: Vec<u32>,
    /// Fixed extension size, `None` to extend by `k`
    pub extension: Option<usize>,
    /// Try every combination even after an acceptance
    pub force: bool,
    /// Node limit of the solver
    pub max_nodes: usize,
    /// Length limit of the solver
    pub max_length: usize,
    /// Grade calibration
    pub thresholds: GradeThresholds,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            kmers: crate::DEFAULT_KMERS.to_vec(),
            abundances: crate::DEFAULT_ABUNDANCES.to_vec(),
            extension: None,
            force: false,
            max_nodes: 1000,
            max_length: crate::DEFAULT_MAX_LENGTH,
            thresholds: GradeThresholds::default(),
        }
    }
}

impl SearchSettings {
    /// Grid of the configured combinations
    pub fn grid(&self) -> ParameterGrid {
        ParameterGrid::new(&self.kmers, &self.abundances, self.extension, self.force)
    }
}

/// Settings of the external solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSettings {
    /// Solver executable
    pub program: PathBuf,
    /// Cores used by one invocation
    pub threads: usize,
    /// Memory limit of graph construction in MB, 0 for none
    pub max_memory: usize,
    /// Verbosity passed to the solver
    pub verbosity: u8,
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Input graph
    pub gfa: PathBuf,
    /// Output directory
    pub out_dir: PathBuf,
    /// Grading mode
    pub mode: EvaluationMode,
    /// Reads of the gaps
    pub reads: ReadsInput,
    /// Line of the input graph from which gaps are processed
    pub start_line: Option<usize>,
    /// Gaps processed in parallel
    pub workers: usize,
    /// Search parameters
    pub search: SearchSettings,
    /// Solver parameters
    pub solver: SolverSettings,
}

impl Config {
    /// Chunk size, when reads are extracted per gap
    pub fn chunk(&self) -> Option<u64> {
        match self.reads {
            ReadsInput::Barcoded { chunk, .. } => Some(chunk),
            ReadsInput::Union(_) => None,
        }
    }
}

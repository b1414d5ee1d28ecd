use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors that stop a run before or outside of per-gap work. Mostly I/O issues, incorrect
/// file formats or an invalid combination of options.
pub enum Error {
    #[error("Could not read or write file")]
    /// Any I/O error on the graph, sequence or output files
    IoError(#[from] std::io::Error),
    #[error("Could not convert bytes as they are invalid UTF-8")]
    /// Data is not in UTF-8 format
    NotUTF8(#[from] std::string::FromUtf8Error),
    #[error("Could not read the BAM file")]
    /// Bam Reading Error
    BamError(#[from] rust_htslib::errors::Error),
    #[error("Could not open compressed file")]
    /// Compressed (or plain) reader could not be created
    NifflerError(#[from] niffler::Error),
    #[error("Could not spawn threads")]
    /// Create thread pools error
    ThreadError,
    #[error("Malformed GFA line {0}: {1}")]
    /// A line of the input graph could not be interpreted
    MalformedLine(usize, String),
    #[error("Segment `{0}` is referenced but never defined")]
    /// Gap or edge refers to a missing segment
    UnknownSegment(String),
    #[error("No sequence available for segment `{0}`")]
    /// Segment has neither an inline sequence nor a `UR` file containing it
    MissingSequence(String),
    #[error("Exactly one of reference mode (--ref-dir) or contig mode (--flanks) must be selected")]
    /// Neither or both of the evaluation modes were selected
    ModeSelection,
    #[error("FileNotFound: {0}")]
    /// A required input file or directory does not exist
    FileNotFound(PathBuf),
    #[error("Invalid parameter: {0}")]
    /// A parameter value is out of its allowed range
    InvalidParameter(String),
    #[error("Could not load the reads: {0}")]
    /// The pre-extracted reads file could not be read
    Extraction(#[from] ExtractionFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Reasons a single local assembly attempt produced nothing. Never fatal to the run.
pub enum SolverFailure {
    #[error("no path found between the anchors")]
    /// The graph was built but the target anchor was not reached
    NoPath,
    #[error("maximum number of nodes exceeded")]
    /// Graph exploration stopped at the node limit
    NodeLimitExceeded,
    #[error("maximum path length exceeded")]
    /// Every path grew past the length limit
    LengthLimitExceeded,
    #[error("solver error: {0}")]
    /// Graph construction or solver process error
    Internal(String),
}

#[derive(Debug, Error)]
/// Problem obtaining the linked reads of one gap. The gap is reported as unresolved.
pub enum ExtractionFailure {
    #[error("Could not read alignments for region {0}: {1}")]
    /// Region fetch or record read failed in the BAM
    Region(String, rust_htslib::errors::Error),
    #[error("Could not read or write reads: {0}")]
    /// Reads file could not be read or the union file could not be written
    Reads(#[from] std::io::Error),
    #[error("Could not open reads file: {0}")]
    /// Compressed reads file could not be opened
    Open(#[from] niffler::Error),
    #[error("Segment `{0}` is not present in the BAM header")]
    /// Flanking segment is unknown to the alignment file
    UnknownTarget(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Alignment utility could not produce a statistic. The graded dimension drops to `D`.
pub enum AlignmentFailure {
    #[error("cannot align an empty sequence")]
    /// One of the inputs has no bases
    EmptySequence,
    #[error("aligner error: {0}")]
    /// External or internal aligner error
    Aligner(String),
}

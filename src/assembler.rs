//! Local assembly of a gap between two anchor _k_-mers.
//!
//! The de Bruijn graph solver is a black box behind [`LocalAssembler`]; [`MindTheGap`] runs the
//! `MindTheGap fill` program in breakpoint mode inside a scoped temporary directory.
use crate::error::SolverFailure;
use crate::genomic::{revcomp, Orientation};
use crate::gfa::Gap;
use crate::grid::ParameterCombination;
use crate::{DEFAULT_MAX_LENGTH, MAX_LENGTH_MARGIN};
use bio::io::fasta;
use log::debug;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

/// One filling sequence returned by the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSequence {
    /// Bases between the anchors, in the frame of `orientation`
    pub seq: Vec<u8>,
    /// Direction the gap was filled in
    pub orientation: Orientation,
    /// Combination that produced the sequence
    pub combination: ParameterCombination,
    /// 1-based rank among the solutions of the invocation
    pub solution: usize,
}

impl CandidateSequence {
    /// Number of bases
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// True for a zero length fill
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Input of one solver invocation
#[derive(Debug, Clone)]
pub struct SolverRequest<'a> {
    /// Label of the gap being filled
    pub gap_label: &'a str,
    /// Direction of the fill
    pub orientation: Orientation,
    /// Assembly parameters
    pub combination: ParameterCombination,
    /// Source _k_-mer
    pub source: &'a [u8],
    /// Target _k_-mer
    pub target: &'a [u8],
    /// Reads to assemble
    pub reads: &'a Path,
    /// Maximum number of nodes explored in the graph
    pub max_nodes: usize,
    /// Maximum length of a path between the anchors
    pub max_length: usize,
}

impl<'a> SolverRequest<'a> {
    /// Name that is unique per gap, orientation and combination
    pub fn artifact_name(&self) -> String {
        format!(
            "{}.{}.{}",
            sanitize(self.gap_label),
            self.orientation.tag(),
            self.combination
        )
    }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '+' => 'p',
            '-' => 'm',
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect()
}

/// De Bruijn graph local assembler: every path sequence found strictly between the anchors.
pub trait LocalAssembler: Send + Sync {
    /// Runs one assembly
    fn assemble(&self, request: &SolverRequest<'_>) -> Result<Vec<Vec<u8>>, SolverFailure>;
}

/// Anchors a gap for the solver and wraps its output as candidates
#[derive(Debug)]
pub struct CandidateAssembler<'a, A> {
    solver: &'a A,
    max_nodes: usize,
    max_length: usize,
}

impl<'a, A: LocalAssembler> CandidateAssembler<'a, A> {
    /// Assembler bounded by `max_nodes` and `max_length`
    pub fn new(solver: &'a A, max_nodes: usize, max_length: usize) -> Self {
        Self {
            solver,
            max_nodes,
            max_length,
        }
    }

    /// Length bound for `gap`. A default bound is raised for gaps known to be longer.
    pub fn max_length_for(&self, gap: &Gap) -> usize {
        match gap.distance {
            Some(distance)
                if self.max_length == DEFAULT_MAX_LENGTH
                    && distance as usize >= DEFAULT_MAX_LENGTH =>
            {
                distance as usize + MAX_LENGTH_MARGIN
            }
            _ => self.max_length,
        }
    }

    /// Source and target _k_-mers, `extension` bases away from the gap on each flank
    pub fn anchors(
        gap: &Gap,
        orientation: Orientation,
        combination: &ParameterCombination,
    ) -> Result<(Vec<u8>, Vec<u8>), SolverFailure> {
        let (k, ext) = (combination.k, combination.extension);
        let (left, right) = (&gap.left_flank, &gap.right_flank);
        if left.len() < ext + k || right.len() < ext + k {
            return Err(SolverFailure::Internal(format!(
                "flanks of {} are shorter than extension {} + k {}",
                gap.label(),
                ext,
                k
            )));
        }
        let left_kmer = &left[left.len() - ext - k..left.len() - ext];
        let right_kmer = &right[ext..ext + k];
        Ok(match orientation {
            Orientation::Forward => (left_kmer.to_vec(), right_kmer.to_vec()),
            Orientation::Reverse => (revcomp(right_kmer), revcomp(left_kmer)),
        })
    }

    /// Candidates for one gap, orientation and combination, in solver order
    pub fn candidates(
        &self,
        gap: &Gap,
        reads: &Path,
        orientation: Orientation,
        combination: &ParameterCombination,
    ) -> Result<Vec<CandidateSequence>, SolverFailure> {
        let (source, target) = Self::anchors(gap, orientation, combination)?;
        let label = gap.label();
        let request = SolverRequest {
            gap_label: &label,
            orientation,
            combination: *combination,
            source: &source,
            target: &target,
            reads,
            max_nodes: self.max_nodes,
            max_length: self.max_length_for(gap),
        };
        let paths = self.solver.assemble(&request)?;
        if paths.is_empty() {
            return Err(SolverFailure::NoPath);
        }
        debug!(
            "{} solution(s) for {} {} {}",
            paths.len(),
            label,
            orientation,
            combination
        );
        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(i, seq)| CandidateSequence {
                seq,
                orientation,
                combination: *combination,
                solution: i + 1,
            })
            .collect())
    }
}

/// `MindTheGap fill` in breakpoint mode
#[derive(Debug, Clone)]
pub struct MindTheGap {
    program: PathBuf,
    threads: usize,
    max_memory: usize,
    verbosity: u8,
    work_dir: Option<PathBuf>,
}

impl MindTheGap {
    /// Runs `program` with graph building limited to `threads` cores and `max_memory` MB
    /// (0 for no limit)
    pub fn new<P: Into<PathBuf>>(program: P, threads: usize, max_memory: usize) -> Self {
        Self {
            program: program.into(),
            threads,
            max_memory,
            verbosity: 0,
            work_dir: None,
        }
    }

    /// Verbosity passed to the solver
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Creates the temporary directories under `dir` instead of the system default
    pub fn with_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    fn write_breakpoint(
        path: &Path,
        name: &str,
        request: &SolverRequest<'_>,
    ) -> std::io::Result<()> {
        let mut writer = fasta::Writer::to_file(path)?;
        let id = format!("bkpt1_{}", name);
        let k = request.combination.k;
        let left_desc = format!("left_kmer_len.{}", k);
        let right_desc = format!("right_kmer_len.{}", k);
        writer.write(&id, Some(left_desc.as_str()), request.source)?;
        writer.write(&id, Some(right_desc.as_str()), request.target)?;
        writer.flush()
    }
}

impl LocalAssembler for MindTheGap {
    fn assemble(&self, request: &SolverRequest<'_>) -> Result<Vec<Vec<u8>>, SolverFailure> {
        let name = request.artifact_name();
        let mut builder = tempfile::Builder::new();
        builder.prefix(&name);
        let dir = match self.work_dir {
            Some(ref work_dir) => builder.tempdir_in(work_dir),
            None => builder.tempdir(),
        }
        .map_err(|e| SolverFailure::Internal(format!("could not create work directory: {}", e)))?;

        let bkpt = dir.path().join(format!("{}.bkpt.fasta", name));
        Self::write_breakpoint(&bkpt, &name, request)
            .map_err(|e| SolverFailure::Internal(format!("could not write anchors: {}", e)))?;
        let prefix = dir.path().join(&name);

        debug!("Running {} fill for {}", self.program.display(), name);
        let output = Command::new(&self.program)
            .arg("fill")
            .arg("-in")
            .arg(request.reads)
            .arg("-bkpt")
            .arg(&bkpt)
            .arg("-kmer-size")
            .arg(request.combination.k.to_string())
            .arg("-abundance-min")
            .arg(request.combination.abundance.to_string())
            .arg("-max-nodes")
            .arg(request.max_nodes.to_string())
            .arg("-max-length")
            .arg(request.max_length.to_string())
            .arg("-nb-cores")
            .arg(self.threads.to_string())
            .arg("-max-memory")
            .arg(self.max_memory.to_string())
            .arg("-verbose")
            .arg(self.verbosity.to_string())
            .arg("-out")
            .arg(&prefix)
            .output()
            .map_err(|e| SolverFailure::Internal(format!("could not run solver: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr).unwrap_or_else(|| {
                SolverFailure::Internal(format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    stderr.lines().last().unwrap_or("")
                ))
            }));
        }

        let insertions = PathBuf::from(format!("{}.insertions.fasta", prefix.display()));
        if !insertions.exists() {
            return Err(SolverFailure::NoPath);
        }
        let rdr = fasta::Reader::from_file(&insertions)
            .map_err(|e| SolverFailure::Internal(format!("could not read insertions: {}", e)))?;
        let paths = rdr
            .records()
            .map(|record| record.map(|record| record.seq().to_vec()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| SolverFailure::Internal(format!("invalid insertions: {}", e)))?;

        if paths.is_empty() {
            return Err(SolverFailure::NoPath);
        }
        let found = paths.len();
        let paths = paths
            .into_iter()
            .filter(|path| path.len() <= request.max_length)
            .collect::<Vec<_>>();
        if paths.len() < found {
            debug!(
                "{} of {} paths for {} exceed {} bp",
                found - paths.len(),
                found,
                name,
                request.max_length
            );
        }
        if paths.is_empty() {
            Err(SolverFailure::LengthLimitExceeded)
        } else {
            Ok(paths)
        }
    }
}

/// Limit reported in the log of a failed run, if any
fn classify_failure(log: &str) -> Option<SolverFailure> {
    let log = log.to_ascii_lowercase();
    let limit = |what: &str| {
        log.lines().any(|line| {
            line.contains(what)
                && (line.contains("limit") || line.contains("exceed") || line.contains("max"))
        })
    };
    if limit("node") {
        Some(SolverFailure::NodeLimitExceeded)
    } else if limit("length") {
        Some(SolverFailure::LengthLimitExceeded)
    } else {
        None
    }
}

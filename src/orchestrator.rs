//! Fans the gaps of a graph out to a pool of workers and merges their results back, one gap at a
//! time, on the calling thread.
use crate::alignment::Aligner;
use crate::assembler::{CandidateAssembler, LocalAssembler};
use crate::config::{EvaluationMode, SearchSettings};
use crate::error::Error;
use crate::extract::ReadSource;
use crate::genomic::read_first_fasta;
use crate::gfa::{Anchor, AssemblyGraph, Gap};
use crate::grid::ParameterGrid;
use crate::quality::{GradeThresholds, QualityScorer, ReferenceMaterial};
use crate::search::{GapResult, GapSearchController};
use crate::Result;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Outcome of one gap, as reported in the summaries
#[derive(Debug, Clone)]
pub struct GapReport {
    /// Position of the gap among the gap lines
    pub index: usize,
    /// Gap label
    pub label: String,
    /// Left anchor
    pub left: Anchor,
    /// Right anchor
    pub right: Anchor,
    /// Estimated gap size, if known
    pub distance: Option<u64>,
    /// Final result
    pub result: GapResult,
    /// Combinations tried
    pub trials: usize,
    /// Barcodes of the extracted union, if reads were extracted
    pub barcodes: Option<usize>,
    /// Reads available to the solver, `None` when extraction failed
    pub reads: Option<usize>,
}

/// Runs the gap searches of a graph in parallel
#[derive(Debug)]
pub struct GapOrchestrator<'a, A, L, R> {
    solver: &'a A,
    aligner: &'a L,
    source: &'a R,
    grid: ParameterGrid,
    thresholds: GradeThresholds,
    mode: EvaluationMode,
    max_nodes: usize,
    max_length: usize,
    workers: usize,
}

impl<'a, A, L, R> GapOrchestrator<'a, A, L, R>
where
    A: LocalAssembler,
    L: Aligner,
    R: ReadSource,
{
    /// Orchestrator running `workers` gaps at once
    pub fn new(
        settings: &SearchSettings,
        mode: EvaluationMode,
        workers: usize,
        solver: &'a A,
        aligner: &'a L,
        source: &'a R,
    ) -> Self {
        Self {
            solver,
            aligner,
            source,
            grid: settings.grid(),
            thresholds: settings.thresholds,
            mode,
            max_nodes: settings.max_nodes,
            max_length: settings.max_length,
            workers: workers.max(1),
        }
    }

    /// Searches every gap from index `first` on and merges the results into `graph` in gap order.
    /// Gaps before `first` are left untouched.
    pub fn run(&self, graph: &mut AssemblyGraph, first: usize) -> Result<Vec<GapReport>> {
        let gaps = graph.gaps()?;
        let first = if first > gaps.len() {
            warn!(
                "Start index {} is past the last of {} gaps, nothing to do",
                first,
                gaps.len()
            );
            gaps.len()
        } else {
            first
        };
        info!(
            "Gap-filling of {} gaps with {} workers",
            gaps.len() - first,
            self.workers
        );
        if self.grid.is_forced() {
            info!(
                "Forced search, all {} combinations are tried for every gap",
                self.grid.len()
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|_| Error::ThreadError)?;
        let reports: Vec<GapReport> =
            pool.install(|| gaps[first..].par_iter().map(|gap| self.process(gap)).collect());

        for report in &reports {
            graph.merge(report.index, &report.label, &report.result);
        }
        Ok(reports)
    }

    /// Extracts the reads of `gap` and searches it. Any failure leaves the gap unresolved.
    pub fn process(&self, gap: &Gap) -> GapReport {
        let label = gap.label();
        let mut report = GapReport {
            index: gap.index,
            label: label.clone(),
            left: gap.left.clone(),
            right: gap.right.clone(),
            distance: gap.distance,
            result: GapResult::Unresolved,
            trials: 0,
            barcodes: None,
            reads: None,
        };

        let reads = match self.source.reads(gap) {
            Ok(reads) => reads,
            Err(e) => {
                warn!("No reads for gap {}: {}", label, e);
                return report;
            }
        };
        report.barcodes = reads.barcodes();
        report.reads = Some(reads.reads());

        let reference = self.reference_sequence(&label);
        let material = match reference {
            Some(ref seq) => ReferenceMaterial::Reference(seq),
            None => ReferenceMaterial::Flanks {
                left: &gap.left_flank,
                right: &gap.right_flank,
            },
        };

        let controller = GapSearchController::new(
            &self.grid,
            CandidateAssembler::new(self.solver, self.max_nodes, self.max_length),
            QualityScorer::new(self.aligner, &self.thresholds),
        );
        let (result, trials) = controller.run(gap, reads.path(), &material);
        if result == GapResult::Unresolved {
            info!(
                "Gap {} left open after {} combinations",
                label,
                trials.len()
            );
        }
        report.trials = trials.len();
        report.result = result;
        report
    }

    fn reference_sequence(&self, label: &str) -> Option<Vec<u8>> {
        let dir = match self.mode {
            EvaluationMode::Reference(ref dir) => dir,
            EvaluationMode::Contigs => return None,
        };
        let path = match reference_file(dir, label) {
            Some(path) => path,
            None => {
                warn!(
                    "No reference sequence for gap {} in {}, grading against the flanks",
                    label,
                    dir.display()
                );
                return None;
            }
        };
        match read_first_fasta(&path) {
            Ok(Some(seq)) => {
                debug!("Reference of {}: {}", label, path.display());
                Some(seq)
            }
            Ok(None) => {
                warn!(
                    "Reference file {} is empty, grading {} against the flanks",
                    path.display(),
                    label
                );
                None
            }
            Err(e) => {
                warn!(
                    "Could not read {} ({}), grading {} against the flanks",
                    path.display(),
                    e,
                    label
                );
                None
            }
        }
    }
}

/// First file of `dir`, in name order, whose name contains `label`
pub fn reference_file(dir: &Path, label: &str) -> Option<PathBuf> {
    let mut matching = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .map_or(false, |name| name.to_string_lossy().contains(label))
        })
        .collect::<Vec<_>>();
    matching.sort();
    matching.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::PairwiseAligner;
    use crate::genomic::Orientation;
    use crate::test_utils::{graph_text, NoReads, ScriptedSolver, Truth};
    use std::io::Cursor;

    fn settings(kmers: &[usize], abundances: &[u32]) -> SearchSettings {
        SearchSettings {
            kmers: kmers.to_vec(),
            abundances: abundances.to_vec(),
            ..SearchSettings::default()
        }
    }

    fn graph(truths: &[Truth]) -> AssemblyGraph {
        AssemblyGraph::parse(Cursor::new(graph_text(truths)), Path::new(".")).unwrap()
    }

    fn written(graph: &AssemblyGraph) -> String {
        let mut out = Vec::new();
        graph.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn solver_for(truths: &[Truth]) -> ScriptedSolver {
        truths
            .iter()
            .enumerate()
            .fold(ScriptedSolver::default(), |solver, (i, truth)| {
                solver.solving(&format!("ctg{}+_ctg{}+", 2 * i, 2 * i + 1), truth.clone())
            })
    }

    #[test]
    fn test_fills_gap_in_contig_mode() {
        let truths = vec![Truth::new(400, 150, 3)];
        let mut graph = graph(&truths);
        let solver = solver_for(&truths).up_to_k(41);
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let orchestrator = GapOrchestrator::new(
            &settings(&[51, 41], &[3, 2]),
            EvaluationMode::Contigs,
            1,
            &solver,
            &aligner,
            &source,
        );

        let reports = orchestrator.run(&mut graph, 0).unwrap();

        assert_eq!(reports.len(), 1);
        let fill = reports[0].result.fill().unwrap();
        assert_eq!(fill.candidate.combination.k, 41);
        assert_eq!(fill.candidate.combination.abundance, 3);
        assert_eq!(fill.candidate.orientation, Orientation::Forward);
        assert_eq!(reports[0].trials, 3);

        let text = written(&graph);
        let filled = text.lines().filter(|l| l.starts_with("S\tctg0+_ctg1+")).count();
        assert_eq!(filled, 1);
        assert!(text.contains("S\tctg0+_ctg1+.g1.k41.a3.fwd\t232\t"));
        assert!(!text.lines().any(|l| l.starts_with("G\t")));
        assert_eq!(text.lines().filter(|l| l.starts_with("E\t")).count(), 2);
    }

    #[test]
    fn test_output_independent_of_workers() {
        let truths = (0..10)
            .map(|i| Truth::new(300, 80 + 10 * i, i as u64 + 1))
            .collect::<Vec<_>>();
        // every third gap never assembles
        let solver = truths
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 3 != 0)
            .fold(ScriptedSolver::default(), |solver, (i, truth)| {
                solver.solving(&format!("ctg{}+_ctg{}+", 2 * i, 2 * i + 1), truth.clone())
            });
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let settings = settings(&[41, 31], &[2]);

        let mut outputs = Vec::new();
        for workers in &[1, 4] {
            let mut graph = graph(&truths);
            let orchestrator = GapOrchestrator::new(
                &settings,
                EvaluationMode::Contigs,
                *workers,
                &solver,
                &aligner,
                &source,
            );
            let reports = orchestrator.run(&mut graph, 0).unwrap();
            assert_eq!(reports.len(), 10);
            assert_eq!(graph.filled_count(), 6);
            outputs.push(written(&graph));
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_resume_from_later_gap() {
        let truths = (0..10)
            .map(|i| Truth::new(300, 100, i as u64 + 20))
            .collect::<Vec<_>>();
        let mut graph = graph(&truths);
        let solver = solver_for(&truths);
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let orchestrator = GapOrchestrator::new(
            &settings(&[31], &[2]),
            EvaluationMode::Contigs,
            2,
            &solver,
            &aligner,
            &source,
        );

        let reports = orchestrator.run(&mut graph, 4).unwrap();

        assert_eq!(
            reports.iter().map(|r| r.index).collect::<Vec<_>>(),
            (4..10).collect::<Vec<_>>()
        );
        for index in 0..4 {
            assert!(graph.fill(index).is_none());
        }
        for index in 4..10 {
            assert!(graph.fill(index).is_some());
        }
        let text = written(&graph);
        assert_eq!(text.lines().filter(|l| l.starts_with("G\t")).count(), 4);
        assert!(text.contains("G\t*\tctg0+\tctg1+\t100\t*"));
        let calls = solver.calls();
        assert!(!calls.iter().any(|(label, ..)| label == "ctg0+_ctg1+"));
    }

    #[test]
    fn test_start_past_last_gap() {
        let truths = vec![Truth::new(300, 100, 5)];
        let mut graph = graph(&truths);
        let solver = solver_for(&truths);
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let orchestrator = GapOrchestrator::new(
            &settings(&[31], &[2]),
            EvaluationMode::Contigs,
            1,
            &solver,
            &aligner,
            &source,
        );
        assert!(orchestrator.run(&mut graph, 7).unwrap().is_empty());
        assert!(solver.calls().is_empty());
    }

    #[test]
    fn test_extraction_failure_leaves_gap_open() {
        let truths = vec![Truth::new(300, 100, 8), Truth::new(300, 100, 9)];
        let mut graph = graph(&truths);
        let solver = solver_for(&truths);
        let aligner = PairwiseAligner::default();
        let source = NoReads {
            failing: vec!["ctg0+_ctg1+".to_string()],
        };
        let orchestrator = GapOrchestrator::new(
            &settings(&[31], &[2]),
            EvaluationMode::Contigs,
            2,
            &solver,
            &aligner,
            &source,
        );

        let reports = orchestrator.run(&mut graph, 0).unwrap();

        assert_eq!(reports[0].result, GapResult::Unresolved);
        assert_eq!(reports[0].reads, None);
        assert_eq!(reports[0].trials, 0);
        assert!(reports[1].result.fill().is_some());
        assert!(graph.fill(0).is_none());
        assert!(graph.fill(1).is_some());
    }

    #[test]
    fn test_merging_twice_is_idempotent() {
        let truths = vec![Truth::new(300, 100, 11)];
        let mut graph = graph(&truths);
        let solver = solver_for(&truths);
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let orchestrator = GapOrchestrator::new(
            &settings(&[31], &[2]),
            EvaluationMode::Contigs,
            1,
            &solver,
            &aligner,
            &source,
        );
        let reports = orchestrator.run(&mut graph, 0).unwrap();
        let once = written(&graph);
        graph.merge(reports[0].index, &reports[0].label, &reports[0].result);
        assert_eq!(written(&graph), once);
    }

    #[test]
    fn test_reference_mode() {
        let truths = vec![Truth::new(300, 100, 13), Truth::new(300, 100, 14)];
        let dir = tempfile::tempdir().unwrap();
        // only the first gap has a reference, the second falls back to the flanks
        std::fs::write(
            dir.path().join("ref_ctg0+_ctg1+.fasta"),
            format!(">ref\n{}\n", String::from_utf8_lossy(&truths[0].fill(31))),
        )
        .unwrap();
        let mut graph = graph(&truths);
        let solver = solver_for(&truths);
        let aligner = PairwiseAligner::default();
        let source = NoReads::default();
        let orchestrator = GapOrchestrator::new(
            &settings(&[31], &[2]),
            EvaluationMode::Reference(dir.path().to_path_buf()),
            1,
            &solver,
            &aligner,
            &source,
        );

        let reports = orchestrator.run(&mut graph, 0).unwrap();

        assert_eq!(reports[0].result.fill().unwrap().grade.to_string(), "AA");
        assert_eq!(reports[1].result.fill().unwrap().grade.to_string(), "AAA");
    }

    #[test]
    fn test_reference_file_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_ctg0+_ctg1+.fa"), ">r\nA\n").unwrap();
        std::fs::write(dir.path().join("a_ctg0+_ctg1+.fa"), ">r\nA\n").unwrap();
        std::fs::write(dir.path().join("ctg2+_ctg3+.fa"), ">r\nA\n").unwrap();
        assert_eq!(
            reference_file(dir.path(), "ctg0+_ctg1+"),
            Some(dir.path().join("a_ctg0+_ctg1+.fa"))
        );
        assert_eq!(reference_file(dir.path(), "ctg4+_ctg5+"), None);
    }
}

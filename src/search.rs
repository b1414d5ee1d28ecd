//! Per-gap parameter search.
//!
//! The controller walks the [`ParameterGrid`] from the most to the least conservative
//! combination. Each combination is assembled in both orientations, every candidate is graded,
//! and the first combination yielding an acceptable candidate ends the search (unless the grid
//! is forced, in which case every acceptable candidate is recorded and the walk continues).
use crate::alignment::Aligner;
use crate::assembler::{CandidateAssembler, CandidateSequence, LocalAssembler};
use crate::error::SolverFailure;
use crate::genomic::Orientation;
use crate::gfa::Gap;
use crate::grid::{GridCursor, ParameterCombination, ParameterGrid};
use crate::quality::{QualityGrade, QualityScorer, ReferenceMaterial};
use log::{debug, info};
use std::path::Path;

/// State of the search of one gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Not started
    Pending,
    /// Trying a combination
    Searching(ParameterCombination),
    /// An acceptable candidate was found
    Accepted,
    /// No combination produced an acceptable candidate
    Exhausted,
}

impl SearchState {
    /// Whether the search is over
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchState::Accepted | SearchState::Exhausted)
    }
}

/// An acceptable candidate and its grade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// Accepted sequence
    pub candidate: CandidateSequence,
    /// Its grade
    pub grade: QualityGrade,
}

/// Terminal outcome of a gap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapResult {
    /// Filled by `fill`; `alternatives` holds the other acceptable candidates seen, in search
    /// order, when the grid was forced
    Filled {
        /// Winning candidate
        fill: Fill,
        /// Other acceptable candidates
        alternatives: Vec<Fill>,
    },
    /// Left open
    Unresolved,
}

impl GapResult {
    /// Winning fill, if any
    pub fn fill(&self) -> Option<&Fill> {
        match self {
            GapResult::Filled { fill, .. } => Some(fill),
            GapResult::Unresolved => None,
        }
    }

    /// Winning fill followed by the alternatives
    pub fn accepted(&self) -> Vec<&Fill> {
        match self {
            GapResult::Filled { fill, alternatives } => {
                std::iter::once(fill).chain(alternatives.iter()).collect()
            }
            GapResult::Unresolved => Vec::new(),
        }
    }
}

/// What happened for one combination
#[derive(Debug, Clone)]
pub struct Trial {
    /// Combination tried
    pub combination: ParameterCombination,
    /// Solver failures per orientation
    pub failures: Vec<(Orientation, SolverFailure)>,
    /// Grade of every candidate, in orientation then solver order
    pub grades: Vec<(CandidateSequence, QualityGrade, bool)>,
}

impl Trial {
    /// Best acceptable candidate: smallest grade, then forward, then solver rank
    fn best(&self) -> Option<Fill> {
        self.grades
            .iter()
            .filter(|(_, _, acceptable)| *acceptable)
            .min_by(|(a, a_grade, _), (b, b_grade, _)| {
                a_grade
                    .cmp(b_grade)
                    .then(a.orientation.cmp(&b.orientation))
                    .then(a.solution.cmp(&b.solution))
            })
            .map(|(candidate, grade, _)| Fill {
                candidate: candidate.clone(),
                grade: grade.clone(),
            })
    }
}

/// Search of a single gap
#[derive(Debug)]
pub struct GapSearchController<'a, A, L> {
    assembler: CandidateAssembler<'a, A>,
    scorer: QualityScorer<'a, L>,
    cursor: GridCursor<'a>,
    state: SearchState,
    accepted: Vec<Fill>,
    trials: Vec<Trial>,
}

impl<'a, A: LocalAssembler, L: Aligner> GapSearchController<'a, A, L> {
    /// Controller at the first combination of `grid`
    pub fn new(
        grid: &'a ParameterGrid,
        assembler: CandidateAssembler<'a, A>,
        scorer: QualityScorer<'a, L>,
    ) -> Self {
        Self {
            assembler,
            scorer,
            cursor: grid.cursor(),
            state: SearchState::Pending,
            accepted: Vec::new(),
            trials: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Combinations tried so far
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Runs the search to a terminal state
    pub fn run(
        mut self,
        gap: &Gap,
        reads: &Path,
        material: &ReferenceMaterial<'_>,
    ) -> (GapResult, Vec<Trial>) {
        while !self.state.is_terminal() {
            self.step(gap, reads, material);
        }
        let mut accepted = self.accepted.into_iter();
        let result = match accepted.next() {
            Some(fill) => GapResult::Filled {
                fill,
                alternatives: accepted.collect(),
            },
            None => GapResult::Unresolved,
        };
        (result, self.trials)
    }

    /// Advances by one transition
    pub fn step(&mut self, gap: &Gap, reads: &Path, material: &ReferenceMaterial<'_>) {
        let state = self.state;
        self.state = match state {
            SearchState::Pending => self.advance(),
            SearchState::Searching(combination) => {
                let trial = self.trial(gap, reads, material, combination);
                let best = trial.best();
                self.trials.push(trial);
                match best {
                    Some(fill) => {
                        info!(
                            "Gap {} filled with {} ({} bp, {}, grade {})",
                            gap.label(),
                            combination,
                            fill.candidate.len(),
                            fill.candidate.orientation,
                            fill.grade
                        );
                        self.accepted.push(fill);
                        self.cursor.stop();
                        match self.cursor.next() {
                            Some(next) => SearchState::Searching(next),
                            None => SearchState::Accepted,
                        }
                    }
                    None => self.advance(),
                }
            }
            terminal => terminal,
        };
    }

    fn advance(&mut self) -> SearchState {
        match self.cursor.next() {
            Some(combination) => SearchState::Searching(combination),
            None if self.accepted.is_empty() => SearchState::Exhausted,
            None => SearchState::Accepted,
        }
    }

    fn trial(
        &self,
        gap: &Gap,
        reads: &Path,
        material: &ReferenceMaterial<'_>,
        combination: ParameterCombination,
    ) -> Trial {
        debug!("Gap-filling of {} with {}", gap.label(), combination);
        let mut failures = Vec::new();
        let mut forward = Vec::new();
        let mut reverse = Vec::new();
        for orientation in Orientation::BOTH.iter() {
            match self
                .assembler
                .candidates(gap, reads, *orientation, &combination)
            {
                Ok(candidates) => match orientation {
                    Orientation::Forward => forward = candidates,
                    Orientation::Reverse => reverse = candidates,
                },
                Err(failure) => {
                    debug!(
                        "No {} fill of {} with {}: {}",
                        orientation,
                        gap.label(),
                        combination,
                        failure
                    );
                    failures.push((*orientation, failure));
                }
            }
        }

        let min_len = 2 * combination.extension;
        let grades = forward
            .iter()
            .map(|candidate| (candidate, &reverse))
            .chain(reverse.iter().map(|candidate| (candidate, &forward)))
            .map(|(candidate, opposite)| {
                let grade = self.scorer.grade(candidate, opposite, material);
                let acceptable = grade.is_acceptable() && candidate.len() > min_len;
                (candidate.clone(), grade, acceptable)
            })
            .collect();

        Trial {
            combination,
            failures,
            grades,
        }
    }
}

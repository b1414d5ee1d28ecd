//! Letter grades of candidate filling sequences.
//!
//! A grade has one letter per evaluated dimension, `A` being the best and `D` the worst:
//!
//! * reference mode: alignment to the reference sequence, then complementarity (`AB`)
//! * contig mode: alignment to the left flank window, to the right flank window, then
//!   complementarity (`ABA`)
//!
//! Complementarity compares a candidate with the candidates of the opposite orientation, both
//! brought back to the forward frame.
use crate::alignment::{Aligner, AlignmentStats};
use crate::assembler::CandidateSequence;
use crate::error::Error;
use crate::genomic::forward_frame;
use log::debug;
use std::{fmt, str::FromStr};

/// Grade of a single dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    /// Best
    A,
    /// Good
    B,
    /// Poor
    C,
    /// Unusable or not evaluated
    D,
}

impl Grade {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'C' => Some(Grade::C),
            'D' => Some(Grade::D),
            _ => None,
        }
    }

    fn is_good(self) -> bool {
        matches!(self, Grade::A | Grade::B)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
        };
        write!(f, "{}", letter)
    }
}

/// Positional letters of a candidate. Compared lexicographically, smaller is better.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualityGrade(Vec<Grade>);

impl QualityGrade {
    /// Grade of reference mode
    pub fn reference(reference: Grade, complementarity: Grade) -> Self {
        QualityGrade(vec![reference, complementarity])
    }

    /// Grade of contig mode
    pub fn contigs(left: Grade, right: Grade, complementarity: Grade) -> Self {
        QualityGrade(vec![left, right, complementarity])
    }

    /// Reference mode accepts `[AB][AB]`. Contig mode accepts `A[AB][AB]` and `BA[AB]`: one
    /// flank at `A` and no dimension below `B`.
    pub fn is_acceptable(&self) -> bool {
        use Grade::*;
        match self.0.as_slice() {
            [reference, complementarity] => reference.is_good() && complementarity.is_good(),
            [A, right, complementarity] => right.is_good() && complementarity.is_good(),
            [B, A, complementarity] => complementarity.is_good(),
            _ => false,
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for grade in &self.0 {
            write!(f, "{}", grade)?;
        }
        Ok(())
    }
}

impl FromStr for QualityGrade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters = s
            .chars()
            .map(Grade::from_letter)
            .collect::<Option<Vec<_>>>()
            .filter(|letters| letters.len() == 2 || letters.len() == 3)
            .ok_or_else(|| Error::InvalidParameter(format!("`{}` is not a quality grade", s)))?;
        Ok(QualityGrade(letters))
    }
}

/// Minimal identity and coverage for an alignment letter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentCutoff {
    /// Fraction of matching aligned columns
    pub identity: f64,
    /// Fraction of the evaluated sequence covered
    pub coverage: f64,
}

/// Calibration constants of the grades. Letters not reaching `C` are `D`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeThresholds {
    /// Cutoffs for `A`, `B` and `C` alignments
    pub alignment: [AlignmentCutoff; 3],
    /// Largest normalized edit distance for `A`, `B` and `C` complementarity
    pub complementarity: [f64; 3],
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            alignment: [
                AlignmentCutoff {
                    identity: 0.9,
                    coverage: 0.9,
                },
                AlignmentCutoff {
                    identity: 0.8,
                    coverage: 0.8,
                },
                AlignmentCutoff {
                    identity: 0.5,
                    coverage: 0.5,
                },
            ],
            complementarity: [0.02, 0.05, 0.1],
        }
    }
}

impl GradeThresholds {
    /// Buckets an alignment statistic, `coverage` being the one relevant to the dimension
    pub fn alignment_grade(&self, identity: f64, coverage: f64) -> Grade {
        let grades = [Grade::A, Grade::B, Grade::C];
        self.alignment
            .iter()
            .zip(grades.iter())
            .find(|(cutoff, _)| identity >= cutoff.identity && coverage >= cutoff.coverage)
            .map_or(Grade::D, |(_, grade)| *grade)
    }

    /// Buckets a normalized edit distance
    pub fn complementarity_grade(&self, distance: f64) -> Grade {
        let grades = [Grade::A, Grade::B, Grade::C];
        self.complementarity
            .iter()
            .zip(grades.iter())
            .find(|(max_distance, _)| distance <= **max_distance)
            .map_or(Grade::D, |(_, grade)| *grade)
    }
}

/// What a candidate is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum ReferenceMaterial<'a> {
    /// Known sequence of the gap region, flanks included
    Reference(&'a [u8]),
    /// Oriented flanking contigs; the left one ends at the gap, the right one starts at it
    Flanks {
        /// Left flank as read towards the gap
        left: &'a [u8],
        /// Right flank as read away from the gap
        right: &'a [u8],
    },
}

/// Deterministic grading of candidates
#[derive(Debug)]
pub struct QualityScorer<'a, L> {
    aligner: &'a L,
    thresholds: &'a GradeThresholds,
}

impl<'a, L: Aligner> QualityScorer<'a, L> {
    /// Scorer using `aligner` for statistics
    pub fn new(aligner: &'a L, thresholds: &'a GradeThresholds) -> Self {
        Self {
            aligner,
            thresholds,
        }
    }

    /// Grades `candidate`; `opposite` holds every candidate found in the other orientation with
    /// the same combination. Flank windows span the combination's extension size.
    pub fn grade(
        &self,
        candidate: &CandidateSequence,
        opposite: &[CandidateSequence],
        material: &ReferenceMaterial<'_>,
    ) -> QualityGrade {
        let query = forward_frame(&candidate.seq, candidate.orientation);
        let complementarity = self.complementarity(candidate, opposite);

        let grade = match material {
            ReferenceMaterial::Reference(reference) => {
                let grade = self.align_grade(&query, reference, |stats| {
                    stats.reference_coverage.min(stats.query_coverage)
                });
                QualityGrade::reference(grade, complementarity)
            }
            ReferenceMaterial::Flanks { left, right } => {
                let extension = candidate.combination.extension;
                let left_window = &left[left.len().saturating_sub(extension)..];
                let right_window = &right[..extension.min(right.len())];
                let coverage = |stats: &AlignmentStats| stats.reference_coverage;
                QualityGrade::contigs(
                    self.align_grade(&query, left_window, coverage),
                    self.align_grade(&query, right_window, coverage),
                    complementarity,
                )
            }
        };
        debug!(
            "Candidate {} of {} ({} bp) graded {}",
            candidate.solution,
            candidate.orientation,
            candidate.len(),
            grade
        );
        grade
    }

    /// Best agreement between `candidate` and any opposite candidate, `D` when there is none
    pub fn complementarity(
        &self,
        candidate: &CandidateSequence,
        opposite: &[CandidateSequence],
    ) -> Grade {
        let query = forward_frame(&candidate.seq, candidate.orientation);
        opposite
            .iter()
            .filter(|other| other.orientation != candidate.orientation)
            .map(|other| {
                let other = forward_frame(&other.seq, other.orientation);
                self.aligner
                    .normalized_distance(&query, &other)
                    .map_or(Grade::D, |distance| {
                        self.thresholds.complementarity_grade(distance)
                    })
            })
            .min()
            .unwrap_or(Grade::D)
    }

    fn align_grade<F>(&self, query: &[u8], reference: &[u8], coverage: F) -> Grade
    where
        F: Fn(&AlignmentStats) -> f64,
    {
        match self.aligner.align(query, reference) {
            Ok(stats) => self
                .thresholds
                .alignment_grade(stats.identity, coverage(&stats)),
            Err(e) => {
                debug!("Alignment failed, grading as D: {}", e);
                Grade::D
            }
        }
    }
}

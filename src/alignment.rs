use crate::error::AlignmentFailure;
use bio::alignment::distance::levenshtein;
use bio::alignment::pairwise::{self, banded};
use bio::alignment::AlignmentOperation;

/// Summary of the best local alignment between a query and a reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentStats {
    /// Fraction of aligned columns that are matches
    pub identity: f64,
    /// Fraction of the query covered by the alignment
    pub query_coverage: f64,
    /// Fraction of the reference covered by the alignment
    pub reference_coverage: f64,
}

impl AlignmentStats {
    /// Statistic of two sequences that share nothing
    pub const UNALIGNED: AlignmentStats = AlignmentStats {
        identity: 0.0,
        query_coverage: 0.0,
        reference_coverage: 0.0,
    };
}

/// Alignment utility used to grade candidate sequences.
pub trait Aligner: Send + Sync {
    /// Aligns `query` locally against `reference`
    fn align(&self, query: &[u8], reference: &[u8]) -> Result<AlignmentStats, AlignmentFailure>;

    /// Edit distance divided by the length of the longer sequence
    fn normalized_distance(&self, a: &[u8], b: &[u8]) -> Result<f64, AlignmentFailure> {
        let longest = a.len().max(b.len());
        if longest == 0 {
            return Err(AlignmentFailure::EmptySequence);
        }
        let a = a.to_ascii_uppercase();
        let b = b.to_ascii_uppercase();
        Ok(levenshtein(&a, &b) as f64 / longest as f64)
    }
}

/// Smith-Waterman local alignment from `bio`. Pairs whose full matrix would exceed
/// `max_full_cells` are aligned within a band around their shared k-mers.
#[derive(Debug, Clone, Copy)]
pub struct PairwiseAligner {
    match_score: i32,
    mismatch_score: i32,
    gap_open: i32,
    gap_extend: i32,
    max_full_cells: usize,
    band_kmer: usize,
    band_width: usize,
}

impl Default for PairwiseAligner {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -1,
            gap_open: -5,
            gap_extend: -1,
            max_full_cells: 1_000_000,
            band_kmer: 8,
            band_width: 20,
        }
    }
}

impl PairwiseAligner {
    fn local(&self, query: &[u8], reference: &[u8]) -> bio::alignment::Alignment {
        let (match_score, mismatch_score) = (self.match_score, self.mismatch_score);
        let score = |a: u8, b: u8| if a == b { match_score } else { mismatch_score };
        if query.len().saturating_mul(reference.len()) <= self.max_full_cells {
            pairwise::Aligner::with_capacity(
                query.len(),
                reference.len(),
                self.gap_open,
                self.gap_extend,
                score,
            )
            .local(query, reference)
        } else {
            banded::Aligner::with_capacity(
                query.len(),
                reference.len(),
                self.gap_open,
                self.gap_extend,
                score,
                self.band_kmer,
                self.band_width,
            )
            .local(query, reference)
        }
    }
}

impl Aligner for PairwiseAligner {
    fn align(&self, query: &[u8], reference: &[u8]) -> Result<AlignmentStats, AlignmentFailure> {
        if query.is_empty() || reference.is_empty() {
            return Err(AlignmentFailure::EmptySequence);
        }
        let query = query.to_ascii_uppercase();
        let reference = reference.to_ascii_uppercase();
        let alignment = self.local(&query, &reference);

        let (matches, columns) =
            alignment
                .operations
                .iter()
                .fold((0usize, 0usize), |(matches, columns), op| match op {
                    AlignmentOperation::Match => (matches + 1, columns + 1),
                    AlignmentOperation::Subst
                    | AlignmentOperation::Del
                    | AlignmentOperation::Ins => (matches, columns + 1),
                    _ => (matches, columns),
                });

        if columns == 0 {
            return Ok(AlignmentStats::UNALIGNED);
        }

        Ok(AlignmentStats {
            identity: matches as f64 / columns as f64,
            query_coverage: (alignment.xend - alignment.xstart) as f64 / query.len() as f64,
            reference_coverage: (alignment.yend - alignment.ystart) as f64
                / reference.len() as f64,
        })
    }
}

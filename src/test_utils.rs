use crate::assembler::{LocalAssembler, SolverRequest};
use crate::error::{ExtractionFailure, SolverFailure};
use crate::extract::{GapReads, ReadSource};
use crate::genomic::{revcomp, Orientation, Strand};
use crate::gfa::{Anchor, Gap};
use std::{
    collections::HashMap,
    fmt::Write as _,
    path::PathBuf,
    sync::Mutex,
};

/// Deterministic pseudo-random bases
pub(crate) fn synthetic_sequence(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

/// Genome around one gap: `flank` bases, `gap` unknown bases, `flank` bases
#[derive(Debug, Clone)]
pub(crate) struct Truth {
    pub genome: Vec<u8>,
    pub flank: usize,
    pub gap: usize,
}

impl Truth {
    pub fn new(flank: usize, gap: usize, seed: u64) -> Self {
        Self {
            genome: synthetic_sequence(2 * flank + gap, seed),
            flank,
            gap,
        }
    }

    pub fn left(&self) -> &[u8] {
        &self.genome[..self.flank]
    }

    pub fn right(&self) -> &[u8] {
        &self.genome[self.flank + self.gap..]
    }

    /// Forward filled sequence for an extension of `ext`
    pub fn fill(&self, ext: usize) -> Vec<u8> {
        self.genome[self.flank - ext..self.flank + self.gap + ext].to_vec()
    }
}

/// Gap `index` between two forward segments named `ctg<2 index>` and `ctg<2 index + 1>`
pub(crate) fn gap_with_fill(index: usize, flank: usize, gap: usize, seed: u64) -> (Gap, Truth) {
    let truth = Truth::new(flank, gap, seed);
    let gap = Gap {
        index,
        line: index + 1,
        left: Anchor {
            segment: format!("ctg{}", 2 * index),
            strand: Strand::Forward,
        },
        right: Anchor {
            segment: format!("ctg{}", 2 * index + 1),
            strand: Strand::Forward,
        },
        distance: Some(gap as u64),
        variance: None,
        left_flank: truth.left().to_vec(),
        right_flank: truth.right().to_vec(),
    };
    (gap, truth)
}

/// GFA text with one gap per truth, named as by [`gap_with_fill`], sequences inline
pub(crate) fn graph_text(truths: &[Truth]) -> String {
    let mut text = String::from("H\tVN:Z:2.0\n");
    for (i, truth) in truths.iter().enumerate() {
        for (j, seq) in [truth.left(), truth.right()].iter().enumerate() {
            let _ = writeln!(
                text,
                "S\tctg{}\t{}\t{}",
                2 * i + j,
                seq.len(),
                String::from_utf8_lossy(seq)
            );
        }
    }
    for (i, truth) in truths.iter().enumerate() {
        let _ = writeln!(text, "G\t*\tctg{}+\tctg{}+\t{}\t*", 2 * i, 2 * i + 1, truth.gap);
    }
    text
}

type Call = (String, Orientation, usize, u32);

/// Solver answering from scripted results, or from the known genome of a gap
#[derive(Debug, Default)]
pub(crate) struct ScriptedSolver {
    scripted: HashMap<(usize, u32, Orientation), Result<Vec<Vec<u8>>, SolverFailure>>,
    truths: HashMap<String, Truth>,
    max_k: usize,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedSolver {
    pub fn with(
        mut self,
        k: usize,
        abundance: u32,
        orientation: Orientation,
        result: Result<Vec<Vec<u8>>, SolverFailure>,
    ) -> Self {
        self.scripted.insert((k, abundance, orientation), result);
        self
    }

    /// Assembles the true fill of `label`
    pub fn solving(mut self, label: &str, truth: Truth) -> Self {
        self.truths.insert(label.to_string(), truth);
        self
    }

    /// Known genomes are only assembled for `k <= max_k`
    pub fn up_to_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl LocalAssembler for ScriptedSolver {
    fn assemble(&self, request: &SolverRequest<'_>) -> Result<Vec<Vec<u8>>, SolverFailure> {
        let combination = request.combination;
        self.calls.lock().unwrap().push((
            request.gap_label.to_string(),
            request.orientation,
            combination.k,
            combination.abundance,
        ));
        if let Some(result) =
            self.scripted
                .get(&(combination.k, combination.abundance, request.orientation))
        {
            return result.clone();
        }
        match self.truths.get(request.gap_label) {
            Some(truth) if self.max_k == 0 || combination.k <= self.max_k => {
                let fill = truth.fill(combination.extension);
                Ok(match request.orientation {
                    Orientation::Forward => vec![fill],
                    Orientation::Reverse => vec![revcomp(&fill)],
                })
            }
            _ => Err(SolverFailure::NoPath),
        }
    }
}

/// Read source that never touches the disk
#[derive(Debug, Default)]
pub(crate) struct NoReads {
    pub failing: Vec<String>,
}

impl ReadSource for NoReads {
    fn reads(&self, gap: &Gap) -> Result<GapReads, ExtractionFailure> {
        if self.failing.contains(&gap.label()) {
            return Err(ExtractionFailure::UnknownTarget(gap.left.segment.clone()));
        }
        Ok(GapReads::existing(PathBuf::from("reads.fq"), 0))
    }
}

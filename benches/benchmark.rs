use criterion::{criterion_group, criterion_main, Criterion};
use rustylink::alignment::PairwiseAligner;
use rustylink::assembler::CandidateSequence;
use rustylink::genomic::{revcomp, Orientation};
use rustylink::grid::ParameterCombination;
use rustylink::quality::{GradeThresholds, QualityScorer, ReferenceMaterial};

fn sequence(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let genome = sequence(1_000);
    let combination = ParameterCombination {
        k: 51,
        abundance: 3,
        extension: 51,
    };
    let fill = genome[400 - 51..600 + 51].to_vec();
    let forward = CandidateSequence {
        seq: fill.clone(),
        orientation: Orientation::Forward,
        combination,
        solution: 1,
    };
    let reverse = vec![CandidateSequence {
        seq: revcomp(&fill),
        orientation: Orientation::Reverse,
        combination,
        solution: 1,
    }];
    let material = ReferenceMaterial::Flanks {
        left: &genome[..400],
        right: &genome[600..],
    };
    let aligner = PairwiseAligner::default();
    let thresholds = GradeThresholds::default();
    let scorer = QualityScorer::new(&aligner, &thresholds);

    c.bench_function("grade 300 bp fill", |b| {
        b.iter(|| scorer.grade(&forward, &reverse, &material))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

use crate::genomic::forward_frame;
use crate::gfa::FilledSegment;
use crate::orchestrator::GapReport;
use crate::search::GapResult;
use crate::Result;
use bio::io::fasta;
use log::info;
use std::io::Write;

/// Column legend of the union summary
pub const UNION_SUMMARY_HEADER: &str =
    "Gap_ID\tLeft_scaffold\tRight_scaffold\tGap_size\tChunk_size\tNb_barcodes\tNb_reads";

/// Tab-separated summary of the reads extracted for each gap. Unknown values are written `NA`.
pub fn write_union_summary<W: Write>(
    reports: &[GapReport],
    chunk: Option<u64>,
    out: W,
) -> Result<()> {
    let mut out = out;
    writeln!(out, "{}", UNION_SUMMARY_HEADER)?;
    for report in reports {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            report.index + 1,
            report.left,
            report.right,
            na(report.distance),
            na(chunk),
            na(report.barcodes),
            na(report.reads),
        )?;
    }
    Ok(())
}

fn na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| v.to_string())
}

/// Every accepted sequence, alternatives included, in the forward frame. The winner of each gap
/// carries the name of its filled segment.
pub fn write_gapfill_fasta<W: Write>(reports: &[GapReport], out: W) -> Result<usize> {
    let mut writer = fasta::Writer::new(out);
    let mut written = 0;
    for report in reports {
        for fill in report.result.accepted() {
            let segment = FilledSegment::new(report.index, &report.label, fill);
            let desc = format!(
                "len_{} qual_{} solution_{}",
                fill.candidate.len(),
                fill.grade,
                fill.candidate.solution
            );
            writer.write(
                &segment.name,
                Some(desc.as_str()),
                &forward_frame(&fill.candidate.seq, fill.candidate.orientation),
            )?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Gaps searched
    pub attempted: usize,
    /// Gaps that received a fill
    pub filled: usize,
    /// Gaps left open
    pub unresolved: usize,
    /// Gaps for which no reads could be extracted
    pub without_reads: usize,
}

impl RunSummary {
    /// Tallies `reports`
    pub fn new(reports: &[GapReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.attempted += 1;
            match report.result {
                GapResult::Filled { .. } => summary.filled += 1,
                GapResult::Unresolved => summary.unresolved += 1,
            }
            if report.reads.is_none() {
                summary.without_reads += 1;
            }
            summary
        })
    }

    /// Logs the counts at info level, then the combination and grade of every filled gap and the
    /// label of every unresolved one
    pub fn log(&self, reports: &[GapReport]) {
        info!("Gaps attempted: {}", self.attempted);
        info!("Gaps filled: {}", self.filled);
        for report in reports {
            if let Some(fill) = report.result.fill() {
                info!(
                    "  {} filled with {} ({}, grade {})",
                    report.label,
                    fill.candidate.combination,
                    fill.candidate.orientation,
                    fill.grade
                );
            }
        }
        info!(
            "Gaps unresolved: {} ({} without reads)",
            self.unresolved, self.without_reads
        );
        for report in reports.iter().filter(|r| r.result.fill().is_none()) {
            info!("  {}", report.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::CandidateSequence;
    use crate::genomic::{revcomp, Orientation, Strand};
    use crate::gfa::Anchor;
    use crate::grid::ParameterCombination;
    use crate::search::Fill;

    fn anchor(name: &str) -> Anchor {
        Anchor {
            segment: name.to_string(),
            strand: Strand::Forward,
        }
    }

    fn fill(seq: &[u8], orientation: Orientation, solution: usize) -> Fill {
        Fill {
            candidate: CandidateSequence {
                seq: seq.to_vec(),
                orientation,
                combination: ParameterCombination {
                    k: 31,
                    abundance: 2,
                    extension: 31,
                },
                solution,
            },
            grade: "AAA".parse().unwrap(),
        }
    }

    fn reports() -> Vec<GapReport> {
        vec![
            GapReport {
                index: 0,
                label: "a+_b+".to_string(),
                left: anchor("a"),
                right: anchor("b"),
                distance: Some(120),
                result: GapResult::Filled {
                    fill: fill(b"AACCG", Orientation::Reverse, 1),
                    alternatives: vec![fill(b"AACCT", Orientation::Forward, 2)],
                },
                trials: 2,
                barcodes: Some(12),
                reads: Some(340),
            },
            GapReport {
                index: 1,
                label: "c+_d+".to_string(),
                left: anchor("c"),
                right: anchor("d"),
                distance: None,
                result: GapResult::Unresolved,
                trials: 0,
                barcodes: None,
                reads: None,
            },
        ]
    }

    #[test]
    fn test_union_summary() {
        let mut out = Vec::new();
        write_union_summary(&reports(), Some(5000), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], UNION_SUMMARY_HEADER);
        assert_eq!(lines[1], "1\ta+\tb+\t120\t5000\t12\t340");
        assert_eq!(lines[2], "2\tc+\td+\tNA\t5000\tNA\tNA");
    }

    #[test]
    fn test_gapfill_fasta() {
        let mut out = Vec::new();
        let written = write_gapfill_fasta(&reports(), &mut out).unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], ">a+_b+.g1.k31.a2.rev len_5 qual_AAA solution_1");
        assert_eq!(lines[1].as_bytes(), revcomp(b"AACCG").as_slice());
        assert_eq!(lines[2], ">a+_b+.g1.k31.a2.fwd len_5 qual_AAA solution_2");
        assert_eq!(lines[3], "AACCT");
    }

    #[test]
    fn test_run_summary() {
        let summary = RunSummary::new(&reports());
        assert_eq!(
            summary,
            RunSummary {
                attempted: 2,
                filled: 1,
                unresolved: 1,
                without_reads: 1,
            }
        );
    }
}

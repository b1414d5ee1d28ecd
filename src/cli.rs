use log::LevelFilter;
use rustylink::config::{Config, EvaluationMode, ReadsInput, SearchSettings, SolverSettings};
use rustylink::error::Error;
use rustylink::quality::GradeThresholds;
use rustylink::Result;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rustylink",
    about = "Gap-filling of draft assemblies with linked reads, local assembly in breakpoint mode"
)]
pub(crate) struct RustyLink {
    #[structopt(long, help = "Input GFA 2.0 file", parse(from_os_str))]
    pub gfa: PathBuf,
    #[structopt(
        short,
        long,
        help = "Chunk size (bp) on each flank where barcodes are extracted",
        default_value = "5000"
    )]
    pub chunk: u64,
    #[structopt(
        long,
        help = "Indexed BAM of the linked reads mapped on the assembly",
        required_unless = "union-reads",
        parse(from_os_str)
    )]
    pub bam: Option<PathBuf>,
    #[structopt(
        long,
        help = "Barcoded reads (FASTQ, `BX:Z:` in descriptions)",
        required_unless = "union-reads",
        parse(from_os_str)
    )]
    pub reads: Option<PathBuf>,
    #[structopt(
        long,
        help = "Reads already extracted for the gaps, skips barcode extraction",
        parse(from_os_str)
    )]
    pub union_reads: Option<PathBuf>,
    #[structopt(
        short,
        long,
        help = "Minimal frequency of a barcode in the chunks",
        default_value = "2"
    )]
    pub freq: usize,
    #[structopt(
        short,
        long,
        help = "Output directory",
        default_value = "./rustylink_results",
        parse(from_os_str)
    )]
    pub out: PathBuf,
    #[structopt(
        long,
        help = "Directory of reference sequences, grades candidates against them",
        parse(from_os_str)
    )]
    pub ref_dir: Option<PathBuf>,
    #[structopt(long, help = "Grade candidates against the flanking contigs")]
    pub flanks: bool,
    #[structopt(long, help = "Line of the GFA file from which to start")]
    pub line: Option<usize>,
    #[structopt(
        short,
        long = "kmer",
        help = "k-mer sizes",
        default_value = "51,41,31,21",
        use_delimiter = true,
        min_values = 1
    )]
    pub kmers: Vec<usize>,
    #[structopt(
        short,
        long = "abundance",
        help = "Minimal abundance thresholds of solid k-mers",
        default_value = "3,2",
        use_delimiter = true,
        min_values = 1
    )]
    pub abundances: Vec<u32>,
    #[structopt(long, help = "Extension size on both sides of the gap (bp) [default: k]")]
    pub ext: Option<usize>,
    #[structopt(long, help = "Search all combinations even after a gap is filled")]
    pub force: bool,
    #[structopt(long, help = "Maximum number of nodes in the contig graph", default_value = "1000")]
    pub max_nodes: usize,
    #[structopt(long, help = "Maximum length of the filled sequence (bp)", default_value = "10000")]
    pub max_length: usize,
    #[structopt(short, long, help = "Gaps processed in parallel", default_value = "1")]
    pub threads: usize,
    #[structopt(long, help = "Cores of each solver invocation", default_value = "1")]
    pub solver_threads: usize,
    #[structopt(long, help = "Max memory for graph building (MB)", default_value = "0")]
    pub max_memory: usize,
    #[structopt(
        long,
        help = "Local assembly program",
        default_value = "MindTheGap",
        parse(from_os_str)
    )]
    pub solver_bin: PathBuf,
    #[structopt(short, long, help = "Verbosity (-v, -vv)", parse(from_occurrences))]
    pub verbosity: u8,
}

impl RustyLink {
    pub fn set_logging(&self) {
        let level = match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        env_logger::Builder::new().filter_level(level).init();
    }

    /// Checks the options before any gap is touched
    pub fn into_config(self) -> Result<Config> {
        let mode = match (self.ref_dir, self.flanks) {
            (Some(dir), false) => EvaluationMode::Reference(existing(dir)?),
            (None, true) => EvaluationMode::Contigs,
            _ => return Err(Error::ModeSelection),
        };
        let gfa = existing(self.gfa)?;

        let reads = match (self.union_reads, self.bam, self.reads) {
            (Some(union), _, _) => ReadsInput::Union(existing(union)?),
            (None, Some(bam), Some(reads)) => {
                if self.chunk == 0 {
                    return Err(Error::InvalidParameter("chunk size must be positive".into()));
                }
                ReadsInput::Barcoded {
                    bam: existing(bam)?,
                    reads: existing(reads)?,
                    chunk: self.chunk,
                    min_freq: self.freq,
                }
            }
            _ => {
                return Err(Error::InvalidParameter(
                    "either --union-reads or both --bam and --reads are required".into(),
                ))
            }
        };

        if self.kmers.is_empty() || self.kmers.contains(&0) {
            return Err(Error::InvalidParameter("k-mer sizes must be positive".into()));
        }
        if self.abundances.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one abundance threshold is required".into(),
            ));
        }
        if self.threads == 0 || self.solver_threads == 0 {
            return Err(Error::InvalidParameter("thread counts must be positive".into()));
        }

        Ok(Config {
            gfa,
            out_dir: self.out,
            mode,
            reads,
            start_line: self.line,
            workers: self.threads,
            search: SearchSettings {
                kmers: self.kmers,
                abundances: self.abundances,
                extension: self.ext.filter(|ext| *ext > 0),
                force: self.force,
                max_nodes: self.max_nodes,
                max_length: self.max_length,
                thresholds: GradeThresholds::default(),
            },
            solver: SolverSettings {
                program: self.solver_bin,
                threads: self.solver_threads,
                max_memory: self.max_memory,
                verbosity: if self.verbosity >= 2 { 1 } else { 0 },
            },
        })
    }
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if Path::new(&path).exists() {
        Ok(path)
    } else {
        Err(Error::FileNotFound(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RustyLink {
        RustyLink::from_iter_safe(std::iter::once("rustylink").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let opt = parse(&["--gfa", "in.gfa", "--union-reads", "r.fq", "--flanks"]);
        assert_eq!(opt.kmers, vec![51, 41, 31, 21]);
        assert_eq!(opt.abundances, vec![3, 2]);
        assert_eq!(opt.max_length, 10_000);
        assert_eq!(opt.freq, 2);
        assert!(!opt.force);
    }

    #[test]
    fn test_multiple_kmers() {
        let opt = parse(&[
            "--gfa",
            "in.gfa",
            "--union-reads",
            "r.fq",
            "--flanks",
            "-k",
            "61,31",
            "-a",
            "5",
        ]);
        assert_eq!(opt.kmers, vec![61, 31]);
        assert_eq!(opt.abundances, vec![5]);
    }

    #[test]
    fn test_reads_required_without_union() {
        let args = ["rustylink", "--gfa", "in.gfa", "--flanks"];
        assert!(RustyLink::from_iter_safe(args.iter()).is_err());
    }

    #[test]
    fn test_mode_selection() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();
        let both = parse(&[
            "--gfa",
            "in.gfa",
            "--union-reads",
            "r.fq",
            "--flanks",
            "--ref-dir",
            dir_path,
        ]);
        assert!(matches!(both.into_config(), Err(Error::ModeSelection)));
        let neither = parse(&["--gfa", "in.gfa", "--union-reads", "r.fq"]);
        assert!(matches!(neither.into_config(), Err(Error::ModeSelection)));
    }

    #[test]
    fn test_missing_file() {
        let opt = parse(&["--gfa", "no_such.gfa", "--union-reads", "r.fq", "--flanks"]);
        assert!(matches!(opt.into_config(), Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let gfa = dir.path().join("in.gfa");
        let reads = dir.path().join("r.fq");
        std::fs::write(&gfa, "H\tVN:Z:2.0\n").unwrap();
        std::fs::write(&reads, "").unwrap();
        let opt = parse(&[
            "--gfa",
            gfa.to_str().unwrap(),
            "--union-reads",
            reads.to_str().unwrap(),
            "--flanks",
            "--ext",
            "0",
        ]);
        let config = opt.into_config().unwrap();
        assert_eq!(config.mode, EvaluationMode::Contigs);
        assert_eq!(config.search.extension, None);
        assert_eq!(config.chunk(), None);
    }
}

#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Gap-filling of draft assemblies with linked reads.
mod cli;

use log::info;
use rustylink::{
    alignment::PairwiseAligner,
    assembler::MindTheGap,
    config::{Config, ReadsInput},
    extract::{BarcodeExtractor, PreExtracted, ReadSource},
    gfa::AssemblyGraph,
    orchestrator::GapOrchestrator,
    report::{self, RunSummary},
    Result,
};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};
use structopt::StructOpt;

fn main() -> Result<()> {
    let opt = cli::RustyLink::from_args();
    opt.set_logging();
    let config = opt.into_config()?;
    fs::create_dir_all(&config.out_dir)?;

    match config.reads {
        ReadsInput::Union(ref path) => {
            let source = PreExtracted::new(path)?;
            fill_gaps(&config, &source)
        }
        ReadsInput::Barcoded {
            ref bam,
            ref reads,
            chunk,
            min_freq,
        } => {
            let source =
                BarcodeExtractor::new(bam, reads, chunk, min_freq).with_work_dir(&config.out_dir);
            fill_gaps(&config, &source)
        }
    }
}

fn fill_gaps<R: ReadSource>(config: &Config, source: &R) -> Result<()> {
    let mut graph = AssemblyGraph::from_path(&config.gfa)?;
    info!(
        "{} gaps in {}",
        graph.gap_count(),
        config.gfa.display()
    );
    let first = config
        .start_line
        .map_or(0, |line| graph.gap_index_at_line(line));

    let solver = MindTheGap::new(
        &config.solver.program,
        config.solver.threads,
        config.solver.max_memory,
    )
    .with_verbosity(config.solver.verbosity)
    .with_work_dir(&config.out_dir);
    let aligner = PairwiseAligner::default();
    let orchestrator = GapOrchestrator::new(
        &config.search,
        config.mode.clone(),
        config.workers,
        &solver,
        &aligner,
        source,
    );
    let reports = orchestrator.run(&mut graph, first)?;

    let stem = file_stem(&config.gfa);
    let name = config
        .gfa
        .file_name()
        .map_or_else(|| stem.clone(), |name| name.to_string_lossy().into_owned());

    let gfa_out = config.out_dir.join(format!("{}_rustylink.gfa", stem));
    let mut out = BufWriter::new(File::create(&gfa_out)?);
    graph.write(&mut out)?;
    info!("Output graph written to {}", gfa_out.display());

    let summary_out = config.out_dir.join(format!("{}.union.sum", name));
    report::write_union_summary(
        &reports,
        config.chunk(),
        BufWriter::new(File::create(&summary_out)?),
    )?;

    if reports.iter().any(|report| report.result.fill().is_some()) {
        let fasta_out = config.out_dir.join(format!("{}.gapfill_seq.fasta", name));
        let written = report::write_gapfill_fasta(&reports, File::create(&fasta_out)?)?;
        info!("{} filled sequences written to {}", written, fasta_out.display());
    }

    RunSummary::new(&reports).log(&reports);
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "assembly".to_string(), |stem| stem.to_string_lossy().into_owned())
}

//! Linked reads of a gap: barcodes seen around both flanks, and the reads carrying them.
use crate::error::ExtractionFailure;
use crate::genomic::Strand;
use crate::gfa::Gap;
use bio::io::fastq;
use log::{debug, warn};
use rust_htslib::bam::{self, record::Aux, Read};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Reads available to the solver for one gap. A temporary union file is deleted on drop.
#[derive(Debug)]
pub struct GapReads {
    path: PathBuf,
    barcodes: Option<usize>,
    reads: usize,
    _dir: Option<TempDir>,
}

impl GapReads {
    /// Reads already on disk, not owned
    pub fn existing(path: PathBuf, reads: usize) -> Self {
        Self {
            path,
            barcodes: None,
            reads,
            _dir: None,
        }
    }

    /// Reads file given to the solver
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of barcodes in the union, if it was extracted
    pub fn barcodes(&self) -> Option<usize> {
        self.barcodes
    }

    /// Number of reads
    pub fn reads(&self) -> usize {
        self.reads
    }
}

/// Provides the reads of a gap
pub trait ReadSource: Send + Sync {
    /// Reads for `gap`, or the reason they are missing
    fn reads(&self, gap: &Gap) -> Result<GapReads, ExtractionFailure>;
}

/// Same pre-extracted reads file for every gap
#[derive(Debug, Clone)]
pub struct PreExtracted {
    path: PathBuf,
    reads: usize,
}

impl PreExtracted {
    /// Counts the records of `path` once
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self, ExtractionFailure> {
        let path = path.into();
        let (rdr, _) = niffler::from_path(&path)?;
        let mut reads = 0;
        for record in fastq::Reader::new(rdr).records() {
            record.map_err(|e| {
                ExtractionFailure::Reads(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            reads += 1;
        }
        Ok(Self { path, reads })
    }
}

impl ReadSource for PreExtracted {
    fn reads(&self, _gap: &Gap) -> Result<GapReads, ExtractionFailure> {
        Ok(GapReads::existing(self.path.clone(), self.reads))
    }
}

/// Barcodes from an indexed BAM of linked reads, reads from a FASTQ with `BX:Z:` descriptions
#[derive(Debug, Clone)]
pub struct BarcodeExtractor {
    bam: PathBuf,
    reads: PathBuf,
    chunk: u64,
    min_freq: usize,
    work_dir: Option<PathBuf>,
}

impl BarcodeExtractor {
    /// Barcodes seen at least `min_freq` times in the `chunk` bases of each flank next to the gap
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        bam: P,
        reads: Q,
        chunk: u64,
        min_freq: usize,
    ) -> Self {
        Self {
            bam: bam.into(),
            reads: reads.into(),
            chunk,
            min_freq,
            work_dir: None,
        }
    }

    /// Creates the union files under `dir`
    pub fn with_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Window of `chunk` bases of a flank touching the gap, clamped to the segment
    pub fn chunk_region(&self, gap: &Gap, left: bool) -> (String, u64, u64) {
        let (anchor, len) = if left {
            (&gap.left, gap.left_flank.len() as u64)
        } else {
            (&gap.right, gap.right_flank.len() as u64)
        };
        let chunk = if self.chunk > len {
            warn!(
                "Chunk size {} exceeds the length of {} ({} bp) for {}, using the whole segment",
                self.chunk,
                anchor.segment,
                len,
                gap.label()
            );
            len
        } else {
            self.chunk
        };
        // the gap touches the end of a left `+` or right `-` segment
        let at_end = (anchor.strand == Strand::Forward) == left;
        if at_end {
            (anchor.segment.clone(), len - chunk, len)
        } else {
            (anchor.segment.clone(), 0, chunk)
        }
    }

    fn count_barcodes(
        &self,
        bam: &mut bam::IndexedReader,
        region: &(String, u64, u64),
        counts: &mut HashMap<String, usize>,
    ) -> Result<(), ExtractionFailure> {
        let (name, start, end) = region;
        let desc = format!("{}:{}-{}", name, start, end);
        let tid = bam
            .header()
            .tid(name.as_bytes())
            .ok_or_else(|| ExtractionFailure::UnknownTarget(name.clone()))?;
        bam.fetch((tid, *start as i64, *end as i64))
            .map_err(|e| ExtractionFailure::Region(desc.clone(), e))?;
        for record in bam.records() {
            let record = record.map_err(|e| ExtractionFailure::Region(desc.clone(), e))?;
            if let Some(Aux::String(barcode)) = record.aux(b"BX") {
                *counts
                    .entry(String::from_utf8_lossy(barcode).into_owned())
                    .or_insert(0) += 1;
            }
        }
        Ok(())
    }
}

/// Barcode of a FASTQ record given as a `BX:Z:` description field
pub fn fastq_barcode(record: &fastq::Record) -> Option<&str> {
    record
        .desc()?
        .split_whitespace()
        .find_map(|field| field.strip_prefix("BX:Z:"))
}

impl ReadSource for BarcodeExtractor {
    fn reads(&self, gap: &Gap) -> Result<GapReads, ExtractionFailure> {
        let label = gap.label();
        let mut bam = bam::IndexedReader::from_path(&self.bam)
            .map_err(|e| ExtractionFailure::Region(self.bam.display().to_string(), e))?;

        let mut counts = HashMap::new();
        for left in &[true, false] {
            let region = self.chunk_region(gap, *left);
            self.count_barcodes(&mut bam, &region, &mut counts)?;
        }
        let union = counts
            .into_iter()
            .filter(|(_, occurrences)| *occurrences >= self.min_freq)
            .map(|(barcode, _)| barcode)
            .collect::<HashSet<_>>();
        debug!("{} barcodes in the union of {}", union.len(), label);

        let dir = match self.work_dir {
            Some(ref work_dir) => tempfile::Builder::new().prefix("union").tempdir_in(work_dir),
            None => tempfile::Builder::new().prefix("union").tempdir(),
        }?;
        let path = dir.path().join(format!("{}.rbxu.fastq", label));
        let (rdr, _) = niffler::from_path(&self.reads)?;
        let mut writer = fastq::Writer::to_file(&path)?;
        let mut reads = 0;
        for record in fastq::Reader::new(rdr).records() {
            let record = record.map_err(|e| {
                ExtractionFailure::Reads(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            if fastq_barcode(&record).map_or(false, |barcode| union.contains(barcode)) {
                writer.write_record(&record)?;
                reads += 1;
            }
        }
        writer.flush()?;
        debug!("{} reads extracted for {}", reads, label);

        Ok(GapReads {
            path,
            barcodes: Some(union.len()),
            reads,
            _dir: Some(dir),
        })
    }
}

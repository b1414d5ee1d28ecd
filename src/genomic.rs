use crate::Result;
use bio::alphabets::dna;
use std::{borrow::Cow, collections::HashMap, fmt, path::Path};

/// Strand of a segment as written in GFA references (`+`/`-`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    /// `+`
    Forward,
    /// `-`
    Reverse,
}

impl Strand {
    /// Parses the trailing `+` or `-` of a GFA reference
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'+' => Some(Strand::Forward),
            b'-' => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// GFA symbol of the strand
    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Direction in which a gap is filled: from the left flank towards the right one, or from the
/// reverse complement of the right flank towards the reverse complement of the left one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    /// Left to right
    Forward,
    /// Right to left on the opposite strand
    Reverse,
}

impl Orientation {
    /// Both orientations, forward first
    pub const BOTH: [Orientation; 2] = [Orientation::Forward, Orientation::Reverse];

    /// Short tag used in names and descriptions
    pub fn tag(self) -> &'static str {
        match self {
            Orientation::Forward => "fwd",
            Orientation::Reverse => "rev",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reverse complement, keeping IUPAC codes and case
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    dna::revcomp(seq)
}

/// Sequence as read on `strand`
pub fn oriented(seq: &[u8], strand: Strand) -> Cow<'_, [u8]> {
    match strand {
        Strand::Forward => Cow::Borrowed(seq),
        Strand::Reverse => Cow::Owned(revcomp(seq)),
    }
}

/// Sequence of a filling candidate brought back to the forward (left to right) frame
pub fn forward_frame(seq: &[u8], orientation: Orientation) -> Cow<'_, [u8]> {
    match orientation {
        Orientation::Forward => Cow::Borrowed(seq),
        Orientation::Reverse => Cow::Owned(revcomp(seq)),
    }
}

/// Collects all records of a FASTA reader keyed by their id
pub fn create_fasta_records<T: std::io::Read>(
    rdr: bio::io::fasta::Reader<T>,
) -> Result<HashMap<String, Vec<u8>>> {
    let mut fasta_records = HashMap::<String, Vec<u8>>::new();
    for record in rdr.records() {
        let record = record?;
        fasta_records.insert(record.id().to_string(), record.seq().to_vec());
    }
    Ok(fasta_records)
}

/// Reads a plain or compressed FASTA file
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<u8>>> {
    let (rdr, _) = niffler::from_path(path.as_ref())?;
    create_fasta_records(bio::io::fasta::Reader::new(rdr))
}

/// Reads the first record of a plain or compressed FASTA file
pub fn read_first_fasta<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>> {
    let (rdr, _) = niffler::from_path(path.as_ref())?;
    let rdr = bio::io::fasta::Reader::new(rdr);
    match rdr.records().next() {
        Some(record) => Ok(Some(record?.seq().to_vec())),
        None => Ok(None),
    }
}

//! GFA 2.0 assembly graph: the segments, the gaps between them and the filled sequences merged
//! in after gap-filling.
use crate::error::Error;
use crate::genomic::{self, oriented, Orientation, Strand};
use crate::grid::ParameterCombination;
use crate::quality::QualityGrade;
use crate::search::{Fill, GapResult};
use crate::{Result, GFA_HEADER};
use log::{debug, warn};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

/// Oriented end of a gap
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// Segment name
    pub segment: String,
    /// Strand the segment is read on
    pub strand: Strand,
}

impl Anchor {
    fn parse(reference: &str) -> Option<Self> {
        let (&symbol, name) = reference.as_bytes().split_last()?;
        let strand = Strand::from_symbol(symbol)?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            segment: reference[..reference.len() - 1].to_string(),
            strand,
        })
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.segment, self.strand)
    }
}

/// A gap together with the oriented sequences of its flanks
#[derive(Debug, Clone)]
pub struct Gap {
    /// Position among the gaps of the graph
    pub index: usize,
    /// Line of the input graph, 1-based
    pub line: usize,
    /// Left flank end
    pub left: Anchor,
    /// Right flank start
    pub right: Anchor,
    /// Estimated distance, `None` when unknown
    pub distance: Option<u64>,
    /// Variance of the distance, if given
    pub variance: Option<u64>,
    /// Left segment as read towards the gap
    pub left_flank: Vec<u8>,
    /// Right segment as read away from the gap
    pub right_flank: Vec<u8>,
}

impl Gap {
    /// Identifier used in names and summaries
    pub fn label(&self) -> String {
        format!("{}_{}", self.left, self.right)
    }
}

#[derive(Debug, Clone)]
struct Segment {
    length: usize,
    sequence: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct GapLine {
    line: usize,
    raw: String,
    left: Anchor,
    right: Anchor,
    distance: Option<u64>,
    variance: Option<u64>,
}

#[derive(Debug, Clone)]
enum Line {
    Header(String),
    Gap(usize),
    Verbatim(String),
}

/// Accepted filled sequence as it is written in the output graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledSegment {
    /// Name of the new segment
    pub name: String,
    /// Sequence in the forward (left to right) frame
    pub sequence: Vec<u8>,
    /// Orientation the sequence was assembled in
    pub orientation: Orientation,
    /// Combination that produced it
    pub combination: ParameterCombination,
    /// Grade it was accepted with
    pub grade: QualityGrade,
}

impl FilledSegment {
    /// Segment named after gap `index`, its anchors and the accepting combination. The index keeps
    /// apart gaps joining the same anchors.
    pub fn new(index: usize, label: &str, fill: &Fill) -> Self {
        let name = format!(
            "{}.g{}.{}.{}",
            label,
            index + 1,
            fill.candidate.combination,
            fill.candidate.orientation.tag()
        );
        Self {
            name,
            sequence: genomic::forward_frame(&fill.candidate.seq, fill.candidate.orientation)
                .into_owned(),
            orientation: fill.candidate.orientation,
            combination: fill.candidate.combination,
            grade: fill.grade.clone(),
        }
    }
}

/// Segments, gaps and every other line of a GFA 2.0 graph, plus accepted fills keyed by gap.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    lines: Vec<Line>,
    segments: HashMap<String, Segment>,
    gaps: Vec<GapLine>,
    fills: BTreeMap<usize, FilledSegment>,
}

impl AssemblyGraph {
    /// Reads a graph file. `UR:Z:` sequence paths are resolved relative to its directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(BufReader::new(File::open(path)?), &base_dir)
    }

    /// Parses graph lines
    pub fn parse<R: BufRead>(rdr: R, base_dir: &Path) -> Result<Self> {
        let mut graph = AssemblyGraph::default();
        let mut sequence_files: HashMap<String, (usize, PathBuf)> = HashMap::new();

        for (i, line) in rdr.lines().enumerate() {
            let line_no = i + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = line.split('\t').collect::<Vec<_>>();
            match fields[0] {
                "H" => {
                    if let Some(version) = fields.iter().find_map(|f| f.strip_prefix("VN:Z:")) {
                        if !version.starts_with('2') {
                            return Err(Error::MalformedLine(
                                line_no,
                                format!("only GFA 2.0 is supported, found version {}", version),
                            ));
                        }
                    }
                    graph.lines.push(Line::Header(line));
                }
                "S" => {
                    let (name, segment, ur) = parse_segment(&fields, line_no)?;
                    if graph.segments.contains_key(&name) {
                        return Err(Error::MalformedLine(
                            line_no,
                            format!("segment `{}` defined twice", name),
                        ));
                    }
                    if let Some(ur) = ur {
                        sequence_files.insert(name.clone(), (line_no, base_dir.join(ur)));
                    }
                    graph.segments.insert(name, segment);
                    graph.lines.push(Line::Verbatim(line));
                }
                "G" => {
                    let gap = parse_gap(&fields, line_no, line.clone())?;
                    graph.lines.push(Line::Gap(graph.gaps.len()));
                    graph.gaps.push(gap);
                }
                _ => graph.lines.push(Line::Verbatim(line)),
            }
        }

        graph.load_sequences(sequence_files)?;
        for gap in &graph.gaps {
            for anchor in &[&gap.left, &gap.right] {
                if !graph.segments.contains_key(&anchor.segment) {
                    return Err(Error::UnknownSegment(anchor.segment.clone()));
                }
            }
        }
        debug!(
            "Parsed graph with {} segments and {} gaps",
            graph.segments.len(),
            graph.gaps.len()
        );
        Ok(graph)
    }

    fn load_sequences(&mut self, files: HashMap<String, (usize, PathBuf)>) -> Result<()> {
        let mut cache: HashMap<PathBuf, HashMap<String, Vec<u8>>> = HashMap::new();
        for (name, (line_no, path)) in files {
            if !path.exists() {
                return Err(Error::FileNotFound(path));
            }
            if !cache.contains_key(&path) {
                let records = genomic::read_fasta(&path)?;
                cache.insert(path.clone(), records);
            }
            let records = &cache[&path];
            let sequence = match records.get(&name) {
                Some(seq) => seq.clone(),
                None if records.len() == 1 => records.values().next().cloned().unwrap_or_default(),
                None => {
                    return Err(Error::MalformedLine(
                        line_no,
                        format!("`{}` not found in {}", name, path.display()),
                    ))
                }
            };
            if let Some(segment) = self.segments.get_mut(&name) {
                if segment.length != sequence.len() {
                    warn!(
                        "Segment {} declares {} bp but its sequence has {} bp",
                        name,
                        segment.length,
                        sequence.len()
                    );
                }
                segment.sequence = Some(sequence);
            }
        }
        Ok(())
    }

    /// Number of gap lines
    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }

    /// Index of the first gap at or after `line` (1-based) of the input graph
    pub fn gap_index_at_line(&self, line: usize) -> usize {
        self.gaps
            .iter()
            .position(|gap| gap.line >= line)
            .unwrap_or_else(|| self.gaps.len())
    }

    /// Gaps with their oriented flanking sequences, in input order
    pub fn gaps(&self) -> Result<Vec<Gap>> {
        self.gaps
            .iter()
            .enumerate()
            .map(|(index, gap)| {
                let left = self.sequence(&gap.left.segment)?;
                let right = self.sequence(&gap.right.segment)?;
                Ok(Gap {
                    index,
                    line: gap.line,
                    left: gap.left.clone(),
                    right: gap.right.clone(),
                    distance: gap.distance,
                    variance: gap.variance,
                    left_flank: oriented(left, gap.left.strand).into_owned(),
                    right_flank: oriented(right, gap.right.strand).into_owned(),
                })
            })
            .collect()
    }

    fn sequence(&self, name: &str) -> Result<&[u8]> {
        self.segments
            .get(name)
            .ok_or_else(|| Error::UnknownSegment(name.to_string()))?
            .sequence
            .as_deref()
            .ok_or_else(|| Error::MissingSequence(name.to_string()))
    }

    /// Records the outcome of gap `index`. Filling a gap again replaces its previous fill, so
    /// merging the same result twice leaves the graph unchanged.
    pub fn merge(&mut self, index: usize, label: &str, result: &GapResult) {
        if index >= self.gaps.len() {
            warn!("No gap at index {}, result for {} dropped", index, label);
            return;
        }
        if let GapResult::Filled { fill, .. } = result {
            self.fills.insert(index, FilledSegment::new(index, label, fill));
        }
    }

    /// Filled segment of gap `index`
    pub fn fill(&self, index: usize) -> Option<&FilledSegment> {
        self.fills.get(&index)
    }

    /// Number of gaps that received a fill
    pub fn filled_count(&self) -> usize {
        self.fills.len()
    }

    /// Writes the graph. Unresolved gaps keep their `G` line, filled ones become a segment linked
    /// to both flanks by two edges.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        if !self.lines.iter().any(|line| matches!(line, Line::Header(_))) {
            writeln!(out, "{}", GFA_HEADER)?;
        }
        for line in &self.lines {
            match line {
                Line::Header(raw) | Line::Verbatim(raw) => writeln!(out, "{}", raw)?,
                Line::Gap(index) => match self.fills.get(index) {
                    Some(fill) => self.write_fill(out, &self.gaps[*index], fill)?,
                    None => writeln!(out, "{}", self.gaps[*index].raw)?,
                },
            }
        }
        Ok(())
    }

    fn write_fill<W: Write>(&self, out: &mut W, gap: &GapLine, fill: &FilledSegment) -> Result<()> {
        let len = fill.sequence.len();
        let ext = fill.combination.extension.min(len);
        writeln!(
            out,
            "S\t{}\t{}\t{}",
            fill.name,
            len,
            String::from_utf8(fill.sequence.clone())?
        )?;

        let left_len = self.segment_length(&gap.left.segment);
        let (left_beg, left_end) = match gap.left.strand {
            Strand::Forward => (left_len.saturating_sub(ext), left_len),
            Strand::Reverse => (0, ext.min(left_len)),
        };
        writeln!(
            out,
            "E\t*\t{}\t{}+\t{}\t{}\t{}\t{}\t*",
            gap.left,
            fill.name,
            position(left_beg, left_len),
            position(left_end, left_len),
            position(0, len),
            position(ext, len),
        )?;

        let right_len = self.segment_length(&gap.right.segment);
        let (right_beg, right_end) = match gap.right.strand {
            Strand::Forward => (0, ext.min(right_len)),
            Strand::Reverse => (right_len.saturating_sub(ext), right_len),
        };
        writeln!(
            out,
            "E\t*\t{}+\t{}\t{}\t{}\t{}\t{}\t*",
            fill.name,
            gap.right,
            position(len - ext, len),
            position(len, len),
            position(right_beg, right_len),
            position(right_end, right_len),
        )?;
        Ok(())
    }

    fn segment_length(&self, name: &str) -> usize {
        self.segments.get(name).map_or(0, |segment| segment.length)
    }
}

/// GFA 2.0 position, `$` marking the end of the segment
fn position(pos: usize, len: usize) -> String {
    if pos == len {
        format!("{}$", pos)
    } else {
        pos.to_string()
    }
}

fn parse_segment(fields: &[&str], line_no: usize) -> Result<(String, Segment, Option<String>)> {
    if fields.len() < 4 {
        return Err(Error::MalformedLine(
            line_no,
            "segment needs an id, a length and a sequence".to_string(),
        ));
    }
    let length = fields[2]
        .parse::<usize>()
        .map_err(|_| Error::MalformedLine(line_no, format!("invalid length `{}`", fields[2])))?;
    let sequence = match fields[3] {
        "*" => None,
        seq => Some(seq.as_bytes().to_vec()),
    };
    let ur = fields[4..]
        .iter()
        .find_map(|tag| tag.strip_prefix("UR:Z:"))
        .map(str::to_string);
    Ok((fields[1].to_string(), Segment { length, sequence }, ur))
}

fn parse_gap(fields: &[&str], line_no: usize, raw: String) -> Result<GapLine> {
    if fields.len() < 6 {
        return Err(Error::MalformedLine(
            line_no,
            "gap needs an id, two references, a distance and a variance".to_string(),
        ));
    }
    let anchor = |field: &str| {
        Anchor::parse(field).ok_or_else(|| {
            Error::MalformedLine(line_no, format!("invalid segment reference `{}`", field))
        })
    };
    let left = anchor(fields[2])?;
    let right = anchor(fields[3])?;
    if left == right {
        return Err(Error::MalformedLine(
            line_no,
            "gap must join two distinct anchors".to_string(),
        ));
    }
    let distance = match fields[4] {
        "*" => None,
        value => {
            let distance = value.parse::<i64>().map_err(|_| {
                Error::MalformedLine(line_no, format!("invalid distance `{}`", value))
            })?;
            if distance < 0 {
                warn!(
                    "Negative distance {} on line {} is treated as unknown",
                    distance, line_no
                );
                None
            } else {
                Some(distance as u64)
            }
        }
    };
    let variance = match fields[5] {
        "*" => None,
        value => Some(value.parse::<u64>().map_err(|_| {
            Error::MalformedLine(line_no, format!("invalid variance `{}`", value))
        })?),
    };
    Ok(GapLine {
        line: line_no,
        raw,
        left,
        right,
        distance,
        variance,
    })
}

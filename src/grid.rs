use std::{cmp::Ordering, fmt};

/// One local assembly setting: _k_-mer size, solid _k_-mer abundance threshold and the derived
/// extension size (bases trimmed on each flank before picking the anchors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterCombination {
    /// _k_-mer size
    pub k: usize,
    /// Minimal abundance of solid _k_-mers
    pub abundance: u32,
    /// Bases of each flank included in the filled sequence
    pub extension: usize,
}

/// Ordered by `k` then `abundance`; the search runs from the greatest combination down
impl Ord for ParameterCombination {
    fn cmp(&self, other: &Self) -> Ordering {
        self.k
            .cmp(&other.k)
            .then(self.abundance.cmp(&other.abundance))
            .then(self.extension.cmp(&other.extension))
    }
}

impl PartialOrd for ParameterCombination {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}.a{}", self.k, self.abundance)
    }
}

/// Grid of combinations enumerated by descending _k_-mer size, then descending abundance.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    kmers: Vec<usize>,
    abundances: Vec<u32>,
    extension: Option<usize>,
    force: bool,
}

impl ParameterGrid {
    /// Duplicated values are visited once. Without an `extension` each combination extends by
    /// its own `k`.
    pub fn new(kmers: &[usize], abundances: &[u32], extension: Option<usize>, force: bool) -> Self {
        let mut kmers = kmers.to_vec();
        kmers.sort_unstable_by(|a, b| b.cmp(a));
        kmers.dedup();
        let mut abundances = abundances.to_vec();
        abundances.sort_unstable_by(|a, b| b.cmp(a));
        abundances.dedup();
        Self {
            kmers,
            abundances,
            extension,
            force,
        }
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.kmers.len() * self.abundances.len()
    }

    /// True when either list is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether stopping the cursor is ignored
    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Combination at position `idx` of the enumeration
    pub fn get(&self, idx: usize) -> Option<ParameterCombination> {
        if idx >= self.len() {
            return None;
        }
        let k = self.kmers[idx / self.abundances.len()];
        let abundance = self.abundances[idx % self.abundances.len()];
        Some(ParameterCombination {
            k,
            abundance,
            extension: self.extension.unwrap_or(k),
        })
    }

    /// Fresh cursor at the first (most conservative) combination
    pub fn cursor(&self) -> GridCursor<'_> {
        GridCursor {
            grid: self,
            next: 0,
            stopped: false,
        }
    }
}

/// Restartable position within a [`ParameterGrid`]
#[derive(Debug, Clone)]
pub struct GridCursor<'a> {
    grid: &'a ParameterGrid,
    next: usize,
    stopped: bool,
}

impl<'a> GridCursor<'a> {
    /// Ends the enumeration early, unless the grid is forced
    pub fn stop(&mut self) {
        if !self.grid.force {
            self.stopped = true;
        }
    }
}

impl<'a> Iterator for GridCursor<'a> {
    type Item = ParameterCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        let combination = self.grid.get(self.next)?;
        self.next += 1;
        Some(combination)
    }
}

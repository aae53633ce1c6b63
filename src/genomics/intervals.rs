use std::collections::HashMap;

use rust_lapper::{Interval, Lapper};

use super::LocusInterval;

/// Union of locus intervals, indexed per contig for point queries.
#[derive(Debug, Default)]
pub struct IntervalSet {
    contigs: HashMap<String, Lapper<u64, usize>>,
}

impl IntervalSet {
    /// Build the union of `intervals`. Each stored interval remembers its
    /// position in the input slice.
    pub fn new<'a, I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = &'a LocusInterval>,
    {
        let mut grouped: HashMap<String, Vec<Interval<u64, usize>>> = HashMap::new();
        for (idx, interval) in intervals.into_iter().enumerate() {
            let Some((start, stop)) = interval.span() else {
                continue;
            };
            grouped
                .entry(interval.contig.clone())
                .or_default()
                .push(Interval {
                    start,
                    stop,
                    val: idx,
                });
        }

        let contigs = grouped
            .into_iter()
            .map(|(contig, ivs)| (contig, Lapper::new(ivs)))
            .collect();
        Self { contigs }
    }

    /// Whether any interval contains the 1-based `position` on `contig`.
    pub fn contains(&self, contig: &str, position: u32) -> bool {
        let pos = position as u64;
        self.contigs
            .get(contig)
            .map_or(false, |lapper| lapper.find(pos, pos + 1).next().is_some())
    }

    /// Indices of the intervals containing the position, ascending.
    pub fn matching(&self, contig: &str, position: u32) -> Vec<usize> {
        let pos = position as u64;
        let mut hits: Vec<usize> = self
            .contigs
            .get(contig)
            .map(|lapper| lapper.find(pos, pos + 1).map(|iv| iv.val).collect())
            .unwrap_or_default();
        hits.sort_unstable();
        hits
    }

    /// Whether the set holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }
}

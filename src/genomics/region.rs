//! Ordered `(label, interval)` lists driving region extraction.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::{IntervalSet, LocusInterval, LocusParseError};

const CARDIAC_PANEL: &str = include_str!("../../data/cardiac_panel.tsv");

/// Errors raised while building a region list.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Label was empty or unusable as a file name component.
    #[error("invalid region label '{0}'")]
    InvalidLabel(String),

    /// The same label appeared twice.
    #[error("duplicate region label '{0}'")]
    DuplicateLabel(String),

    /// Interval text could not be parsed.
    #[error("region '{label}': {source}")]
    Interval {
        /// Label the interval belongs to.
        label: String,
        /// Underlying parse failure.
        #[source]
        source: LocusParseError,
    },

    /// A TSV line did not have exactly two columns.
    #[error("line {line}: expected `label<TAB>interval`, found {found:?}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending line content.
        found: String,
    },

    /// Region file could not be read.
    #[error("failed to read region file: {0}")]
    Io(#[from] std::io::Error),
}

/// A labelled genomic region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Unique label, used to name output files.
    pub label: String,
    /// Interval the label covers.
    pub interval: LocusInterval,
}

/// Ordered list of uniquely labelled regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionList {
    regions: Vec<Region>,
}

impl RegionList {
    /// Build a list from `(label, interval)` string pairs.
    pub fn from_pairs<L, I>(pairs: impl IntoIterator<Item = (L, I)>) -> Result<Self, RegionError>
    where
        L: AsRef<str>,
        I: AsRef<str>,
    {
        let mut list = RegionList::default();
        for (label, interval) in pairs {
            let label = label.as_ref().trim();
            let interval =
                LocusInterval::parse(interval.as_ref()).map_err(|source| RegionError::Interval {
                    label: label.to_string(),
                    source,
                })?;
            list.push(label, interval)?;
        }
        Ok(list)
    }

    /// Parse `label<TAB>interval` lines; `#` comments and blank lines are skipped.
    pub fn parse_tsv(text: &str) -> Result<Self, RegionError> {
        let mut pairs = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(label), Some(interval), None) => pairs.push((label, interval)),
                _ => {
                    return Err(RegionError::Malformed {
                        line: idx + 1,
                        found: line.to_string(),
                    })
                }
            }
        }
        Self::from_pairs(pairs)
    }

    /// Load a region TSV from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegionError> {
        let text = fs::read_to_string(path)?;
        Self::parse_tsv(&text)
    }

    /// The 80-gene cardiomyopathy panel (GRCh38 coordinates).
    pub fn cardiac_panel() -> Result<Self, RegionError> {
        Self::parse_tsv(CARDIAC_PANEL)
    }

    /// Append a region, enforcing label rules.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        interval: LocusInterval,
    ) -> Result<(), RegionError> {
        let label = label.into();
        if !is_valid_label(&label) {
            return Err(RegionError::InvalidLabel(label));
        }
        if self.regions.iter().any(|region| region.label == label) {
            return Err(RegionError::DuplicateLabel(label));
        }
        self.regions.push(Region { label, interval });
        Ok(())
    }

    /// Regions in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Union of every interval in the list.
    pub fn union(&self) -> IntervalSet {
        IntervalSet::new(self.regions.iter().map(|region| &region.interval))
    }

    /// Render back to `label<TAB>interval` lines using the canonical bracket form.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for region in &self.regions {
            out.push_str(&region.label);
            out.push('\t');
            out.push_str(&region.interval.to_string());
            out.push('\n');
        }
        out
    }

    /// Set of labels.
    pub fn labels(&self) -> HashSet<&str> {
        self.regions.iter().map(|r| r.label.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label != "."
        && label != ".."
        && !label
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | ':'))
}

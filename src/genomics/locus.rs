//! Genomic coordinates and locus intervals.
//!
//! Interval strings follow the conventions used by Hail's
//! `parse_locus_interval`: `chr1:100-200` is start-inclusive and
//! end-exclusive unless brackets say otherwise.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Largest position accepted for the `end` keyword and whole-contig intervals.
pub const MAX_POSITION: u32 = u32::MAX;

/// Errors raised while parsing loci and intervals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocusParseError {
    /// Input was empty after trimming.
    #[error("empty locus interval")]
    Empty,

    /// A position component was not a positive integer or keyword.
    #[error("invalid position '{0}'")]
    InvalidPosition(String),

    /// The end of the interval names another contig.
    #[error("interval spans contigs '{start}' and '{end}'")]
    CrossContig {
        /// Contig of the start bound.
        start: String,
        /// Contig of the end bound.
        end: String,
    },

    /// The bounds describe no positions.
    #[error("empty interval {0}")]
    EmptyInterval(String),

    /// Unbalanced or misplaced brackets.
    #[error("malformed interval '{0}'")]
    Malformed(String),
}

/// A `(contig, position)` coordinate. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locus {
    /// Contig name, e.g. `chr1`.
    pub contig: String,
    /// 1-based position.
    pub position: u32,
}

impl Locus {
    /// Construct a new locus.
    pub fn new(contig: impl Into<String>, position: u32) -> Self {
        Self {
            contig: contig.into(),
            position,
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.position)
    }
}

impl FromStr for Locus {
    type Err = LocusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (contig, pos) = s
            .rsplit_once(':')
            .ok_or_else(|| LocusParseError::Malformed(s.to_string()))?;
        if contig.is_empty() {
            return Err(LocusParseError::Malformed(s.to_string()));
        }
        Ok(Locus::new(contig, parse_position(pos)?))
    }
}

/// Contiguous range of positions on a single contig.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocusInterval {
    /// Contig name.
    pub contig: String,
    /// First bound (1-based).
    pub start: u32,
    /// Second bound (1-based).
    pub end: u32,
    /// Whether `start` itself is part of the interval.
    pub includes_start: bool,
    /// Whether `end` itself is part of the interval.
    pub includes_end: bool,
}

impl LocusInterval {
    /// Construct an interval, rejecting bounds that contain no position.
    pub fn new(
        contig: impl Into<String>,
        start: u32,
        end: u32,
        includes_start: bool,
        includes_end: bool,
    ) -> Result<Self, LocusParseError> {
        let interval = Self {
            contig: contig.into(),
            start,
            end,
            includes_start,
            includes_end,
        };
        if interval.first_position() > interval.last_position() || interval.span().is_none() {
            return Err(LocusParseError::EmptyInterval(interval.to_string()));
        }
        Ok(interval)
    }

    /// Interval covering an entire contig.
    pub fn whole_contig(contig: impl Into<String>) -> Self {
        Self {
            contig: contig.into(),
            start: 1,
            end: MAX_POSITION,
            includes_start: true,
            includes_end: true,
        }
    }

    /// Parse an interval string (see module docs for accepted forms).
    pub fn parse(input: &str) -> Result<Self, LocusParseError> {
        input.parse()
    }

    /// Lowest contained position.
    pub fn first_position(&self) -> u64 {
        self.start as u64 + u64::from(!self.includes_start)
    }

    /// Highest contained position.
    pub fn last_position(&self) -> u64 {
        (self.end as u64).saturating_sub(u64::from(!self.includes_end))
    }

    /// Half-open `[first, last + 1)` range of contained positions.
    pub fn span(&self) -> Option<(u64, u64)> {
        let first = self.first_position();
        let last = self.last_position();
        if first == 0 || first > last {
            None
        } else {
            Some((first, last + 1))
        }
    }

    /// Whether the 1-based `position` on `contig` lies inside the interval.
    pub fn contains(&self, contig: &str, position: u32) -> bool {
        if contig != self.contig {
            return false;
        }
        let pos = position as u64;
        pos >= self.first_position() && pos <= self.last_position()
    }

    /// Whether the locus lies inside the interval.
    pub fn contains_locus(&self, locus: &Locus) -> bool {
        self.contains(&locus.contig, locus.position)
    }
}

impl fmt::Display for LocusInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}-{}{}",
            if self.includes_start { '[' } else { '(' },
            self.contig,
            self.start,
            self.end,
            if self.includes_end { ']' } else { ')' },
        )
    }
}

impl FromStr for LocusInterval {
    type Err = LocusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(LocusParseError::Empty);
        }

        let (body, open, close) = strip_brackets(raw)?;

        let (contig, range) = match body.split_once(':') {
            Some((contig, range)) => (contig, Some(range)),
            None => (body, None),
        };
        if contig.is_empty() {
            return Err(LocusParseError::Malformed(raw.to_string()));
        }

        let Some(range) = range else {
            if open.is_some() || close.is_some() {
                return Err(LocusParseError::Malformed(raw.to_string()));
            }
            return Ok(LocusInterval::whole_contig(contig));
        };

        let (start_text, end_text) = match range.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (range, None),
        };
        let start = parse_position(start_text)?;

        let Some(end_text) = end_text else {
            // A single position is always closed on both sides.
            return LocusInterval::new(contig, start, start, true, true);
        };

        let end_text = match end_text.split_once(':') {
            Some((end_contig, end_pos)) => {
                if end_contig != contig {
                    return Err(LocusParseError::CrossContig {
                        start: contig.to_string(),
                        end: end_contig.to_string(),
                    });
                }
                end_pos
            }
            None => end_text,
        };
        let end = parse_position(end_text)?;

        let includes_start = open.map_or(true, |c| c == '[');
        let includes_end = close.map_or(end == MAX_POSITION, |c| c == ']');
        LocusInterval::new(contig, start, end, includes_start, includes_end)
    }
}

fn strip_brackets(raw: &str) -> Result<(&str, Option<char>, Option<char>), LocusParseError> {
    let first = raw.chars().next();
    let last = raw.chars().last();
    let open = first.filter(|c| matches!(c, '[' | '('));
    let close = last.filter(|c| matches!(c, ']' | ')'));
    if open.is_some() != close.is_some() {
        return Err(LocusParseError::Malformed(raw.to_string()));
    }
    let body = match (open, close) {
        (Some(_), Some(_)) if raw.len() >= 2 => &raw[1..raw.len() - 1],
        (Some(_), Some(_)) => return Err(LocusParseError::Malformed(raw.to_string())),
        _ => raw,
    };
    if body.contains(['[', ']', '(', ')']) {
        return Err(LocusParseError::Malformed(raw.to_string()));
    }
    Ok((body.trim(), open, close))
}

fn parse_position(text: &str) -> Result<u32, LocusParseError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("start") {
        return Ok(1);
    }
    if text.eq_ignore_ascii_case("end") {
        return Ok(MAX_POSITION);
    }
    match text.parse::<u32>() {
        Ok(0) | Err(_) => Err(LocusParseError::InvalidPosition(text.to_string())),
        Ok(pos) => Ok(pos),
    }
}

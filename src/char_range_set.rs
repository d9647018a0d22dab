//! Module with the character range set, an algebraic set of inclusive code point intervals.
//!
//! A [CharRangeSet] is the guard of a node in the compiled graph. An empty set denotes an
//! epsilon transition. The canonical form of a set is a list of sorted, pairwise disjoint and
//! non-adjacent intervals. Every operation returns a set in canonical form.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: u32 = 0x10FFFF;

/// An inclusive range of code points.
/// A range with `begin > end` is empty and is dropped by normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeRange {
    /// The first code point of the range.
    pub begin: u32,
    /// The last code point of the range.
    pub end: u32,
}

impl CodeRange {
    /// Create a new range.
    #[inline]
    pub const fn new(begin: u32, end: u32) -> Self {
        CodeRange { begin, end }
    }

    /// Create a range that contains exactly one character.
    #[inline]
    pub const fn single(c: char) -> Self {
        CodeRange {
            begin: c as u32,
            end: c as u32,
        }
    }

    /// Returns true if the range contains no code point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin > self.end
    }

    /// Returns true if the range contains the given code point.
    #[inline]
    pub fn contains(&self, code: u32) -> bool {
        self.begin <= code && code <= self.end
    }

    /// Returns true if both ranges share at least one code point.
    #[inline]
    pub fn overlaps(&self, other: &CodeRange) -> bool {
        self.begin <= other.end && self.end >= other.begin
    }

    /// The number of code points in the range.
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.begin) as usize + 1
        }
    }
}

impl From<char> for CodeRange {
    fn from(c: char) -> Self {
        CodeRange::single(c)
    }
}

impl From<std::ops::RangeInclusive<char>> for CodeRange {
    fn from(range: std::ops::RangeInclusive<char>) -> Self {
        CodeRange::new(*range.start() as u32, *range.end() as u32)
    }
}

/// A set of code points stored as sorted, disjoint, non-adjacent inclusive intervals.
/// Deserialized sets are normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawCharRangeSet"))]
pub struct CharRangeSet {
    ranges: Vec<CodeRange>,
}

// The serialized form of a set, possibly not normalized.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawCharRangeSet {
    ranges: Vec<CodeRange>,
}

#[cfg(feature = "serde")]
impl From<RawCharRangeSet> for CharRangeSet {
    fn from(raw: RawCharRangeSet) -> Self {
        CharRangeSet::new(raw.ranges)
    }
}

impl CharRangeSet {
    /// Create a new set from arbitrary ranges. The result is normalized.
    pub fn new<I, R>(ranges: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<CodeRange>,
    {
        let mut set = CharRangeSet {
            ranges: ranges.into_iter().map(Into::into).collect(),
        };
        set.normalize();
        set
    }

    /// The empty set. As a node guard it denotes an epsilon transition.
    #[inline]
    pub fn empty() -> Self {
        CharRangeSet { ranges: Vec::new() }
    }

    /// The set of all code points.
    #[inline]
    pub fn full() -> Self {
        CharRangeSet {
            ranges: vec![CodeRange::new(0, CODE_POINT_MAX)],
        }
    }

    /// A set with exactly one character.
    #[inline]
    pub fn from_char(c: char) -> Self {
        CharRangeSet {
            ranges: vec![CodeRange::single(c)],
        }
    }

    /// A set with all characters from `begin` to `end`, both inclusive.
    pub fn from_range(begin: char, end: char) -> Self {
        CharRangeSet::new([CodeRange::new(begin as u32, end as u32)])
    }

    /// Get the normalized ranges of the set.
    #[inline]
    pub fn ranges(&self) -> &[CodeRange] {
        &self.ranges
    }

    /// Returns true if the set contains no code point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The number of code points in the set.
    pub fn size(&self) -> usize {
        self.ranges.iter().map(CodeRange::len).sum()
    }

    /// Sort the ranges, merge overlapping and adjacent ones and drop empty ones.
    pub fn normalize(&mut self) {
        self.ranges.retain(|r| !r.is_empty());
        self.ranges.sort_unstable();
        let mut merged: Vec<CodeRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if range.begin <= last.end.saturating_add(1) => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }

    /// Returns true if the set contains the given character.
    #[inline]
    pub fn includes(&self, c: char) -> bool {
        self.includes_code(c as u32)
    }

    /// Returns true if the set contains the given code point.
    pub fn includes_code(&self, code: u32) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.end < code {
                    std::cmp::Ordering::Less
                } else if r.begin > code {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The set of code points in `self` or in `other`.
    pub fn union(&self, other: &CharRangeSet) -> CharRangeSet {
        CharRangeSet::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// The set of code points in both `self` and `other`.
    pub fn intersection(&self, other: &CharRangeSet) -> CharRangeSet {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = self.ranges[i];
            let b = other.ranges[j];
            if a.overlaps(&b) {
                result.push(CodeRange::new(a.begin.max(b.begin), a.end.min(b.end)));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        CharRangeSet::new(result)
    }

    /// The set of code points in `self` but not in `other`.
    pub fn difference(&self, other: &CharRangeSet) -> CharRangeSet {
        let mut result = Vec::new();
        for range in &self.ranges {
            let mut begin = range.begin;
            let mut covered = false;
            for sub in &other.ranges {
                if sub.end < begin {
                    continue;
                }
                if sub.begin > range.end {
                    break;
                }
                if sub.begin > begin {
                    result.push(CodeRange::new(begin, sub.begin - 1));
                }
                if sub.end >= range.end {
                    covered = true;
                    break;
                }
                begin = sub.end + 1;
            }
            if !covered {
                result.push(CodeRange::new(begin, range.end));
            }
        }
        CharRangeSet::new(result)
    }

    /// Partition the union of both sets into `(self \ other, self ∩ other, other \ self)`.
    /// The three sets are pairwise disjoint.
    pub fn unique(&self, other: &CharRangeSet) -> (CharRangeSet, CharRangeSet, CharRangeSet) {
        (
            self.difference(other),
            self.intersection(other),
            other.difference(self),
        )
    }

    /// All code points not in the set.
    pub fn complement(&self) -> CharRangeSet {
        CharRangeSet::full().difference(self)
    }

    /// Returns true if every code point of `self` is in `other`.
    pub fn is_subset(&self, other: &CharRangeSet) -> bool {
        self.difference(other).is_empty()
    }

    /// Add the other ASCII case of every ASCII letter in the set.
    pub fn ascii_case_fold(&self) -> CharRangeSet {
        let lower = self.intersection(&CharRangeSet::from_range('a', 'z'));
        let upper = self.intersection(&CharRangeSet::from_range('A', 'Z'));
        let shift = |set: &CharRangeSet, up: bool| {
            set.ranges
                .iter()
                .map(|r| {
                    if up {
                        CodeRange::new(r.begin + 32, r.end + 32)
                    } else {
                        CodeRange::new(r.begin - 32, r.end - 32)
                    }
                })
                .collect::<Vec<_>>()
        };
        let mut ranges = self.ranges.clone();
        ranges.extend(shift(&lower, false));
        ranges.extend(shift(&upper, true));
        CharRangeSet::new(ranges)
    }
}

impl From<CodeRange> for CharRangeSet {
    fn from(range: CodeRange) -> Self {
        CharRangeSet::new([range])
    }
}

impl FromIterator<CodeRange> for CharRangeSet {
    fn from_iter<T: IntoIterator<Item = CodeRange>>(iter: T) -> Self {
        CharRangeSet::new(iter)
    }
}

/// Write a code point the way the pattern language reads it back. `specials` are escaped with a
/// backslash.
pub(crate) fn write_code_point(f: &mut impl fmt::Write, code: u32, specials: &str) -> fmt::Result {
    match char::from_u32(code) {
        Some('\n') => f.write_str("\\n"),
        Some('\r') => f.write_str("\\r"),
        Some('\t') => f.write_str("\\t"),
        Some('\0') => f.write_str("\\0"),
        Some(c) if specials.contains(c) => write!(f, "\\{}", c),
        Some(c) if c.is_ascii_graphic() || c == ' ' => write!(f, "{}", c),
        Some(c) if !c.is_control() && !c.is_whitespace() => write!(f, "{}", c),
        _ if code <= 0xFFFF => write!(f, "\\u{:04X}", code),
        _ => write!(f, "\\U{:08X}", code),
    }
}

impl fmt::Display for CharRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SPECIALS: &str = "[]\\-^";
        write!(f, "[")?;
        for range in &self.ranges {
            write_code_point(f, range.begin, SPECIALS)?;
            if range.end > range.begin {
                if range.end > range.begin + 1 {
                    write!(f, "-")?;
                }
                write_code_point(f, range.end, SPECIALS)?;
            }
        }
        write!(f, "]")
    }
}

//! Source location tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source text.
///
/// Both fields are zero-based. The column counts UTF-16 code units within the
/// line, which is how editors address text over the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based UTF-16 column.
    pub column: u32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A range inside a named source.
///
/// The end position is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// Identifier of the source the range points into.
    pub source: String,
    /// Start position (inclusive).
    pub start: Position,
    /// End position (exclusive).
    pub end: Position,
}

impl SourceRange {
    /// Create a new range.
    #[must_use]
    pub fn new(source: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            source: source.into(),
            start,
            end,
        }
    }

    /// Check whether `position` falls inside this range (end inclusive, so a
    /// cursor sitting right after an identifier still touches it).
    #[must_use]
    pub fn touches(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Check whether two ranges in the same source overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.source == other.source && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.source, self.start, self.end)
    }
}

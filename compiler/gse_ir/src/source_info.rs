//! Source locations attached to program nodes.

use std::fmt;
use std::sync::Arc;

/// A 1-based line/column position. Line 0 means "no location".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Position { line, col }
    }
}

/// Source info token carried by program nodes and runtime errors.
///
/// The empty source info (no file, line 0) is used for synthesized nodes
/// and for the global context, which has no call site of its own.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    pub file: Arc<str>,
    pub from: Position,
    pub to: Position,
}

impl SourceInfo {
    /// Create source info spanning `from..to` in `file`.
    pub fn new(file: impl Into<Arc<str>>, from: Position, to: Position) -> Self {
        SourceInfo {
            file: file.into(),
            from,
            to,
        }
    }

    /// Source info pointing at a single position.
    pub fn at(file: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        let pos = Position::new(line, col);
        SourceInfo::new(file, pos, pos)
    }

    /// The "no location" source info.
    pub fn empty() -> Self {
        SourceInfo {
            file: Arc::from(""),
            from: Position::default(),
            to: Position::default(),
        }
    }

    /// Whether this carries no location.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from.line == 0
    }

    /// First line covered, 0 when empty.
    #[inline]
    pub fn line(&self) -> u32 {
        self.from.line
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        SourceInfo::empty()
    }
}

impl fmt::Debug for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<unknown>");
        }
        write!(f, "{}:{}:{}", self.file, self.from.line, self.from.col)
    }
}

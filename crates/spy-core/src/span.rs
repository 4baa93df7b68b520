//! Source locations for diagnostics.
//!
//! [`Span`] marks where a declaration, expression or annotation starts in
//! the source module, so diagnostics can point at both ends of a type error.

use std::fmt;

/// A location in the source module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes of the underlined text.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span has no position information.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// Render the source line this span points at, underlined with `marker`.
    ///
    /// Returns `None` when the line is not part of `source`.
    pub fn underline(&self, source: &str, marker: char) -> Option<String> {
        let text = source.lines().nth(self.line.checked_sub(1)? as usize)?;
        let pad = " ".repeat(self.col.saturating_sub(1) as usize);
        let marks = marker.to_string().repeat(self.len.max(1) as usize);
        Some(format!("{text}\n{pad}{marks}"))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

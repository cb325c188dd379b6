//! Source position value type.
//!
//! Positions are produced by the lexer that feeds tokens into the tree. This
//! crate stores them on tokens and reports them back out through
//! [`source_pos`](crate::SyntaxTree::source_pos), but never computes or
//! adjusts them: after a mutation, positions describe where a token *came
//! from*, not where it will land in the reconstructed text.

use std::fmt;

/// Position of a token in the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourcePos {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub offset: usize,
}

impl SourcePos {
    /// Creates a position from its parts.
    #[must_use]
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_pos_display() {
        let pos = SourcePos::new(10, 5, 42);
        assert_eq!(pos.to_string(), "10:5");
    }

    #[test]
    fn test_source_pos_default_is_zero() {
        let pos = SourcePos::default();
        assert_eq!(pos, SourcePos::new(0, 0, 0));
    }
}

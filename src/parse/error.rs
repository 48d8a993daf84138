use std::fmt;

use crate::types::Pos;

/// Errors produced when parsing expressions or configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    filename: String,
    pos: Pos,
    message: String,
}

impl ParseError {
    pub(crate) fn new(filename: &str, pos: Pos, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_owned(),
            pos,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Line and column (both 1-based) where parsing failed.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.pos.line, self.pos.column)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at {}:{},{}: {}",
            self.filename, self.pos.line, self.pos.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

//! Error types for the masking engine
//!
//! Nothing in the engine is fatal. Problems found while compiling a mask are
//! recovered from and kept as diagnostics on the compiled spec; only the
//! explicitly fallible constructors return these errors directly.

use thiserror::Error;

/// The main error type for the masking engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// An inline `#{...}` section whose body is not a valid regular expression.
    /// The section text is kept as literal mask characters.
    #[error("invalid inline regex `{body}` at {span}: {message}")]
    InvalidRegexSection {
        /// Location of the whole `#{...}` section in the mask string
        span: Span,
        /// The regex body between the braces
        body: String,
        /// Message reported by the regex compiler
        message: String,
    },

    /// A `[` without a matching `]`; the rest of the mask became section content
    #[error("unterminated optional section starting at position {position}")]
    UnterminatedSection {
        /// Position of the opening bracket in the mask string
        position: usize,
    },

    /// A caller-supplied pattern rule whose regex failed to compile
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Message reported by the regex compiler
        message: String,
    },

    /// A preset name that does not exist
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}

impl MaskError {
    /// Whether this error was recovered from during compilation
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MaskError::InvalidRegexSection { .. } | MaskError::UnterminatedSection { .. }
        )
    }

    /// Where in the mask string the problem sits
    pub fn span(&self) -> Option<Span> {
        match self {
            MaskError::InvalidRegexSection { span, .. } => Some(*span),
            MaskError::UnterminatedSection { position } => Some(Span::single(*position)),
            MaskError::InvalidPattern { .. } | MaskError::UnknownPreset(_) => None,
        }
    }
}

/// A span of character positions in a mask string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (inclusive)
    pub start: usize,
    /// End position (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single character
    pub fn single(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// A line of `^` under the span, for printing below the mask string.
    /// An empty span still gets one marker.
    pub fn marker(&self) -> String {
        let width = if self.is_empty() { 1 } else { self.len() };
        format!("{}{}", " ".repeat(self.start), "^".repeat(width))
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Result type alias for masking operations
pub type Result<T> = std::result::Result<T, MaskError>;

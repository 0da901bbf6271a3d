//! Error types for xmlmap

use std::fmt;

/// Position in markup source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in markup source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// Error kind for detailed categorization
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Markup text could not be parsed
    #[error("syntax error")]
    Syntax,
    /// Input shape cannot be turned into a tree
    #[error("cannot construct tree")]
    Construction,
    /// A child with this exact tag already exists
    #[error("node {tag} already exists in tree")]
    DuplicateChild { tag: String },
    /// A scalar could not be parsed or formatted
    #[error("conversion error")]
    Conversion,
    /// Empty input given to a time, date or datetime conversion
    #[error("empty value not allowed")]
    EmptyValue,
    /// Malformed argument, e.g. a list where element content is expected
    #[error("invalid argument")]
    Argument,
    /// Parser limit exceeded
    #[error("{limit} exceeded: {max}")]
    LimitExceeded { limit: &'static str, max: usize },
}

/// Main error type for xmlmap
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Option<Span>,
    message: String,
}

impl Error {
    /// Error whose message is the kind description
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span: None,
            message,
        }
    }

    /// Error with a custom message
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: None,
            message: message.into(),
        }
    }

    /// Syntax error at a specific source position
    pub fn syntax(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            span: Some(Span::at(pos)),
            message: message.into(),
        }
    }

    /// Scalar parse or format failure
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Conversion, message)
    }

    /// Malformed caller input
    pub fn argument(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Argument, message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "error at {}: {}", span.start, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for xmlmap
pub type Result<T> = std::result::Result<T, Error>;

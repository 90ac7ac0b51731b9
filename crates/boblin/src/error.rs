// ABOUTME: Error types for the boblin library.
// ABOUTME: Covers notation parsing, calculation settings, and computation limits.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty dice expression")]
    EmptyExpression,

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("Invalid dice count: {0}")]
    InvalidDiceCount(u32),

    #[error("Invalid dice sides: {0}")]
    InvalidDiceSides(u32),

    #[error("Number too large at position {0}")]
    NumberTooLarge(usize),

    #[error("Critical threshold must be between 2 and 20, got {0}")]
    InvalidCritThreshold(i64),

    #[error("Unknown advantage mode: {0}")]
    UnknownAdvantageMode(String),

    #[error("Invalid flag value: {0}")]
    InvalidFlag(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("{what} {value} exceeds the limit of {limit}")]
    ComputationOverflow {
        what: &'static str,
        value: usize,
        limit: usize,
    },
}

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dice notation could not be parsed.
    Parse,
    /// A calculation setting was out of range or missing.
    Config,
    /// The request would exceed the configured computation limits.
    Overflow,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyExpression
            | Error::UnexpectedChar(..)
            | Error::Expected { .. }
            | Error::InvalidDiceCount(_)
            | Error::InvalidDiceSides(_)
            | Error::NumberTooLarge(_) => ErrorKind::Parse,
            Error::InvalidCritThreshold(_)
            | Error::UnknownAdvantageMode(_)
            | Error::InvalidFlag(_)
            | Error::MissingSetting(_) => ErrorKind::Config,
            Error::ComputationOverflow { .. } => ErrorKind::Overflow,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

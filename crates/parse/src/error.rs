//! Parse Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A parse error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Everything except [`Io`](Self::Io) and [`Configuration`](Self::Configuration)
/// describes a source file that simply isn't a document: the crawler logs it
/// and moves on.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file has no header block at all.
    #[display("no header found")]
    NoHeader,
    /// A header block exists, but a field is missing or unparseable.
    #[display("invalid header field '{field}': {value}")]
    InvalidHeader {
        field: &'static str,
        #[error(not(source))]
        value: String,
    },
    /// The header names a document type that isn't registered.
    #[display("unknown document type: {_0}")]
    UnknownType(#[error(not(source))] String),
    /// A data file isn't a well-formed JSON, YAML or TOML object.
    #[display("malformed data file")]
    Malformed,
    /// The file could not be read.
    #[display("could not read {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The parser itself was configured with an unusable value.
    #[display("invalid parser configuration: {_0}")]
    Configuration(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` when the file should be skipped rather than counted as
    /// a failure.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NoHeader | Self::InvalidHeader { .. } | Self::UnknownType(_) | Self::Malformed)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

//! Error types for the [`render`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A render error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a render failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A catalog scan or update failed.
    #[display("catalog error")]
    Catalog,
    /// The template tree could not be loaded or compiled.
    #[display("could not load templates from {}", _0.display())]
    Load(#[error(not(source))] PathBuf),
    /// No template with this name was loaded.
    #[display("unknown template: {_0}")]
    MissingTemplate(#[error(not(source))] String),
    /// Rendering a template failed.
    #[display("could not render template: {_0}")]
    Template(#[error(not(source))] String),
    /// The document couldn't be turned into a template model.
    #[display("could not build template model")]
    Model,
    /// The output path is invalid or escapes the output directory.
    #[display("invalid output path: {_0}")]
    OutputPath(#[error(not(source))] String),
    /// Writing the rendered output failed.
    #[display("could not write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog | Self::Write(_))
    }
}

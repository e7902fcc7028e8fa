//! Error types for the [`crawl`](super) module.

use derive_more::{Display, Error};

/// A crawl error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a per-file crawl failure.
///
/// Files that simply aren't documents (no header, bad header, unknown type,
/// malformed data) are not failures: they're reported as
/// [`Outcome::Skipped`](super::Outcome::Skipped).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Walking the source tree failed for a directory or entry.
    #[display("source tree error")]
    Source,
    /// The parser could not read the file.
    #[display("parse error")]
    Parse,
    /// A catalog lookup or write failed.
    #[display("catalog error")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Source)
    }
}

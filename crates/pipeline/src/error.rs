//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The [`crawl`](crate::crawl) and
//! [`render`](crate::render) modules have their own, more specific kinds which
//! end up as children of these.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration can't be turned into a working pipeline.
    #[display("invalid pipeline configuration")]
    Configuration,
    /// The catalog could not be opened or prepared. Fatal for a bake.
    #[display("catalog unavailable")]
    Catalog,
    #[display("crawl failed")]
    Crawl,
    #[display("render failed")]
    Render,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog)
    }
}

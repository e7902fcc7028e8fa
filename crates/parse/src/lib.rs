//! Turning source files into [`DocumentModel`]s.
//!
//! Two parsers are provided, both behind the [`Parser`] trait so the crawler
//! can be handed anything else that knows how to read a document:
//!
//! - [`HeaderParser`] reads content files with a `key=value` header block
//!   terminated by a line of `~`.
//! - [`DataFileParser`] reads JSON, YAML and TOML data files into the
//!   attribute bag of a data document.
//!
//! A file that isn't a document at all is reported as an error for which
//! [`ErrorKind::is_skippable`](crate::error::ErrorKind::is_skippable) is true,
//! never as an empty result.

mod data;
pub mod error;
mod header;
pub mod models;

use bakery_source::file::SourceMeta;
use std::path::Path;

use crate::error::Result;
pub use crate::data::DataFileParser;
pub use crate::header::{CONTENT_EXTENSIONS, HeaderParser};
pub use crate::models::{DocumentModel, Status};

/// Reads one kind of source file.
///
/// Parsing is synchronous; the crawler runs it on the blocking thread pool.
pub trait Parser: Send + Sync {
    /// Cheap, path-only check for whether this parser handles a file.
    fn supports(&self, path: &Path) -> bool;

    /// Parse a file into its document model.
    fn parse(&self, file: &SourceMeta) -> Result<DocumentModel>;
}

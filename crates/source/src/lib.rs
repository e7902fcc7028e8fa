//! Source tree access for bakery.
//!
//! - [`fingerprint`] computes content digests for files and directory trees.
//! - [`Walker`] enumerates a source tree, honouring hidden-file and
//!   ignore-marker policy, as a [`Stream`](futures::Stream) of [`SourceFile`]s.
//! - [`source_uri`], [`root_path`] and [`validate_path`] derive the catalog
//!   keys and relative paths for a file.

pub mod error;
pub mod file;
pub mod fingerprint;
mod path;
mod walk;

pub use crate::file::SourceFile;
pub use crate::path::{root_path, source_uri, validate as validate_path};
pub use crate::walk::{SourceStream, Walker};

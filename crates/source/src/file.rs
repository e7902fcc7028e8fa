//! Source files discovered while walking a tree.
//!
//! A [`SourceFile`] starts out [`Discovered`] (no digest yet) and becomes
//! [`Fingerprinted`] once its content digest has been computed, so that the
//! crawler can't accidentally classify a file it never hashed.

use crate::fingerprint;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Metadata for a file found in a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMeta {
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Canonical catalog key, see [`source_uri`](crate::source_uri).
    pub source_uri: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl SourceMeta {
    /// Lower-cased file extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

mod sealed {
    pub trait Sealed {}
}
pub trait HashState: sealed::Sealed {
    type Hash;
}

pub struct Discovered;
impl sealed::Sealed for Discovered {}
impl HashState for Discovered {
    type Hash = ();
}

pub struct Fingerprinted;
impl sealed::Sealed for Fingerprinted {}
impl HashState for Fingerprinted {
    type Hash = String;
}

pub struct SourceFile<S: HashState = Discovered> {
    meta: SourceMeta,
    /// Content digest; empty if the file could not be read.
    pub content_hash: S::Hash,
}
impl<S: HashState> SourceFile<S> {
    pub fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    pub fn into_meta(self) -> SourceMeta {
        self.meta
    }
}
impl<S: HashState> Deref for SourceFile<S> {
    type Target = SourceMeta;
    fn deref(&self) -> &SourceMeta {
        &self.meta
    }
}
impl<S: HashState> std::fmt::Debug for SourceFile<S>
where
    S::Hash: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("meta", &self.meta)
            .field("content_hash", &self.content_hash)
            .finish()
    }
}
impl<S: HashState> Clone for SourceFile<S>
where
    S::Hash: Clone,
{
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            content_hash: self.content_hash.clone(),
        }
    }
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, source_uri: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        SourceMeta {
            path: path.into(),
            source_uri: source_uri.into(),
            size,
            modified,
        }
        .into()
    }

    pub fn with_hash(self, hash: impl Into<String>) -> SourceFile<Fingerprinted> {
        SourceFile {
            meta: self.meta,
            content_hash: hash.into(),
        }
    }

    /// Digest the file on the blocking thread pool. Never fails: an unreadable
    /// file gets an empty digest, see [`fingerprint::digest`].
    pub async fn fingerprint(self) -> SourceFile<Fingerprinted> {
        let hash = fingerprint::digest_async(self.meta.path.clone()).await;
        self.with_hash(hash)
    }
}
impl From<SourceMeta> for SourceFile<Discovered> {
    fn from(meta: SourceMeta) -> Self {
        Self { meta, content_hash: () }
    }
}
impl AsRef<Path> for SourceMeta {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

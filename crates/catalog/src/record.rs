use bakery_parse::{DocumentModel, Status};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// One catalogued source file.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    /// Path relative to its tree root, `/`-separated. Unique.
    pub source_uri: String,
    /// Content digest; empty if the file could not be fingerprinted.
    pub content_hash: String,
    pub doc_type: String,
    pub status: Status,
    /// Stored with second precision.
    pub date: OffsetDateTime,
    pub tags: BTreeSet<String>,
    /// Set by the render coordinator once output has been written.
    pub rendered: bool,
    /// Set on every record written by the crawler.
    pub cached: bool,
    pub root_path: Option<String>,
    pub uri: Option<String>,
    pub no_extension_uri: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub attributes: Map<String, Value>,
}
impl DocumentRecord {
    /// A fresh (unrendered, uncached) record for a parsed document. A model
    /// without a date takes `fallback_date`.
    pub fn from_model(
        source_uri: impl Into<String>,
        content_hash: impl Into<String>,
        model: DocumentModel,
        fallback_date: OffsetDateTime,
    ) -> Self {
        Self {
            source_uri: source_uri.into(),
            content_hash: content_hash.into(),
            doc_type: model.doc_type,
            status: model.status,
            date: model.date.unwrap_or(fallback_date),
            tags: model.tags,
            rendered: false,
            cached: false,
            root_path: None,
            uri: None,
            no_extension_uri: None,
            title: model.title,
            body: model.body,
            attributes: model.attributes,
        }
    }
}

/// What the catalog remembers about a source file, for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub content_hash: String,
    pub rendered: bool,
}

/// Outcome of comparing the template tree digest to the stored signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureChange {
    /// No signature was stored; it has been recorded.
    Created,
    /// The stored signature differed (or one side was empty) and has been
    /// overwritten.
    Changed { previous: String },
    Unchanged,
}
impl SignatureChange {
    /// Whether everything rendered so far must be invalidated.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

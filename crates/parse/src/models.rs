use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

/// Publication status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Draft,
    Published,
    /// Scheduled: becomes [`Published`](Self::Published) once the document
    /// date has passed.
    PublishedDate,
}
impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::PublishedDate => "published-date",
        }
    }

    /// Promote a scheduled document whose date is in the past.
    pub fn promote(self, date: OffsetDateTime, now: OffsetDateTime) -> Self {
        match self {
            Self::PublishedDate if date < now => Self::Published,
            status => status,
        }
    }
}
impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for Status {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "published-date" => Ok(Self::PublishedDate),
            other => Err(other.to_string()),
        }
    }
}

/// What a [`Parser`](crate::Parser) extracts from one source file.
///
/// The crawler augments this with everything derived from the file itself
/// (digest, source URI, output paths) before it's stored in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    pub doc_type: String,
    pub status: Status,
    pub title: Option<String>,
    /// `None` when the header has no date; the file's modification time is
    /// used instead.
    pub date: Option<OffsetDateTime>,
    pub tags: BTreeSet<String>,
    pub body: String,
    /// Every other header (or data file) key.
    pub attributes: Map<String, Value>,
}
impl DocumentModel {
    pub fn new(doc_type: impl Into<String>, status: Status) -> Self {
        Self {
            doc_type: doc_type.into(),
            status,
            title: None,
            date: None,
            tags: BTreeSet::new(),
            body: String::new(),
            attributes: Map::new(),
        }
    }
}

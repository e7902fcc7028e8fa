use crate::DocumentRecord;
use crate::error::{Error, ErrorKind};
use bakery_parse::Status;
use exn::{OptionExt, ResultExt};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Column list shared by every query that reads whole documents.
pub(crate) const DOCUMENT_COLUMNS: &str = "source_uri, content_hash, doc_type, status, date, tags, rendered, cached, \
     root_path, uri, no_extension_uri, title, body, attributes";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub(crate) source_uri: String,
    pub(crate) content_hash: String,
    pub(crate) doc_type: String,
    pub(crate) status: String,
    pub(crate) date: i64,
    pub(crate) tags: String,
    pub(crate) rendered: bool,
    pub(crate) cached: bool,
    pub(crate) root_path: Option<String>,
    pub(crate) uri: Option<String>,
    pub(crate) no_extension_uri: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) body: String,
    pub(crate) attributes: String,
}
impl TryFrom<&DocumentRecord> for DocumentRow {
    type Error = Error;
    fn try_from(record: &DocumentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            source_uri: record.source_uri.clone(),
            content_hash: record.content_hash.clone(),
            doc_type: record.doc_type.clone(),
            status: record.status.as_str().to_string(),
            date: record.date.unix_timestamp(),
            tags: serde_json::to_string(&record.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            rendered: record.rendered,
            cached: record.cached,
            root_path: record.root_path.clone(),
            uri: record.uri.clone(),
            no_extension_uri: record.no_extension_uri.clone(),
            title: record.title.clone(),
            body: record.body.clone(),
            attributes: serde_json::to_string(&record.attributes).or_raise(|| ErrorKind::InvalidData("attributes"))?,
        })
    }
}
impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = Error;
    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse::<Status>().ok().ok_or_raise(|| ErrorKind::InvalidData("status"))?,
            date: OffsetDateTime::from_unix_timestamp(row.date).or_raise(|| ErrorKind::InvalidData("date"))?,
            tags: serde_json::from_str::<BTreeSet<String>>(&row.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            attributes: serde_json::from_str(&row.attributes).or_raise(|| ErrorKind::InvalidData("attributes"))?,
            source_uri: row.source_uri,
            content_hash: row.content_hash,
            doc_type: row.doc_type,
            rendered: row.rendered,
            cached: row.cached,
            root_path: row.root_path,
            uri: row.uri,
            no_extension_uri: row.no_extension_uri,
            title: row.title,
            body: row.body,
        })
    }
}

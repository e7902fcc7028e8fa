//! Values handed to templates.
//!
//! Every page receives `config` (the whole [`Config`]), `root_path` (relative
//! path back to the output root) and `data` (the attribute bags of all data
//! documents, keyed by source URI without extension). Document pages get
//! every [`DocumentView`] field at the top level; listing pages get a list
//! of them.

use crate::render::error::{ErrorKind, Result};
use bakery_catalog::DocumentRecord;
use bakery_config::Config;
use exn::ResultExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;

/// One document, as templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView<'a> {
    pub source_uri: &'a str,
    pub doc_type: &'a str,
    pub status: &'static str,
    pub title: Option<&'a str>,
    /// RFC 3339.
    pub date: String,
    /// Unix timestamp, for templates that want to format dates themselves.
    pub timestamp: i64,
    pub tags: Vec<&'a str>,
    pub uri: Option<&'a str>,
    pub no_extension_uri: Option<&'a str>,
    pub root_path: &'a str,
    pub body: &'a str,
    pub attributes: &'a Map<String, Value>,
}
impl<'a> DocumentView<'a> {
    pub fn new(record: &'a DocumentRecord) -> Result<Self> {
        Ok(Self {
            source_uri: &record.source_uri,
            doc_type: &record.doc_type,
            status: record.status.as_str(),
            title: record.title.as_deref(),
            date: record.date.format(&Rfc3339).or_raise(|| ErrorKind::Model)?,
            timestamp: record.date.unix_timestamp(),
            tags: record.tags.iter().map(String::as_str).collect(),
            uri: record.uri.as_deref(),
            no_extension_uri: record.no_extension_uri.as_deref(),
            root_path: record.root_path.as_deref().unwrap_or_default(),
            body: &record.body,
            attributes: &record.attributes,
        })
    }

    pub fn list(records: &'a [DocumentRecord]) -> Result<Vec<Self>> {
        records.iter().map(Self::new).collect()
    }
}

/// Attribute bags of data documents keyed by source URI without extension.
pub type SiteData = BTreeMap<String, Map<String, Value>>;

pub(crate) fn site_data(records: Vec<DocumentRecord>) -> SiteData {
    records
        .into_iter()
        .map(|record| {
            let key = match record.source_uri.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem.to_string(),
                _ => record.source_uri,
            };
            (key, record.attributes)
        })
        .collect()
}

#[derive(Serialize)]
struct DocumentPage<'a> {
    #[serde(flatten)]
    document: &'a DocumentView<'a>,
    config: &'a Config,
    data: &'a SiteData,
}

/// Model for a single document page.
pub fn document_page(config: &Config, data: &SiteData, document: &DocumentView<'_>) -> Result<upon::Value> {
    upon::to_value(DocumentPage { document, config, data }).or_raise(|| ErrorKind::Model)
}

#[derive(Serialize)]
struct ListingPage<'a> {
    config: &'a Config,
    data: &'a SiteData,
    root_path: &'a str,
    content: &'a [DocumentView<'a>],
    #[serde(flatten)]
    extra: BTreeMap<&'static str, Value>,
}

/// Model for a page listing many documents (`content`), plus any extra
/// top-level values.
pub fn listing_page(
    config: &Config,
    data: &SiteData,
    root_path: &str,
    content: &[DocumentView<'_>],
    extra: impl IntoIterator<Item = (&'static str, Value)>,
) -> Result<upon::Value> {
    let page = ListingPage {
        config,
        data,
        root_path,
        content,
        extra: extra.into_iter().collect(),
    };
    upon::to_value(page).or_raise(|| ErrorKind::Model)
}

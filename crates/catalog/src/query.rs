//! Filters for [`Catalog::scan`](crate::Catalog::scan) and friends.

use crate::error::{ErrorKind, Result};
use bakery_parse::Status;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite};

/// An explicit `OFFSET`/`LIMIT` window over a scan's ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub start: u64,
    pub limit: u64,
}
impl Page {
    pub fn new(start: u64, limit: u64) -> Self {
        Self { start, limit }
    }

    /// The `number`th page (1-indexed) of `size` records.
    pub fn nth(number: u64, size: u64) -> Self {
        Self {
            start: number.saturating_sub(1).saturating_mul(size),
            limit: size,
        }
    }
}

/// Document filter. Every unset field matches everything; an empty
/// `doc_types` list matches every type.
///
/// ```
/// use bakery_catalog::{Page, Query};
/// use bakery_parse::Status;
///
/// let query = Query::new()
///     .doc_type("post")
///     .status(Status::Published)
///     .page(Page::nth(2, 10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub doc_types: Vec<String>,
    pub status: Option<Status>,
    pub rendered: Option<bool>,
    pub cached: Option<bool>,
    pub tag: Option<String>,
    pub page: Option<Page>,
}
impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_types.push(doc_type.into());
        self
    }

    pub fn doc_types<I, S>(mut self, doc_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc_types.extend(doc_types.into_iter().map(Into::into));
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn rendered(mut self, rendered: bool) -> Self {
        self.rendered = Some(rendered);
        self
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = Some(cached);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Append the `WHERE` clause for every filter except the page.
    pub(crate) fn push_filters(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");
        if !self.doc_types.is_empty() {
            builder.push(" AND doc_type IN (");
            let mut separated = builder.separated(", ");
            for doc_type in &self.doc_types {
                separated.push_bind(doc_type.clone());
            }
            separated.push_unseparated(")");
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(rendered) = self.rendered {
            builder.push(" AND rendered = ").push_bind(rendered);
        }
        if let Some(cached) = self.cached {
            builder.push(" AND cached = ").push_bind(cached);
        }
        if let Some(tag) = &self.tag {
            builder
                .push(" AND EXISTS (SELECT 1 FROM json_each(documents.tags) WHERE json_each.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
    }

    /// Append the fixed ordering and, if set, the page window.
    pub(crate) fn push_order_and_page(&self, builder: &mut QueryBuilder<'_, Sqlite>) -> Result<()> {
        builder.push(" ORDER BY date DESC, source_uri ASC");
        if let Some(page) = self.page {
            let limit = i64::try_from(page.limit).or_raise(|| ErrorKind::InvalidData("page limit"))?;
            let start = i64::try_from(page.start).or_raise(|| ErrorKind::InvalidData("page start"))?;
            builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(start);
        }
        Ok(())
    }
}

//! Reads and writes against the document catalog.

use crate::error::{Error, ErrorKind, Result};
use crate::models::{DOCUMENT_COLUMNS, DocumentRow};
use crate::{Database, DocumentRecord, Query, SignatureChange, StoredState};
use bakery_parse::Status;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::instrument;

/// Name of the signature row tracking the template tree.
pub const TEMPLATE_SIGNATURE: &str = "templates";

/// Repository for document records and the template signature.
///
/// Reads run concurrently over the pool. Writes are serialized through a
/// lock shared by every `Catalog` derived from the same [`Database`], and
/// each write is a single transaction.
///
/// In dry-run mode every mutation is a no-op that reports success.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
    dry_run: bool,
}
impl From<&Database> for Catalog {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            writer: db.writer(),
            dry_run: false,
        }
    }
}
impl Catalog {
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn write_error(err: sqlx::Error, source_uri: &str) -> Error {
        let kind = match err.as_database_error().is_some_and(|e| e.is_unique_violation()) {
            true => ErrorKind::Constraint(source_uri.to_string()),
            false => ErrorKind::Database,
        };
        exn::Exn::from(err).raise(kind)
    }

    fn doc_type_list(builder: &mut QueryBuilder<'_, Sqlite>, doc_types: &[&str]) {
        let mut separated = builder.separated(", ");
        for doc_type in doc_types {
            separated.push_bind(doc_type.to_string());
        }
        separated.push_unseparated(")");
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The stored digest and render flag for a source URI, if catalogued.
    pub async fn lookup(&self, source_uri: impl AsRef<str>) -> Result<Option<StoredState>> {
        let row: Option<(String, bool)> = sqlx::query_as(include_str!("../queries/lookup.sql"))
            .bind(source_uri.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(|(content_hash, rendered)| StoredState { content_hash, rendered }))
    }

    pub async fn get(&self, source_uri: impl AsRef<str>) -> Result<Option<DocumentRecord>> {
        let row: Option<DocumentRow> = sqlx::query_as(include_str!("../queries/get.sql"))
            .bind(source_uri.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DocumentRecord::try_from).transpose()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert a new record.
    ///
    /// Returns [`ErrorKind::Constraint`] if a record with the same source URI
    /// already exists.
    #[instrument(level = "debug", skip_all, fields(source_uri = %record.source_uri))]
    pub async fn insert(&self, record: &DocumentRecord) -> Result<()> {
        self.write_document(record, include_str!("../queries/insert.sql")).await
    }

    /// Insert a record, or replace every column of the existing record with
    /// the same source URI.
    #[instrument(level = "debug", skip_all, fields(source_uri = %record.source_uri))]
    pub async fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        self.write_document(record, include_str!("../queries/upsert.sql")).await
    }

    async fn write_document(&self, record: &DocumentRecord, sql: &'static str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let row = DocumentRow::try_from(record)?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(sql)
            .bind(row.source_uri.as_str())
            .bind(row.content_hash)
            .bind(row.doc_type)
            .bind(row.status)
            .bind(row.date)
            .bind(row.tags)
            .bind(row.rendered)
            .bind(row.cached)
            .bind(row.root_path)
            .bind(row.uri)
            .bind(row.no_extension_uri)
            .bind(row.title)
            .bind(row.body)
            .bind(row.attributes)
            .execute(&mut *tx)
            .await
            .map_err(|err| Self::write_error(err, &row.source_uri))?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Delete a record. Returns `false` if there was nothing to delete.
    pub async fn delete(&self, source_uri: impl AsRef<str>) -> Result<bool> {
        if self.dry_run {
            return Ok(true);
        }
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = sqlx::query(include_str!("../queries/delete.sql"))
            .bind(source_uri.as_ref())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Flag a crawled, unrendered document as rendered.
    ///
    /// Returns `false` when nothing matched: the record doesn't exist, is of
    /// another type, wasn't written by the crawler, or is already rendered.
    pub async fn mark_rendered(&self, doc_type: impl AsRef<str>, source_uri: impl AsRef<str>) -> Result<bool> {
        if self.dry_run {
            return Ok(true);
        }
        let _guard = self.writer.lock().await;
        let result = sqlx::query(include_str!("../queries/mark_rendered.sql"))
            .bind(doc_type.as_ref())
            .bind(source_uri.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the rendered flag of every crawled record of the given types,
    /// forcing them to be rendered again without a recrawl.
    #[instrument(skip(self))]
    pub async fn reset_rendered(&self, doc_types: &[&str]) -> Result<u64> {
        if self.dry_run || doc_types.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::new("UPDATE documents SET rendered = 0 WHERE cached = 1 AND doc_type IN (");
        Self::doc_type_list(&mut builder, doc_types);
        let _guard = self.writer.lock().await;
        let result = builder.build().execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }

    /// Delete every record of every listed type, in one transaction.
    #[instrument(skip(self))]
    pub async fn purge(&self, doc_types: &[&str]) -> Result<u64> {
        if self.dry_run || doc_types.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::new("DELETE FROM documents WHERE doc_type IN (");
        Self::doc_type_list(&mut builder, doc_types);
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = builder.build().execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::info!(deleted = result.rows_affected(), "purged catalog");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Every record matching `query`, newest first (ties broken by source
    /// URI), limited to the query's page if it has one.
    pub async fn scan(&self, query: &Query) -> Result<Vec<DocumentRecord>> {
        let mut builder = QueryBuilder::new(format!("SELECT {DOCUMENT_COLUMNS} FROM documents"));
        query.push_filters(&mut builder);
        query.push_order_and_page(&mut builder)?;
        let rows: Vec<DocumentRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(DocumentRecord::try_from).collect()
    }

    /// Number of records matching `query`, ignoring its page.
    pub async fn count(&self, query: &Query) -> Result<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        query.push_filters(&mut builder);
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    /// Every distinct tag used by documents of the given types, optionally
    /// restricted to one status.
    pub async fn aggregate_tags(&self, status: Option<Status>, doc_types: &[&str]) -> Result<BTreeSet<String>> {
        if doc_types.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut builder =
            QueryBuilder::new("SELECT DISTINCT json_each.value FROM documents, json_each(documents.tags) WHERE doc_type IN (");
        Self::doc_type_list(&mut builder, doc_types);
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        let tags: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(tags.into_iter().collect())
    }

    // =========================================================================
    // Template signature
    // =========================================================================

    pub async fn template_signature(&self) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../queries/get_signature.sql"))
            .bind(TEMPLATE_SIGNATURE)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Compare the template tree digest with the stored signature, recording
    /// the new digest if it's missing or different.
    ///
    /// An empty digest on either side counts as a change.
    #[instrument(skip(self))]
    pub async fn reconcile_template_signature(&self, hash: &str) -> Result<SignatureChange> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let stored: Option<String> = sqlx::query_scalar(include_str!("../queries/get_signature.sql"))
            .bind(TEMPLATE_SIGNATURE)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let change = match stored {
            None => SignatureChange::Created,
            Some(previous) if previous.is_empty() || hash.is_empty() || previous != hash => {
                SignatureChange::Changed { previous }
            },
            Some(_) => SignatureChange::Unchanged,
        };
        if change.is_changed() && !self.dry_run {
            sqlx::query(include_str!("../queries/upsert_signature.sql"))
                .bind(TEMPLATE_SIGNATURE)
                .bind(hash)
                .bind(OffsetDateTime::now_utc().unix_timestamp())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Page;
    use bakery_parse::DocumentModel;
    use futures::future::try_join_all;
    use rstest::rstest;
    use time::Duration;
    use time::macros::datetime;

    async fn catalog() -> (Database, Catalog) {
        let db = Database::connect_in_memory().await.unwrap();
        let catalog = Catalog::from(&db);
        (db, catalog)
    }

    fn record(source_uri: &str, doc_type: &str, date: OffsetDateTime) -> DocumentRecord {
        let mut record = DocumentRecord::from_model(
            source_uri,
            format!("hash-{source_uri}"),
            DocumentModel::new(doc_type, Status::Published),
            date,
        );
        record.cached = true;
        record
    }

    fn with_tags(mut record: DocumentRecord, tags: &[&str]) -> DocumentRecord {
        record.tags = tags.iter().map(|t| t.to_string()).collect();
        record
    }

    fn uris(records: &[DocumentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.source_uri.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, catalog) = catalog().await;
        let mut original = with_tags(record("blog/hello.md", "post", datetime!(2024-03-01 10:30 UTC)), &["rust"]);
        original.uri = Some("blog/hello.html".to_string());
        original.root_path = Some("../".to_string());
        original.attributes.insert("summary".to_string(), "Short".into());
        catalog.insert(&original).await.unwrap();
        assert_eq!(catalog.get("blog/hello.md").await.unwrap(), Some(original));
        assert_eq!(catalog.get("missing.md").await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_constraint_error() {
        let (db, catalog) = catalog().await;
        let first = record("hello.md", "post", datetime!(2024-03-01 0:00 UTC));
        catalog.insert(&first).await.unwrap();
        let err = catalog.insert(&first).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Constraint(uri) if uri == "hello.md"));
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let (db, catalog) = catalog().await;
        let mut first = with_tags(record("hello.md", "post", datetime!(2024-03-01 0:00 UTC)), &["old"]);
        first.rendered = true;
        first.title = Some("First".to_string());
        catalog.upsert(&first).await.unwrap();

        let mut second = with_tags(record("hello.md", "page", datetime!(2024-04-01 0:00 UTC)), &["new"]);
        second.content_hash = "changed".to_string();
        catalog.upsert(&second).await.unwrap();

        let stored = catalog.get("hello.md").await.unwrap().unwrap();
        assert_eq!(stored, second);
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_lookup() {
        let (db, catalog) = catalog().await;
        assert_eq!(catalog.lookup("hello.md").await.unwrap(), None);
        let mut hello = record("hello.md", "post", datetime!(2024-03-01 0:00 UTC));
        hello.content_hash = "abc".to_string();
        catalog.insert(&hello).await.unwrap();
        assert_eq!(
            catalog.lookup("hello.md").await.unwrap(),
            Some(StoredState {
                content_hash: "abc".to_string(),
                rendered: false
            })
        );
        db.close().await;
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, catalog) = catalog().await;
        catalog.insert(&record("hello.md", "post", datetime!(2024-03-01 0:00 UTC))).await.unwrap();
        assert!(catalog.delete("hello.md").await.unwrap());
        assert!(!catalog.delete("hello.md").await.unwrap());
        assert_eq!(catalog.get("hello.md").await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_scan_orders_newest_first_with_stable_ties() {
        let (db, catalog) = catalog().await;
        let base = datetime!(2024-01-01 0:00 UTC);
        for (uri, days) in [("c.md", 1), ("a.md", 3), ("b.md", 1), ("d.md", 2)] {
            catalog.insert(&record(uri, "post", base + Duration::days(days))).await.unwrap();
        }
        let records = catalog.scan(&Query::new().doc_type("post")).await.unwrap();
        assert_eq!(uris(&records), vec!["a.md", "d.md", "b.md", "c.md"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_pages_cover_everything_exactly_once() {
        let (db, catalog) = catalog().await;
        let base = datetime!(2024-01-01 0:00 UTC);
        for day in 0..5 {
            catalog.insert(&record(&format!("post-{day}.md"), "post", base + Duration::days(day))).await.unwrap();
        }
        let query = Query::new().doc_type("post").status(Status::Published);
        assert_eq!(catalog.count(&query).await.unwrap(), 5);
        let mut seen = Vec::new();
        let mut sizes = Vec::new();
        for number in 1..=3 {
            let page = catalog.scan(&query.clone().page(Page::nth(number, 2))).await.unwrap();
            sizes.push(page.len());
            seen.extend(page.into_iter().map(|r| r.source_uri));
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(seen, vec!["post-4.md", "post-3.md", "post-2.md", "post-1.md", "post-0.md"]);
        assert!(catalog.scan(&query.page(Page::nth(4, 2))).await.unwrap().is_empty());
        db.close().await;
    }

    #[rstest]
    #[case(Query::new().doc_type("post"), vec!["post.md", "draft.md"])]
    #[case(Query::new().doc_types(["post", "page"]).status(Status::Published), vec!["post.md", "page.md"])]
    #[case(Query::new().status(Status::Draft), vec!["draft.md"])]
    #[case(Query::new().tag("rust"), vec!["post.md", "draft.md"])]
    #[case(Query::new().tag("rus"), vec![])]
    #[case(Query::new().rendered(true), vec!["page.md"])]
    #[case(Query::new().cached(false), vec!["manual.md"])]
    #[tokio::test]
    async fn test_scan_filters(#[case] query: Query, #[case] expected: Vec<&str>) {
        let (db, catalog) = catalog().await;
        let base = datetime!(2024-01-01 0:00 UTC);
        catalog.insert(&with_tags(record("post.md", "post", base + Duration::days(4)), &["rust"])).await.unwrap();
        let mut draft = with_tags(record("draft.md", "post", base + Duration::days(3)), &["rust", "wip"]);
        draft.status = Status::Draft;
        catalog.insert(&draft).await.unwrap();
        let mut page = record("page.md", "page", base + Duration::days(2));
        page.rendered = true;
        catalog.insert(&page).await.unwrap();
        let mut manual = record("manual.md", "data", base + Duration::days(1));
        manual.cached = false;
        catalog.insert(&manual).await.unwrap();

        let records = catalog.scan(&query).await.unwrap();
        assert_eq!(uris(&records), expected);
        db.close().await;
    }

    #[tokio::test]
    async fn test_aggregate_tags_deduplicates() {
        let (db, catalog) = catalog().await;
        let date = datetime!(2024-01-01 0:00 UTC);
        catalog.insert(&with_tags(record("a.md", "post", date), &["a", "b"])).await.unwrap();
        catalog.insert(&with_tags(record("b.md", "post", date), &["b", "c"])).await.unwrap();
        catalog.insert(&with_tags(record("c.md", "page", date), &["d"])).await.unwrap();
        let mut draft = with_tags(record("d.md", "post", date), &["secret"]);
        draft.status = Status::Draft;
        catalog.insert(&draft).await.unwrap();

        let tags = catalog.aggregate_tags(Some(Status::Published), &["post"]).await.unwrap();
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        let tags = catalog.aggregate_tags(None, &["post", "page"]).await.unwrap();
        assert_eq!(tags.len(), 5);
        assert!(catalog.aggregate_tags(None, &[]).await.unwrap().is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_aggregate_tags_ignores_type_order() {
        let (db, catalog) = catalog().await;
        let date = datetime!(2024-01-01 0:00 UTC);
        catalog.insert(&with_tags(record("a.md", "post", date), &["rust", "web"])).await.unwrap();
        catalog.insert(&with_tags(record("b.md", "page", date), &["web", "about"])).await.unwrap();
        catalog.insert(&with_tags(record("c.md", "page", date), &["rust"])).await.unwrap();

        let forward = catalog.aggregate_tags(Some(Status::Published), &["post", "page"]).await.unwrap();
        let backward = catalog.aggregate_tags(Some(Status::Published), &["page", "post"]).await.unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.into_iter().collect::<Vec<_>>(), vec!["about", "rust", "web"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_mark_rendered() {
        let (db, catalog) = catalog().await;
        let date = datetime!(2024-01-01 0:00 UTC);
        catalog.insert(&record("hello.md", "post", date)).await.unwrap();
        let mut manual = record("manual.md", "post", date);
        manual.cached = false;
        catalog.insert(&manual).await.unwrap();

        assert!(!catalog.mark_rendered("page", "hello.md").await.unwrap());
        assert!(catalog.mark_rendered("post", "hello.md").await.unwrap());
        assert!(!catalog.mark_rendered("post", "hello.md").await.unwrap());
        assert!(catalog.lookup("hello.md").await.unwrap().unwrap().rendered);
        // Only records written by the crawler can be marked.
        assert!(!catalog.mark_rendered("post", "manual.md").await.unwrap());
        db.close().await;
    }

    #[tokio::test]
    async fn test_reset_rendered() {
        let (db, catalog) = catalog().await;
        let date = datetime!(2024-01-01 0:00 UTC);
        for (uri, doc_type) in [("a.md", "post"), ("b.md", "post"), ("c.md", "page")] {
            let mut rendered = record(uri, doc_type, date);
            rendered.rendered = true;
            catalog.insert(&rendered).await.unwrap();
        }
        assert_eq!(catalog.reset_rendered(&["post"]).await.unwrap(), 2);
        assert_eq!(catalog.count(&Query::new().rendered(false)).await.unwrap(), 2);
        assert_eq!(catalog.reset_rendered(&[]).await.unwrap(), 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_purge() {
        let (db, catalog) = catalog().await;
        let date = datetime!(2024-01-01 0:00 UTC);
        for (uri, doc_type) in [("a.md", "post"), ("b.md", "page"), ("c.json", "data"), ("d.md", "recipe")] {
            catalog.insert(&record(uri, doc_type, date)).await.unwrap();
        }
        assert_eq!(catalog.purge(&["post", "page", "data"]).await.unwrap(), 3);
        let remaining = catalog.scan(&Query::new()).await.unwrap();
        assert_eq!(uris(&remaining), vec!["d.md"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_reconcile_template_signature() {
        let (db, catalog) = catalog().await;
        assert_eq!(catalog.template_signature().await.unwrap(), None);
        assert_eq!(catalog.reconcile_template_signature("aaa").await.unwrap(), SignatureChange::Created);
        assert_eq!(catalog.reconcile_template_signature("aaa").await.unwrap(), SignatureChange::Unchanged);
        assert_eq!(
            catalog.reconcile_template_signature("bbb").await.unwrap(),
            SignatureChange::Changed {
                previous: "aaa".to_string()
            }
        );
        assert_eq!(catalog.template_signature().await.unwrap().as_deref(), Some("bbb"));
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signatures").fetch_one(db.pool()).await.unwrap();
        assert_eq!(rows, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_empty_signature_always_changes() {
        let (db, catalog) = catalog().await;
        catalog.reconcile_template_signature("").await.unwrap();
        assert!(catalog.reconcile_template_signature("").await.unwrap().is_changed());
        assert!(catalog.reconcile_template_signature("aaa").await.unwrap().is_changed());
        assert!(catalog.reconcile_template_signature("").await.unwrap().is_changed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (db, catalog) = catalog().await;
        let catalog = catalog.with_dry_run(true);
        catalog.insert(&record("hello.md", "post", datetime!(2024-01-01 0:00 UTC))).await.unwrap();
        assert!(catalog.mark_rendered("post", "hello.md").await.unwrap());
        assert!(catalog.reconcile_template_signature("aaa").await.unwrap().is_changed());
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 0);
        assert_eq!(catalog.template_signature().await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_keep_one_record_per_uri() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("catalog.sqlite")).await.unwrap();
        let catalog = Catalog::from(&db);
        let date = datetime!(2024-01-01 0:00 UTC);
        let writes = (0..50).map(|i| {
            let catalog = catalog.clone();
            let mut record = record(&format!("post-{}.md", i % 5), "post", date);
            record.content_hash = format!("hash-{i}");
            tokio::spawn(async move { catalog.upsert(&record).await })
        });
        for result in try_join_all(writes).await.unwrap() {
            result.unwrap();
        }
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 5);
        db.close().await;
    }
}

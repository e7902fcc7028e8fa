use crate::Context;
use crate::render::engine::{TemplateEngine, slug};
use crate::render::error::{Error, ErrorKind, Result};
use crate::render::model::{DocumentView, SiteData, document_page, listing_page, site_data};
use bakery_catalog::{Catalog, DocumentRecord, Page, Query};
use bakery_config::DocType;
use bakery_parse::Status;
use bakery_source::validate_path;
use exn::ResultExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

/// File name of the feed page.
pub const FEED_FILE: &str = "feed.xml";
/// File name of the sitemap page.
pub const SITEMAP_FILE: &str = "sitemap.xml";
/// Directory (below the output root) holding one page per tag.
pub const TAG_DIR: &str = "tags";

/// A document or page that could not be rendered.
#[derive(Debug)]
pub struct RenderFailure {
    /// Source URI of the document, or the name of the page.
    pub target: String,
    pub error: Error,
}

/// Tally of a render pass.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Documents written to the output directory.
    pub rendered: u64,
    /// Documents without a template, marked rendered without output.
    pub marked: u64,
    /// Scheduled documents whose date hasn't come yet.
    pub deferred: u64,
    /// Index, tag and collection pages written.
    pub pages: u64,
    pub errors: Vec<RenderFailure>,
}
impl RenderReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, target: impl Into<String>, error: Error) {
        let target = target.into();
        tracing::warn!(target_name = %target, error = ?error, "render failed");
        self.errors.push(RenderFailure { target, error });
    }
}

/// Output file name of an index page (1-indexed).
pub fn index_file_name(page: u64, extension: &str) -> String {
    match page {
        0 | 1 => format!("index{extension}"),
        page => format!("index{page}{extension}"),
    }
}

/// Page numbering handed to index templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u64,
    pub page_count: u64,
    /// Empty on the first page.
    pub previous_file_name: String,
    /// Empty on the last page.
    pub next_file_name: String,
}
impl Pagination {
    pub fn new(current_page: u64, page_count: u64, extension: &str) -> Self {
        Self {
            current_page,
            page_count,
            previous_file_name: match current_page {
                0 | 1 => String::new(),
                page => index_file_name(page - 1, extension),
            },
            next_file_name: match current_page >= page_count {
                true => String::new(),
                false => index_file_name(current_page + 1, extension),
            },
        }
    }

    fn entries(&self) -> [(&'static str, Value); 4] {
        [
            ("current_page", json!(self.current_page)),
            ("page_count", json!(self.page_count)),
            ("previous_file_name", json!(self.previous_file_name)),
            ("next_file_name", json!(self.next_file_name)),
        ]
    }
}

/// Insert `suffix` between a file's stem and its extension.
fn with_suffix(uri: &str, suffix: &str) -> String {
    let (dir, name) = match uri.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, uri),
    };
    let name = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}{suffix}.{extension}"),
        _ => format!("{name}{suffix}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{name}"),
        None => name,
    }
}

/// Renders catalogued documents, and the pages listing them, into the
/// output directory.
///
/// Rendering is sequential. A failure for one document or page is recorded
/// in the [`RenderReport`] and never stops the others.
pub struct Renderer<'a> {
    ctx: &'a Context,
    catalog: &'a Catalog,
    engine: &'a dyn TemplateEngine,
}
impl<'a> Renderer<'a> {
    pub fn new(ctx: &'a Context, catalog: &'a Catalog, engine: &'a dyn TemplateEngine) -> Self {
        Self { ctx, catalog, engine }
    }

    /// Everything: pending documents, then index, tag and collection pages.
    #[instrument(skip_all)]
    pub async fn render_all(&self) -> RenderReport {
        let mut report = match self.render_pending().await {
            Ok(report) => report,
            Err(err) => {
                let mut report = RenderReport::default();
                report.fail("pending documents", err);
                report
            },
        };
        match self.render_index().await {
            Ok(pages) => report.pages += pages,
            Err(err) => report.fail("index", err),
        }
        match self.render_tags().await {
            Ok(pages) => report.pages += pages,
            Err(err) => report.fail("tags", err),
        }
        match self.render_collections().await {
            Ok(pages) => report.pages += pages,
            Err(err) => report.fail("collections", err),
        }
        tracing::info!(
            rendered = report.rendered,
            marked = report.marked,
            deferred = report.deferred,
            pages = report.pages,
            errors = report.errors.len(),
            "render finished"
        );
        report
    }

    /// Render every crawled document that hasn't been rendered since it last
    /// changed, newest first.
    ///
    /// Only fails if the pending documents can't be listed.
    #[instrument(skip_all)]
    pub async fn render_pending(&self) -> Result<RenderReport> {
        let query = Query::new().doc_types(self.ctx.registry.names()).rendered(false).cached(true);
        let pending = self.catalog.scan(&query).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::debug!(pending = pending.len(), "rendering pending documents");
        let data = self.site_data().await?;
        let mut report = RenderReport::default();
        for record in &pending {
            let Some(doc_type) = self.ctx.registry.get(&record.doc_type) else {
                continue;
            };
            if record.status == Status::PublishedDate {
                report.deferred += 1;
                continue;
            }
            match self.render_document(record, doc_type, &data).await {
                Ok(Some(path)) => {
                    report.rendered += 1;
                    tracing::debug!(source_uri = %record.source_uri, path = %path.display(), "rendered");
                },
                Ok(None) => report.marked += 1,
                Err(err) => report.fail(&record.source_uri, err),
            }
        }
        Ok(report)
    }

    async fn render_document(&self, record: &DocumentRecord, doc_type: &DocType, data: &SiteData) -> Result<Option<PathBuf>> {
        let path = match doc_type.template() {
            None => None,
            Some(template) => {
                let uri = record
                    .uri
                    .as_deref()
                    .ok_or_else(|| exn::Exn::from(ErrorKind::OutputPath(record.source_uri.clone())))?;
                let target = match record.status {
                    Status::Draft => with_suffix(uri, &self.ctx.config.draft_suffix),
                    _ => uri.to_string(),
                };
                let view = DocumentView::new(record)?;
                let model = document_page(&self.ctx.config, data, &view)?;
                Some(self.render_to(template, &model, &target).await?)
            },
        };
        self.catalog
            .mark_rendered(&record.doc_type, &record.source_uri)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        Ok(path)
    }

    /// Render the paginated index of published documents of the index type.
    ///
    /// Returns the number of pages written. With nothing to list a single,
    /// empty page is still written.
    #[instrument(skip_all)]
    pub async fn render_index(&self) -> Result<u64> {
        let config = &self.ctx.config;
        let Some(template) = self.enabled_template(config.index_template.as_deref()) else {
            return Ok(0);
        };
        let query = Query::new().doc_type(&config.index_doc_type).status(Status::Published);
        let total = self.catalog.count(&query).await.or_raise(|| ErrorKind::Catalog)?;
        let per_page = u64::from(config.posts_per_page.max(1));
        let page_count = match config.paginate_index {
            true => total.div_ceil(per_page).max(1),
            false => 1,
        };
        let data = self.site_data().await?;
        for number in 1..=page_count {
            let page_query = match config.paginate_index {
                true => query.clone().page(Page::nth(number, per_page)),
                false => query.clone(),
            };
            let records = self.catalog.scan(&page_query).await.or_raise(|| ErrorKind::Catalog)?;
            let views = DocumentView::list(&records)?;
            let pagination = Pagination::new(number, page_count, &config.output_extension);
            let model = listing_page(config, &data, "", &views, pagination.entries())?;
            self.render_to(template, &model, &index_file_name(number, &config.output_extension)).await?;
        }
        tracing::debug!(total, page_count, "index rendered");
        Ok(page_count)
    }

    /// Render one page per tag used by published documents.
    #[instrument(skip_all)]
    pub async fn render_tags(&self) -> Result<u64> {
        let config = &self.ctx.config;
        let Some(template) = self.enabled_template(config.tag_template.as_deref()) else {
            return Ok(0);
        };
        let types: Vec<&str> = self.ctx.registry.renderable().map(DocType::name).collect();
        let tags = self
            .catalog
            .aggregate_tags(Some(Status::Published), &types)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        let data = self.site_data().await?;
        let mut pages = 0;
        for tag in &tags {
            let tag_slug = slug(tag);
            if tag_slug.is_empty() {
                tracing::warn!(tag = %tag, "tag has no usable file name; skipping");
                continue;
            }
            let query = Query::new().doc_types(types.iter().copied()).status(Status::Published).tag(tag);
            let records = self.catalog.scan(&query).await.or_raise(|| ErrorKind::Catalog)?;
            let views = DocumentView::list(&records)?;
            let extra = [("tag", json!(tag)), ("tag_slug", json!(tag_slug))];
            let model = listing_page(config, &data, "../", &views, extra)?;
            let target = format!("{TAG_DIR}/{tag_slug}{}", config.output_extension);
            self.render_to(template, &model, &target).await?;
            pages += 1;
        }
        Ok(pages)
    }

    /// Render the archive, feed and sitemap pages, each only if its template
    /// is configured and present.
    #[instrument(skip_all)]
    pub async fn render_collections(&self) -> Result<u64> {
        let config = &self.ctx.config;
        let types: Vec<&str> = self.ctx.registry.renderable().map(DocType::name).collect();
        let published = Query::new().doc_types(types).status(Status::Published);
        let data = self.site_data().await?;
        let mut pages = 0;

        for (template, target) in [
            (config.archive_template.as_deref(), format!("archive{}", config.output_extension)),
            (config.sitemap_template.as_deref(), SITEMAP_FILE.to_string()),
        ] {
            let Some(template) = self.enabled_template(template) else {
                continue;
            };
            let records = self.catalog.scan(&published).await.or_raise(|| ErrorKind::Catalog)?;
            let views = DocumentView::list(&records)?;
            let model = listing_page(config, &data, "", &views, [])?;
            self.render_to(template, &model, &target).await?;
            pages += 1;
        }

        if let Some(template) = self.enabled_template(config.feed_template.as_deref()) {
            let query = Query::new()
                .doc_type(&config.index_doc_type)
                .status(Status::Published)
                .page(Page::nth(1, u64::from(config.posts_per_page.max(1))));
            let records = self.catalog.scan(&query).await.or_raise(|| ErrorKind::Catalog)?;
            let updated = records.first().map_or_else(OffsetDateTime::now_utc, |r| r.date);
            let updated = updated.format(&Rfc3339).or_raise(|| ErrorKind::Model)?;
            let views = DocumentView::list(&records)?;
            let model = listing_page(config, &data, "", &views, [("updated", json!(updated))])?;
            self.render_to(template, &model, FEED_FILE).await?;
            pages += 1;
        }
        Ok(pages)
    }

    fn enabled_template<'t>(&self, template: Option<&'t str>) -> Option<&'t str> {
        let template = template?;
        match self.engine.has_template(template) {
            true => Some(template),
            false => {
                tracing::debug!(template, "template not found; page skipped");
                None
            },
        }
    }

    async fn site_data(&self) -> Result<SiteData> {
        let query = Query::new().doc_type(self.ctx.registry.data_type());
        let records = self.catalog.scan(&query).await.or_raise(|| ErrorKind::Catalog)?;
        Ok(site_data(records))
    }

    /// Render into a buffer, then write the buffer below the output root.
    async fn render_to(&self, template: &str, model: &upon::Value, target: &str) -> Result<PathBuf> {
        let mut buffer = Vec::new();
        self.engine.render(model, template, &mut buffer)?;
        let relative = validate_path(target).or_raise(|| ErrorKind::OutputPath(target.to_string()))?;
        let path = self.ctx.config.output_path().join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Write(parent.to_path_buf()))?;
        }
        tokio::fs::write(&path, buffer).await.or_raise(|| ErrorKind::Write(path.clone()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::engine::UponEngine;
    use bakery_catalog::Database;
    use bakery_config::Config;
    use bakery_parse::DocumentModel;
    use rstest::rstest;

    #[rstest]
    #[case(1, 3, "", "index2.html")]
    #[case(2, 3, "index.html", "index3.html")]
    #[case(3, 3, "index2.html", "")]
    #[case(1, 1, "", "")]
    fn test_pagination(#[case] page: u64, #[case] count: u64, #[case] previous: &str, #[case] next: &str) {
        let pagination = Pagination::new(page, count, ".html");
        assert_eq!(pagination.previous_file_name, previous);
        assert_eq!(pagination.next_file_name, next);
    }

    #[rstest]
    #[case(1, "index.html")]
    #[case(2, "index2.html")]
    #[case(12, "index12.html")]
    fn test_index_file_name(#[case] page: u64, #[case] expected: &str) {
        assert_eq!(index_file_name(page, ".html"), expected);
    }

    async fn renderer_fixture(configure: impl FnOnce(&mut Config)) -> (tempfile::TempDir, Context, Database) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_source(dir.path());
        configure(&mut config);
        let ctx = Context::new(config).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        (dir, ctx, db)
    }

    #[tokio::test]
    async fn test_empty_catalog_still_gets_an_index() {
        let (dir, ctx, db) = renderer_fixture(|_| {}).await;
        let catalog = Catalog::from(&db);
        let mut engine = UponEngine::new();
        engine.add_template("index.html", "{{ current_page }}/{{ page_count }}").unwrap();

        let report = Renderer::new(&ctx, &catalog, &engine).render_all().await;
        assert!(report.is_success());
        assert_eq!(report.pages, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("output/index.html")).unwrap(), "1/1");
    }

    #[tokio::test]
    async fn test_unpaginated_index_lists_everything() {
        let (dir, ctx, db) = renderer_fixture(|config| {
            config.paginate_index = false;
            config.posts_per_page = 1;
        })
        .await;
        let catalog = Catalog::from(&db);
        for (uri, day) in [("a.md", 1), ("b.md", 2), ("c.md", 3)] {
            let date = OffsetDateTime::UNIX_EPOCH + time::Duration::days(day);
            let record = DocumentRecord::from_model(uri, "hash", DocumentModel::new("post", Status::Published), date);
            catalog.upsert(&record).await.unwrap();
        }
        let mut engine = UponEngine::new();
        engine
            .add_template("index.html", "{% for doc in content %}{{ doc.source_uri }} {% endfor %}")
            .unwrap();

        let pages = Renderer::new(&ctx, &catalog, &engine).render_index().await.unwrap();
        assert_eq!(pages, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("output/index.html")).unwrap(), "c.md b.md a.md ");
    }

    #[tokio::test]
    async fn test_pending_failures_are_collected() {
        let (_dir, ctx, db) = renderer_fixture(|_| {}).await;
        let catalog = Catalog::from(&db);
        let mut record = DocumentRecord::from_model(
            "hello.md",
            "hash",
            DocumentModel::new("post", Status::Published),
            OffsetDateTime::UNIX_EPOCH,
        );
        record.cached = true;
        record.uri = Some("hello.html".to_string());
        catalog.upsert(&record).await.unwrap();
        let mut data = DocumentRecord::from_model(
            "site.json",
            "hash",
            DocumentModel::new("data", Status::Published),
            OffsetDateTime::UNIX_EPOCH,
        );
        data.cached = true;
        catalog.upsert(&data).await.unwrap();

        // No templates at all.
        let engine = UponEngine::new();
        let report = Renderer::new(&ctx, &catalog, &engine).render_pending().await.unwrap();
        assert_eq!(report.rendered, 0);
        assert_eq!(report.marked, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].target, "hello.md");
        assert!(matches!(&*report.errors[0].error, ErrorKind::MissingTemplate(name) if name == "post.html"));
    }

    #[rstest]
    #[case("hello.html", "hello-draft.html")]
    #[case("blog/2024/hello.html", "blog/2024/hello-draft.html")]
    #[case("blog/hello/index.html", "blog/hello/index-draft.html")]
    #[case("README", "README-draft")]
    fn test_draft_suffix(#[case] uri: &str, #[case] expected: &str) {
        assert_eq!(with_suffix(uri, "-draft"), expected);
    }
}

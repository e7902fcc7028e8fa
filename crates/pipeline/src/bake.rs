use crate::Context;
use crate::crawl::{CrawlReport, Crawler};
use crate::error::{ErrorKind, Result};
use crate::render::{RenderReport, Renderer, TemplateEngine, UponEngine};
use bakery_catalog::{Catalog, Database, SignatureChange};
use bakery_source::fingerprint;
use exn::ResultExt;
use std::sync::Arc;
use tracing::instrument;

/// Everything that happened during one bake.
#[derive(Debug)]
pub struct BakeReport {
    pub crawl: CrawlReport,
    pub render: RenderReport,
    /// How the template tree compared to the previous bake.
    pub signature: SignatureChange,
    /// Documents removed because the templates changed.
    pub purged: u64,
}
impl BakeReport {
    /// `false` if anything failed to render. A partial crawl is reported
    /// through [`CrawlReport::status`] and doesn't count as a failure.
    pub fn is_success(&self) -> bool {
        self.render.is_success()
    }
}

/// Drives a whole bake: template signature check, crawl, render.
pub struct Baker {
    ctx: Context,
    engine: Option<Arc<dyn TemplateEngine>>,
}
impl Baker {
    pub fn new(ctx: Context) -> Self {
        Self { ctx, engine: None }
    }

    /// Render with the given engine instead of loading templates from the
    /// template directory.
    ///
    /// If the template directory doesn't exist, the template signature isn't
    /// checked either, so the catalog is only purged when templates on disk
    /// change.
    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Open the catalog, bake, and close the catalog again.
    ///
    /// Only an unusable catalog (or template directory) is an error; per
    /// file and per page failures end up in the report.
    #[instrument(skip_all, fields(source = %self.ctx.config.source.display()))]
    pub async fn bake(&self) -> Result<BakeReport> {
        let db = Database::connect(self.ctx.config.catalog_path())
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        let result = self.bake_with(&db).await;
        db.close().await;
        result
    }

    /// Bake against an already open catalog, leaving it open.
    pub async fn bake_with(&self, db: &Database) -> Result<BakeReport> {
        let catalog = Catalog::from(db);

        let templates = self.ctx.config.template_path();
        let on_disk = tokio::fs::try_exists(&templates).await.unwrap_or(false);
        let signature = match self.engine.is_some() && !on_disk {
            true => SignatureChange::Unchanged,
            false => {
                let hash = fingerprint::digest_async(templates).await;
                catalog
                    .reconcile_template_signature(&hash)
                    .await
                    .or_raise(|| ErrorKind::Catalog)?
            },
        };
        let purged = match signature.is_changed() {
            true => {
                let purged = catalog.purge(&self.ctx.registry.names()).await.or_raise(|| ErrorKind::Catalog)?;
                db.ensure_schema().await.or_raise(|| ErrorKind::Catalog)?;
                tracing::info!(purged, "templates changed; catalog purged");
                purged
            },
            false => 0,
        };

        let crawl = Crawler::new(&self.ctx, &catalog).run().await;

        let engine: Arc<dyn TemplateEngine> = match &self.engine {
            Some(engine) => Arc::clone(engine),
            None => Arc::new(
                UponEngine::from_dir(self.ctx.config.template_path())
                    .await
                    .or_raise(|| ErrorKind::Render)?,
            ),
        };
        let render = Renderer::new(&self.ctx, &catalog, engine.as_ref()).render_all().await;

        Ok(BakeReport {
            crawl,
            render,
            signature,
            purged,
        })
    }
}

use crate::Context;
use crate::crawl::file::Outcome;
use crate::crawl::stream::{CrawlEvent, crawl};
use bakery_catalog::Catalog;
use futures::StreamExt;
use std::pin::pin;
use tracing::instrument;

/// Whether a crawl ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlStatus {
    #[default]
    Complete,
    /// The crawl timeout expired; files still in flight (or not yet started)
    /// were abandoned and none of their writes landed.
    Partial,
}

/// Tally of a finished (or abandoned) crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub status: CrawlStatus,
    pub discovered: u64,
    pub new: u64,
    pub updated: u64,
    pub identical: u64,
    pub skipped: u64,
    pub failed: u64,
}
impl CrawlReport {
    /// Files that have been processed, one way or another.
    pub fn processed(&self) -> u64 {
        self.new + self.updated + self.identical + self.skipped + self.failed
    }

    /// Whether anything was written to the catalog.
    pub fn has_changes(&self) -> bool {
        self.new + self.updated > 0
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::New => self.new += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Identical => self.identical += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Runs a [`crawl`] to completion (or until the configured timeout) and
/// tallies the results.
#[derive(Debug, Clone, Copy)]
pub struct Crawler<'a> {
    ctx: &'a Context,
    catalog: &'a Catalog,
}
impl<'a> Crawler<'a> {
    pub fn new(ctx: &'a Context, catalog: &'a Catalog) -> Self {
        Self { ctx, catalog }
    }

    #[instrument(skip_all)]
    pub async fn run(&self) -> CrawlReport {
        let mut report = CrawlReport::default();
        let timeout = self.ctx.config.crawl_timeout();
        let drain = async {
            let mut events = pin!(crawl(self.ctx, self.catalog));
            while let Some(event) = events.next().await {
                match event {
                    Ok(CrawlEvent::Started) => tracing::debug!("crawl started"),
                    Ok(CrawlEvent::DiscoveryComplete(count)) => {
                        report.discovered = count;
                        tracing::info!(files = count, "discovery complete");
                    },
                    Ok(CrawlEvent::Crawled(crawled)) => report.record(&crawled.outcome),
                    Ok(CrawlEvent::Complete) => {},
                    Err(err) => {
                        report.failed += 1;
                        tracing::warn!(error = ?err, "failed to crawl file");
                    },
                }
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            report.status = CrawlStatus::Partial;
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                processed = report.processed(),
                discovered = report.discovered,
                "crawl timed out; results are partial"
            );
        }
        tracing::info!(
            new = report.new,
            updated = report.updated,
            identical = report.identical,
            skipped = report.skipped,
            failed = report.failed,
            "crawl finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_catalog::{Database, Query};
    use bakery_config::Config;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join("content").join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn post(body: &str) -> String {
        format!("type=post\nstatus=published\ndate=2024-01-01\n~~~\n{body}\n")
    }

    async fn setup() -> (tempfile::TempDir, Context, Database) {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one", "two", "three"] {
            write(dir.path(), &format!("{name}.md"), &post(name));
        }
        let ctx = Context::new(Config::with_source(dir.path())).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        (dir, ctx, db)
    }

    async fn mark_all_rendered(catalog: &Catalog) {
        for record in catalog.scan(&Query::new().doc_type("post")).await.unwrap() {
            catalog.mark_rendered("post", &record.source_uri).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_new_files_are_catalogued_unrendered() {
        let (_dir, ctx, db) = setup().await;
        let catalog = Catalog::from(&db);
        let report = Crawler::new(&ctx, &catalog).run().await;

        assert_eq!(report.status, CrawlStatus::Complete);
        assert_eq!(report.discovered, 3);
        assert_eq!(report.new, 3);
        assert_eq!(report.processed(), 3);
        assert!(report.has_changes());
        let records = catalog.scan(&Query::new().doc_type("post")).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.rendered && r.cached));
    }

    #[tokio::test]
    async fn test_recrawl_after_render_is_identical() {
        let (_dir, ctx, db) = setup().await;
        let catalog = Catalog::from(&db);
        let crawler = Crawler::new(&ctx, &catalog);
        crawler.run().await;

        // Not rendered yet, so everything is picked up again.
        let report = crawler.run().await;
        assert_eq!(report.updated, 3);

        mark_all_rendered(&catalog).await;
        let report = crawler.run().await;
        assert_eq!(report.identical, 3);
        assert!(!report.has_changes());
    }

    #[tokio::test]
    async fn test_changed_file_is_updated_in_place() {
        let (dir, ctx, db) = setup().await;
        let catalog = Catalog::from(&db);
        let crawler = Crawler::new(&ctx, &catalog);
        crawler.run().await;
        mark_all_rendered(&catalog).await;

        write(dir.path(), "two.md", &post("two, edited"));
        let report = crawler.run().await;
        assert_eq!(report.updated, 1);
        assert_eq!(report.identical, 2);

        let two = catalog.get("two.md").await.unwrap().unwrap();
        assert!(!two.rendered);
        assert_eq!(two.body, "two, edited\n");
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_changed_file_that_no_longer_parses_is_removed() {
        let (dir, ctx, db) = setup().await;
        let catalog = Catalog::from(&db);
        let crawler = Crawler::new(&ctx, &catalog);
        crawler.run().await;
        mark_all_rendered(&catalog).await;

        write(dir.path(), "two.md", "no header any more\n");
        let report = crawler.run().await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.identical, 2);
        assert!(catalog.get("two.md").await.unwrap().is_none());
        assert_eq!(catalog.count(&Query::new()).await.unwrap(), 2);

        // Fixing the header brings it back as a new document.
        write(dir.path(), "two.md", &post("two, fixed"));
        let report = crawler.run().await;
        assert_eq!(report.new, 1);
        assert!(catalog.get("two.md").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_changed_file_that_cannot_be_read_is_removed() {
        let (dir, ctx, db) = setup().await;
        let catalog = Catalog::from(&db);
        let crawler = Crawler::new(&ctx, &catalog);
        crawler.run().await;
        mark_all_rendered(&catalog).await;

        // Not UTF-8, so reading it as text fails.
        fs::write(dir.path().join("content/three.md"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let report = crawler.run().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.identical, 2);
        assert!(catalog.get("three.md").await.unwrap().is_none());
        assert_eq!(catalog.lookup("three.md").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hidden_and_ignored_files_are_not_discovered() {
        let (dir, ctx, db) = setup().await;
        write(dir.path(), ".secret.md", &post("hidden"));
        write(dir.path(), "drafts/.bakeignore", "");
        write(dir.path(), "drafts/wip.md", &post("ignored"));
        let catalog = Catalog::from(&db);

        let report = Crawler::new(&ctx, &catalog).run().await;
        assert_eq!(report.discovered, 3);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_partial() {
        let (dir, _, db) = setup().await;
        let config = Config {
            crawl_timeout_secs: 0,
            ..Config::with_source(dir.path())
        };
        let ctx = Context::new(config).unwrap();
        let catalog = Catalog::from(&db);

        let report = Crawler::new(&ctx, &catalog).run().await;
        assert_eq!(report.status, CrawlStatus::Partial);
        assert!(report.processed() < 3);
    }
}

use crate::Context;
use crate::crawl::error::{ErrorKind, Result};
use bakery_catalog::{Catalog, DocumentRecord, StoredState};
use bakery_config::Config;
use bakery_parse::{DocumentModel, Parser};
use bakery_source::SourceFile;
use bakery_source::file::Fingerprinted;
use bakery_source::{fingerprint, root_path};
use exn::ResultExt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

/// Which source tree a file was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
    Content,
    Data,
}

/// How a file compares to what the catalog remembers about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Never catalogued.
    New,
    /// The content changed (or couldn't be fingerprinted), or the previous
    /// version was never rendered.
    Updated,
    /// Nothing to do.
    Identical,
}

/// Classify a file from its stored state and current digest.
///
/// An empty digest on either side is never a match, so a file that couldn't
/// be fingerprinted is always reprocessed.
pub fn classify(stored: Option<&StoredState>, current_hash: &str) -> Classification {
    match stored {
        None => Classification::New,
        Some(state) if !state.rendered || !fingerprint::is_match(&state.content_hash, current_hash) => {
            Classification::Updated
        },
        Some(_) => Classification::Identical,
    }
}

/// What happened to one crawled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    New,
    Updated,
    Identical,
    /// The file isn't a document; nothing was written.
    Skipped,
}

/// The result of crawling a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crawled {
    pub source_uri: String,
    pub tree: Tree,
    pub outcome: Outcome,
}

/// Output location of a content document, relative to the output root.
///
/// Returns the output URI and, in extension-less mode, the directory-style
/// URI that links should use.
///
/// ```text
/// blog/hello.md → blog/hello.html
/// blog/hello.md → blog/hello/index.html, blog/hello/   (uri_no_extension)
/// ```
pub fn output_uri(config: &Config, source_uri: &str) -> (String, Option<String>) {
    let stem = match source_uri.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/{}", file_stem(name)),
        None => file_stem(source_uri).to_string(),
    };
    let no_extension = config.uri_no_extension
        && config.uri_no_extension_prefix.as_deref().is_none_or(|prefix| source_uri.starts_with(prefix));
    match no_extension {
        true => (format!("{stem}/index{}", config.output_extension), Some(format!("{stem}/"))),
        false => (format!("{stem}{}", config.output_extension), None),
    }
}

fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Turn a parsed model into the record stored in the catalog.
pub(crate) fn augment(
    ctx: &Context,
    file: &SourceFile<Fingerprinted>,
    model: DocumentModel,
    now: OffsetDateTime,
) -> DocumentRecord {
    let mut record = DocumentRecord::from_model(&file.source_uri, &file.content_hash, model, file.modified);
    record.rendered = false;
    record.cached = true;
    record.status = record.status.promote(record.date, now);
    if !ctx.registry.is_data(&record.doc_type) {
        let (uri, no_extension_uri) = output_uri(&ctx.config, &record.source_uri);
        record.root_path = Some(root_path(&uri));
        record.uri = Some(uri);
        record.no_extension_uri = no_extension_uri;
    }
    record
}

/// Crawl a single file: fingerprint, classify and, when new or changed,
/// parse and upsert it.
#[instrument(level = "debug", skip(ctx, catalog, file), fields(source_uri = %file.source_uri))]
pub async fn crawl_file(ctx: &Context, catalog: &Catalog, tree: Tree, file: SourceFile) -> Result<Crawled> {
    let file = file.fingerprint().await;
    let stored = catalog.lookup(&file.source_uri).await.or_raise(|| ErrorKind::Catalog)?;
    let crawled = |outcome| Crawled {
        source_uri: file.source_uri.clone(),
        tree,
        outcome,
    };
    let outcome = match classify(stored.as_ref(), &file.content_hash) {
        Classification::Identical => return Ok(crawled(Outcome::Identical)),
        Classification::New => Outcome::New,
        Classification::Updated => Outcome::Updated,
    };

    let parser: Arc<dyn Parser> = match tree {
        Tree::Content => Arc::clone(&ctx.content_parser),
        Tree::Data => Arc::clone(&ctx.data_parser),
    };
    let meta = file.meta().clone();
    let parsed = tokio::task::spawn_blocking(move || parser.parse(&meta)).await.or_raise(|| ErrorKind::Parse)?;
    let model = match parsed {
        Ok(model) => model,
        Err(err) if err.is_skippable() => {
            forget(catalog, &outcome, &file.source_uri).await?;
            tracing::info!(source_uri = %file.source_uri, reason = %*err, "not a document; skipping");
            return Ok(crawled(Outcome::Skipped));
        },
        Err(err) => {
            forget(catalog, &outcome, &file.source_uri).await?;
            return Err(err).or_raise(|| ErrorKind::Parse);
        },
    };

    let record = augment(ctx, &file, model, OffsetDateTime::now_utc());
    catalog.upsert(&record).await.or_raise(|| ErrorKind::Catalog)?;
    tracing::debug!(doc_type = %record.doc_type, ?outcome, "catalogued");
    Ok(crawled(outcome))
}

/// Drop the previous version of a changed file that no longer parses, so
/// it's absent from the catalog until it does again.
async fn forget(catalog: &Catalog, outcome: &Outcome, source_uri: &str) -> Result<()> {
    if *outcome == Outcome::Updated && catalog.delete(source_uri).await.or_raise(|| ErrorKind::Catalog)? {
        tracing::info!(source_uri, "previous version removed from catalog");
    }
    Ok(())
}

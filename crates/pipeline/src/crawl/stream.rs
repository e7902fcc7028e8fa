use crate::Context;
use crate::crawl::error::{ErrorKind as CrawlErrorKind, Result as CrawlResult};
use crate::crawl::file::{Crawled, Tree, crawl_file};
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use bakery_catalog::Catalog;
use bakery_source::{SourceFile, Walker};
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::sync::Arc;

/// Progress events emitted by [`crawl`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of eligible files across both trees.
/// 3. [`Crawled`](Self::Crawled) once per file that was processed.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// Per-file and per-directory failures are `Err` items interleaved with the
/// above; they never end the stream.
#[derive(Debug)]
pub enum CrawlEvent {
    Started,
    DiscoveryComplete(u64),
    Crawled(Crawled),
    Complete,
}

/// Streams [`CrawlEvent`]s for every eligible file in the content tree, then
/// the data tree.
///
/// Files are discovered up front, then processed concurrently up to the
/// configured concurrency (default
/// [`MAX_PROCESS_CONCURRENCY`](crate::MAX_PROCESS_CONCURRENCY)). Additional
/// files are started in discovery order as in-flight ones complete.
pub fn crawl<'a>(ctx: &'a Context, catalog: &'a Catalog) -> impl Stream<Item = Result<CrawlEvent>> + 'a {
    stream! {
        for await event in crawl_inner(ctx, catalog) {
            yield event.or_raise(|| ErrorKind::Crawl);
        }
    }
}

fn walker(ctx: &Context, tree: Tree) -> Walker {
    let root = match tree {
        Tree::Content => ctx.config.content_path(),
        Tree::Data => ctx.config.data_path(),
    };
    Walker::new(root)
        .include_hidden(ctx.config.include_hidden)
        .ignore_file(ctx.config.ignore_file.clone())
}

fn crawl_inner<'a>(ctx: &'a Context, catalog: &'a Catalog) -> impl Stream<Item = CrawlResult<CrawlEvent>> + 'a {
    stream!({
        yield Ok(CrawlEvent::Started);

        let mut discovered: Vec<(Tree, SourceFile)> = Vec::new();
        for tree in [Tree::Content, Tree::Data] {
            let walker = walker(ctx, tree);
            let parser = match tree {
                Tree::Content => Arc::clone(&ctx.content_parser),
                Tree::Data => Arc::clone(&ctx.data_parser),
            };
            let mut files = walker.stream(move |path| parser.supports(path));
            while let Some(file) = files.next().await {
                match file {
                    Ok(file) => discovered.push((tree, file)),
                    Err(err) => {
                        yield Err(err).or_raise(|| CrawlErrorKind::Source);
                    },
                }
            }
        }
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(CrawlEvent::DiscoveryComplete(u64::try_from(discovered.len()).unwrap_or(u64::MAX)));

        let mut pending = discovered.into_iter().map(|(tree, file)| crawl_file(ctx, catalog, tree, file));
        let mut processing = FuturesUnordered::new();
        processing.extend(pending.by_ref().take(ctx.concurrency()));
        while let Some(result) = processing.next().await {
            yield result.map(CrawlEvent::Crawled);
            if let Some(next) = pending.next() {
                processing.push(next);
            }
        }

        yield Ok(CrawlEvent::Complete);
    })
}

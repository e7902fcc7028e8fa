//! Incremental crawl of the content and data trees.
//!
//! Each eligible file is fingerprinted and compared with what the
//! [catalog](bakery_catalog) remembers about it (see [`classify`]). Only new
//! and changed files are parsed; the resulting records are upserted with
//! `rendered = false` so that the [render coordinator](crate::render) picks
//! them up.
//!
//! The primary entry point is [`crawl`], a stream of [`CrawlEvent`]s.
//! [`Crawler::run`] consumes it under the crawl timeout and produces a
//! [`CrawlReport`].

pub mod error;
mod file;
mod report;
mod stream;

pub use self::file::{Classification, Crawled, Outcome, Tree, classify, crawl_file, output_uri};
pub use self::report::{CrawlReport, CrawlStatus, Crawler};
pub use self::stream::{CrawlEvent, crawl};

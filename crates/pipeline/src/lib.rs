//! The incremental bake pipeline.
//!
//! - [`crawl`] walks the content and data trees, fingerprints every file and
//!   parses and catalogues the ones that are new or changed.
//! - [`render`] renders every catalogued document that hasn't been rendered
//!   since it last changed, then the index, tag and collection pages.
//! - [`Baker`] drives a whole bake: template signature check, crawl, render.

mod bake;
pub mod crawl;
pub mod error;
pub mod render;

use crate::error::{ErrorKind, Result};
use bakery_config::{Config, DocTypes};
use bakery_parse::{DataFileParser, HeaderParser, Parser};
use exn::ResultExt;
use std::sync::Arc;

pub use crate::bake::{BakeReport, Baker};

/// Default upper bound on files processed at the same time.
pub const MAX_PROCESS_CONCURRENCY: usize = 100;

/// Everything a crawl or render needs to know about the project.
///
/// Immutable once built, and shared by reference between the crawler, the
/// render coordinator and the bake driver.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub registry: DocTypes,
    pub(crate) content_parser: Arc<dyn Parser>,
    pub(crate) data_parser: Arc<dyn Parser>,
}
impl Context {
    /// A context using the built-in [`HeaderParser`] and [`DataFileParser`].
    pub fn new(config: Config) -> Result<Self> {
        let content_parser = HeaderParser::new(&config).or_raise(|| ErrorKind::Configuration)?;
        let data_parser = DataFileParser::new(&config);
        Ok(Self::with_parsers(config, Arc::new(content_parser), Arc::new(data_parser)))
    }

    /// A context with custom parsers for the content and data trees.
    pub fn with_parsers(config: Config, content_parser: Arc<dyn Parser>, data_parser: Arc<dyn Parser>) -> Self {
        Self {
            registry: config.doc_types(),
            config,
            content_parser,
            data_parser,
        }
    }

    pub(crate) fn concurrency(&self) -> usize {
        match self.config.crawl_concurrency {
            0 => MAX_PROCESS_CONCURRENCY,
            n => n,
        }
    }
}
impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

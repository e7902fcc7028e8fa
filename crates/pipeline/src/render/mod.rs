//! Rendering catalogued documents to the output directory.
//!
//! [`Renderer`] picks up documents the crawl left unrendered, renders each
//! through its type's template and marks it rendered. Index, tag and
//! collection pages are regenerated on every pass. Templates come from a
//! [`TemplateEngine`]; [`UponEngine`] loads them from the template directory.

mod coordinator;
mod engine;
pub mod error;
mod model;

pub use self::coordinator::{
    FEED_FILE, Pagination, RenderFailure, RenderReport, Renderer, SITEMAP_FILE, TAG_DIR, index_file_name,
};
pub use self::engine::{TemplateEngine, UponEngine};
pub use self::model::{DocumentView, SiteData, document_page, listing_page};

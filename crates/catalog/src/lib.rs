//! SQLite document catalog.
//!
//! The catalog remembers every source file the crawler has parsed: its
//! content digest (for change detection), its parsed fields, and whether its
//! output has been rendered since it last changed. Like any cache it can be
//! deleted at any time; the next bake rebuilds it from the source tree.
//!
//! # Architecture
//! - [`Database`] owns the connection pool and the schema. There is no global
//!   instance; whoever drives a bake opens one and closes it when done.
//! - [`Catalog`] is a cheap, cloneable handle for reads and writes derived
//!   from a [`Database`]. All handles from one database share a write lock.
//! - [`Query`] and [`Page`] describe scans; pagination is an explicit window,
//!   never cursor state held by the catalog.

mod db;
pub mod error;
mod models;
mod query;
mod record;
mod repo;

pub use crate::db::Database;
pub use crate::query::{Page, Query};
pub use crate::record::{DocumentRecord, SignatureChange, StoredState};
pub use crate::repo::{Catalog, TEMPLATE_SIGNATURE};

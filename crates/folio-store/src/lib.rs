//! # folio-store
//!
//! Document store for the portfolio, backed by SQLite.
//!
//! Content is a single tree addressed by `/`-separated key paths. The crate
//! exposes a synchronous [`Database`] that owns the `rusqlite::Connection`
//! and implements the tree operations, and an async [`ContentStore`] facade
//! that serializes access to it and re-delivers fresh values to every live
//! [`Subscription`] after each mutation.

pub mod content_store;
pub mod database;
pub mod documents;
pub mod hub;
pub mod migrations;
pub mod preferences;

mod error;

pub use content_store::{ContentStore, DocumentStore};
pub use database::Database;
pub use error::{Result, StoreError};
pub use hub::Subscription;
pub use preferences::ThemeColor;

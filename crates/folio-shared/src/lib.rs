//! # folio-shared
//!
//! Types shared by every crate of the portfolio workspace: store paths and
//! push keys, the typed entity records kept in the document store, tag
//! editing, display cards and the common error types.

pub mod card;
pub mod constants;
pub mod error;
pub mod models;
pub mod path;
pub mod push_id;
pub mod tags;

pub use card::{Card, CardAction};
pub use error::{ContentError, PathError, ValidationError};
pub use models::*;
pub use path::StorePath;
pub use push_id::PushIdGenerator;
pub use tags::{TagField, TagList, ToolGroup};

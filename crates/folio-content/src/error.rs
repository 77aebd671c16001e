use folio_shared::{ContentError, ValidationError};
use folio_store::StoreError;
use thiserror::Error;

/// Errors from the blob upload clients.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Empty upload")]
    Empty,

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote host answered but did not return a usable URL.
    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// Errors from a form controller. The draft is kept on every one of them.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("The form is not open")]
    NotOpen,

    #[error("{0}")]
    WrongMode(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Upload failed: {0}")]
    Upload(#[from] BlobError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The store went away while the viewer was mounted.
    #[error("Subscription closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Invalid identity configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum CountryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

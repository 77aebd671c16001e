use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed document at '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("segment '{0}' contains a forbidden character")]
    ForbiddenCharacter(String),

    #[error("the root path has no parent or key")]
    Root,
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("rating {0} is outside the 0-5 range")]
    RatingOutOfRange(f64),

    #[error("field '{0}' is required")]
    Required(&'static str),

    #[error("{0} has no tag field {1}")]
    UnknownTagField(&'static str, String),

    #[error("unsupported file type '{0}'")]
    UnsupportedFileType(String),
}

/// Error types for proofkey operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("encoding failed: {0}")]
    EncodingError(String),

    #[error("flow step out of order: expected {expected}, found {found}")]
    StepOutOfOrder {
        expected: &'static str,
        found: &'static str,
    },

    #[error("state parameter mismatch")]
    StateMismatch,

    #[error("no flow record stored for state: {0}")]
    UnknownFlow(String),

    #[error("authorization denied: {error}, description: {description:?}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PkceError>;

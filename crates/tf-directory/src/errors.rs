use tf_auth::TfAuthError;
use thiserror::Error;

/// Directory lookup error types.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error(transparent)]
    Auth(#[from] TfAuthError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("search request failed: HTTP {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("gamertag is required")]
    EmptyGamertag,

    #[error("gamertag not found: {0}")]
    NotFound(String),

    #[error("gamertag '{gamertag}' matched {count} profiles")]
    Ambiguous { gamertag: String, count: usize },

    #[error("failed to parse search response: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

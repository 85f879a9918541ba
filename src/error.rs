use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Gave up on {url} after {attempts} failed attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("Login page {url} answered with status {status}")]
    LoginUnavailable { url: String, status: StatusCode },

    #[error("No `{field}` input found on the login page, the page layout has changed")]
    MissingToken { field: &'static str },

    #[error("{url} answered with unexpected status {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    #[error("Grade row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

use reqwest::StatusCode;

use crate::model::FailureKind;

/// Transport-level failure of a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP transport error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Timeout(_) | HttpError::Connect(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::Connect(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidRequest(err.to_string())
        } else {
            HttpError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no map coordinates found for '{0}'")]
    NotFound(String),
    #[error("network error while resolving city: {0}")]
    Network(String),
    #[error("malformed coordinates: {0}")]
    Parse(String),
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::NotFound(_) => FailureKind::NotFound,
            ResolveError::Network(_) => FailureKind::Network,
            ResolveError::Parse(_) => FailureKind::Parse,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("forecast request failed: {0}")]
    Network(#[from] HttpError),
    #[error("forecast provider answered with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed forecast response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no encryption key configured")]
    MissingKey,
    #[error("encryption key is not a valid Fernet key")]
    InvalidKey,
    #[error("identity token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("identity token could not be decrypted")]
    Decryption,
    #[error("decrypted identity is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single API call.
///
/// Every variant renders as a message fit to show the user as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response from server: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid endpoint `{path}`: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// A file to upload could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status for backend-reported errors.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// True when the backend rejected the credential.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY)
        )
    }
}

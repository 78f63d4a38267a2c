use thiserror::Error;

/// Errors raised by catalog and feature-provider calls.
///
/// These never cross a resolution tier or a transform: callers log them and
/// degrade to the next tier or to an empty/partial result.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            CatalogError::Transport(e) => e.status().map(|s| s.as_u16()),
            CatalogError::Decode(_) => None,
        }
    }

    /// Rate-limit/permission class used to trip the secondary feature breaker.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

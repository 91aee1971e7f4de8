//! Error type for Bitbucket REST calls.

/// All errors the Bitbucket client can produce.
#[derive(thiserror::Error, Debug)]
pub enum BitbucketError {
    /// The server answered with a non-success status.
    #[error("Bitbucket API error: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("Failed to reach Bitbucket: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller supplied input the client cannot act on.
    #[error("{0}")]
    InvalidInput(String),

    /// Client configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BitbucketError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BitbucketError::Api { status, .. } => Some(*status),
            BitbucketError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure was caused by the caller's input rather than the upstream service.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, BitbucketError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, BitbucketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_is_interpolated() {
        let err = BitbucketError::Api {
            status: 404,
            message: "Repository foo does not exist.".to_string(),
        };
        assert_eq!(err.to_string(), "Bitbucket API error: Repository foo does not exist.");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_invalid_input_has_no_status() {
        let err = BitbucketError::InvalidInput("Project key must be provided".to_string());
        assert_eq!(err.status(), None);
        assert!(err.is_invalid_input());
    }
}

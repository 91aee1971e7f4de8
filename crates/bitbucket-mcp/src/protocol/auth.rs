//! Shared-secret check for tool calls.

use std::sync::Arc;

use crate::types::{McpError, McpResult};

/// Header carrying the shared secret on the HTTP transport.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Compares the key presented with a request against the configured secret.
/// With no secret configured every call is allowed.
#[derive(Clone, Default)]
pub struct AuthGuard {
    secret: Option<Arc<str>>,
}

impl AuthGuard {
    /// An empty string counts as unset.
    pub fn new(secret: Option<String>) -> Self {
        let secret: Option<Arc<str>> = secret.filter(|s| !s.is_empty()).map(Into::into);
        if secret.is_none() {
            tracing::warn!("MCP_API_KEY is not set. The server will not require authentication.");
        }
        Self { secret }
    }

    /// A guard that lets everything through, without the open-mode warning.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    pub fn check(&self, presented: Option<&str>) -> McpResult<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        match presented {
            Some(key) if key == &**secret => Ok(()),
            _ => {
                tracing::warn!("Rejected tool call with invalid or missing API key");
                Err(McpError::Unauthorized)
            }
        }
    }
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("enforcing", &self.is_enforcing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mode_accepts_anything() {
        let guard = AuthGuard::new(None);
        assert!(!guard.is_enforcing());
        assert!(guard.check(None).is_ok());
        assert!(guard.check(Some("whatever")).is_ok());
    }

    #[test]
    fn test_empty_secret_is_open() {
        assert!(!AuthGuard::new(Some(String::new())).is_enforcing());
    }

    #[test]
    fn test_secret_must_match() {
        let guard = AuthGuard::new(Some("s3cret".into()));
        assert!(guard.check(Some("s3cret")).is_ok());
        assert!(matches!(guard.check(Some("nope")), Err(McpError::Unauthorized)));
        assert!(matches!(guard.check(None), Err(McpError::Unauthorized)));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let rendered = format!("{:?}", AuthGuard::new(Some("s3cret".into())));
        assert!(!rendered.contains("s3cret"));
    }
}

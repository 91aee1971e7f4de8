//! Connection settings for a Bitbucket Server instance.

use crate::error::{BitbucketError, Result};

/// How requests authenticate against Bitbucket.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as `Authorization: Bearer`.
    Token(String),
    /// Username and password, sent as HTTP basic auth.
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(..)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitbucketConfig {
    /// Server root, e.g. `https://bitbucket.example.com`. No trailing slash.
    pub base_url: String,
    pub credentials: Credentials,
    /// Project key used when a tool call omits one.
    pub default_project: Option<String>,
}

impl BitbucketConfig {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
            default_project: None,
        }
    }

    pub fn with_default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = Some(project.into());
        self
    }

    /// Load from `BITBUCKET_URL`, `BITBUCKET_TOKEN` or
    /// `BITBUCKET_USERNAME`/`BITBUCKET_PASSWORD`, and `BITBUCKET_DEFAULT_PROJECT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("BITBUCKET_URL")
            .ok_or_else(|| BitbucketError::Config("BITBUCKET_URL is required".to_string()))?;

        let credentials = match (
            non_empty("BITBUCKET_TOKEN"),
            non_empty("BITBUCKET_USERNAME"),
            non_empty("BITBUCKET_PASSWORD"),
        ) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(username), Some(password)) => Credentials::Basic { username, password },
            _ => {
                return Err(BitbucketError::Config(
                    "either BITBUCKET_TOKEN or BITBUCKET_USERNAME and BITBUCKET_PASSWORD must be set"
                        .to_string(),
                ))
            }
        };

        let mut config = Self::new(base_url, credentials);
        config.default_project = non_empty("BITBUCKET_DEFAULT_PROJECT");
        Ok(config)
    }

    /// Explicit project key, else the default one.
    pub fn project_key(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_project.clone())
            .ok_or_else(|| {
                BitbucketError::InvalidInput(
                    "Project key must be provided or configured as default.".to_string(),
                )
            })
    }

    /// REST API root for this server.
    pub fn api_root(&self) -> String {
        format!("{}/rest/api/1.0", self.base_url)
    }
}

//! Server configuration: CLI flags over environment variables over defaults.

use std::net::SocketAddr;
use std::time::Duration;

use crate::types::{McpError, McpResult};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ENDPOINT: &str = "/stream";
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Http,
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub http: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub keep_alive: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("transport", &self.transport)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

impl ServerConfig {
    /// Resolve from CLI flags and the process environment, then validate.
    pub fn resolve(cli: &CliOverrides) -> McpResult<Self> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with environment lookups going through `lookup`.
    pub fn resolve_with<F>(cli: &CliOverrides, lookup: F) -> McpResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let transport = if cli.http || env("ENABLE_HTTP_TRANSPORT").is_some_and(|v| is_enabled(&v)) {
            TransportKind::Http
        } else {
            TransportKind::Stdio
        };

        let port = match (cli.port, env("MCP_HTTP_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .parse()
                .map_err(|_| McpError::Config(format!("MCP_HTTP_PORT is not a valid port: {raw}")))?,
            (None, None) => defaults.port,
        };

        let config = Self {
            transport,
            host: cli.host.clone().or_else(|| env("MCP_HTTP_HOST")).unwrap_or(defaults.host),
            port,
            endpoint: cli
                .endpoint
                .clone()
                .or_else(|| env("MCP_HTTP_ENDPOINT"))
                .unwrap_or(defaults.endpoint),
            api_key: cli
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| env("MCP_API_KEY")),
            keep_alive: cli
                .keep_alive_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.keep_alive),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> McpResult<()> {
        if !self.endpoint.starts_with('/') {
            return Err(McpError::Config(format!(
                "endpoint must start with '/': {}",
                self.endpoint
            )));
        }
        if self.endpoint == "/health" {
            return Err(McpError::Config(
                "endpoint cannot be /health, it is reserved for health checks".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(McpError::Config("port must be non-zero".to_string()));
        }
        if self.keep_alive.is_zero() {
            return Err(McpError::Config("keep-alive interval must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Resolve `host` (IP literal or hostname) and `port` to the address to bind.
    pub async fn listen_addr(&self) -> McpResult<SocketAddr> {
        let invalid = |detail: String| {
            McpError::Config(format!("invalid listen address {}:{}: {detail}", self.host, self.port))
        };
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host did not resolve".to_string()))
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

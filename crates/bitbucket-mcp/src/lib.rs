//! Bitbucket MCP server: exposes Bitbucket operations as MCP tools over
//! stdio or HTTP with an SSE push channel.

pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{CliOverrides, ServerConfig, TransportKind};
pub use protocol::{AuthGuard, ProtocolHandler};
pub use tools::ToolRegistry;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::StdioTransport;

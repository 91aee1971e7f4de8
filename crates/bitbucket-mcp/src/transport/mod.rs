//! Transport layer for MCP communication.

pub mod framing;
#[cfg(feature = "http")]
pub mod http;
pub mod stdio;
pub mod stream;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use stdio::StdioTransport;
pub use stream::{format_envelope, StreamFrame, StreamRegistry, StreamSubscription};

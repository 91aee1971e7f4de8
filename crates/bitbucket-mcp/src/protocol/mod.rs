//! MCP protocol handling: JSON-RPC validation, dispatch and authentication.

pub mod auth;
pub mod handler;
pub mod validator;

pub use auth::{AuthGuard, API_KEY_HEADER};
pub use handler::{Method, ProtocolHandler};

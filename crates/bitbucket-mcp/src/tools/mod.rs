//! MCP tool implementations.

pub mod handler;
pub mod pull_requests;
pub mod registry;
pub mod repositories;
pub mod search;
pub mod users;
pub mod workspaces;

pub use handler::{validated, ToolHandler, ValidatedHandler};
pub use registry::{ToolDescriptor, ToolRegistry};

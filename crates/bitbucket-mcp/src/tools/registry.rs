//! Tool registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use bitbucket_client::BitbucketApi;
use serde_json::Value;

use crate::types::{McpError, McpResult, ToolDefinition};

use super::handler::ToolHandler;
use super::{pull_requests, repositories, search, users, workspaces};

/// A named tool: what clients see in `tools/list` plus the handler behind it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Tools in registration order. Built once, then shared read-only.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full Bitbucket tool catalog backed by `api`.
    pub fn bitbucket(api: Arc<dyn BitbucketApi>) -> McpResult<Self> {
        let mut registry = Self::new();
        for descriptor in pull_requests::tools(&api)
            .into_iter()
            .chain(workspaces::tools(&api))
            .chain(repositories::tools(&api))
            .chain(search::tools(&api))
            .chain(users::tools(&api))
        {
            registry.register(descriptor)?;
        }
        tracing::debug!(count = registry.len(), "Registered Bitbucket tools");
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> McpResult<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(McpError::DuplicateTool(descriptor.name));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i].handler))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

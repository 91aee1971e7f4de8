//! Workspace (project) listing.

use std::sync::Arc;

use bitbucket_client::{BitbucketApi, ListWorkspacesInput};
use serde_json::json;

use super::handler::validated;
use super::registry::ToolDescriptor;
use crate::types::{McpError, ToolCallResult};

pub fn tools(api: &Arc<dyn BitbucketApi>) -> Vec<ToolDescriptor> {
    let name = "bitbucket_list_workspaces";
    let api = Arc::clone(api);
    vec![ToolDescriptor::new(
        name,
        "Lists available Bitbucket workspaces.",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Filter workspaces by name" }
            },
            "additionalProperties": false
        }),
        validated(name, move |input: ListWorkspacesInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.list_workspaces(&input).await?)) }
        }),
    )]
}

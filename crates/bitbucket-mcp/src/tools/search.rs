//! Code search.

use std::sync::Arc;

use bitbucket_client::{BitbucketApi, SearchContentInput};
use serde_json::json;

use super::handler::validated;
use super::registry::ToolDescriptor;
use crate::types::{McpError, ToolCallResult};

pub fn tools(api: &Arc<dyn BitbucketApi>) -> Vec<ToolDescriptor> {
    let name = "bitbucket_search_content";
    let api = Arc::clone(api);
    vec![ToolDescriptor::new(
        name,
        "Searches content within Bitbucket repositories.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key to search in" },
                "query": { "type": "string", "description": "Search query" },
                "scope": { "type": "string", "description": "Restrict the search to this repository slug" },
                "language": { "type": "string", "description": "Language filter, e.g. java" },
                "extension": { "type": "string", "description": "File extension filter, e.g. rs" }
            },
            "required": ["workspaceSlug", "query"],
            "additionalProperties": false
        }),
        validated(name, move |input: SearchContentInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.search_content(&input).await?)) }
        }),
    )]
}

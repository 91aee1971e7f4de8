//! User profile lookup.

use std::sync::Arc;

use bitbucket_client::{BitbucketApi, GetUserInput};
use serde_json::json;

use super::handler::validated;
use super::registry::ToolDescriptor;
use crate::types::{McpError, ToolCallResult};

pub fn tools(api: &Arc<dyn BitbucketApi>) -> Vec<ToolDescriptor> {
    let name = "bitbucket_get_user_profile";
    let api = Arc::clone(api);
    vec![ToolDescriptor::new(
        name,
        "Gets Bitbucket user profile details by username.",
        json!({
            "type": "object",
            "properties": {
                "username": { "type": "string", "description": "User slug" }
            },
            "required": ["username"],
            "additionalProperties": false
        }),
        validated(name, move |input: GetUserInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.get_user(&input).await?)) }
        }),
    )]
}

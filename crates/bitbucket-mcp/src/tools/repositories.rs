//! Repository, branch and file tools.

use std::sync::Arc;

use bitbucket_client::{
    BitbucketApi, CreateBranchInput, GetFileInput, ListBranchesInput, ListRepositoriesInput,
    RepositoryRef,
};
use serde_json::json;

use super::handler::validated;
use super::registry::ToolDescriptor;
use crate::types::{McpError, ToolCallResult};

pub fn tools(api: &Arc<dyn BitbucketApi>) -> Vec<ToolDescriptor> {
    vec![
        list(api),
        branches(api),
        details(api),
        file_content(api),
        create_branch(api),
    ]
}

fn list(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_list_repositories";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Lists Bitbucket repositories.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key to list repositories from" },
                "projectKey": { "type": "string", "description": "Alias of workspaceSlug" },
                "query": { "type": "string", "description": "Filter repositories by name" },
                "role": { "type": "string", "description": "Minimum permission, e.g. REPO_READ" }
            },
            "additionalProperties": false
        }),
        validated(name, move |input: ListRepositoriesInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.list_repositories(&input).await?)) }
        }),
    )
}

fn branches(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_list_repository_branches";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Lists branches for a Bitbucket repository.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key" },
                "repoSlug": { "type": "string", "description": "Repository slug" },
                "query": { "type": "string", "description": "Filter branches by name" },
                "sort": { "type": "string", "description": "ALPHABETICAL or MODIFICATION" }
            },
            "required": ["workspaceSlug", "repoSlug"],
            "additionalProperties": false
        }),
        validated(name, move |input: ListBranchesInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.list_branches(&input).await?)) }
        }),
    )
}

fn details(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_get_repository_details";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Gets details for a specific Bitbucket repository.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key" },
                "repoSlug": { "type": "string", "description": "Repository slug" }
            },
            "required": ["workspaceSlug", "repoSlug"],
            "additionalProperties": false
        }),
        validated(name, move |repo: RepositoryRef| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.get_repository(&repo).await?)) }
        }),
    )
}

fn file_content(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_get_file_content";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Gets the content of a specific file from a Bitbucket repository.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key" },
                "repoSlug": { "type": "string", "description": "Repository slug" },
                "filePath": { "type": "string", "description": "Path of the file within the repository" },
                "revision": { "type": "string", "description": "Branch, tag or commit. Defaults to the default branch." }
            },
            "required": ["workspaceSlug", "repoSlug", "filePath"],
            "additionalProperties": false
        }),
        validated(name, move |input: GetFileInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::text(api.get_file_content(&input).await?)) }
        }),
    )
}

fn create_branch(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_create_branch";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Creates a new branch in a Bitbucket repository.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key" },
                "repoSlug": { "type": "string", "description": "Repository slug" },
                "newBranchName": { "type": "string", "description": "Name of the branch to create" },
                "sourceBranchOrCommit": { "type": "string", "description": "Start point. Defaults to main." }
            },
            "required": ["workspaceSlug", "repoSlug", "newBranchName"],
            "additionalProperties": false
        }),
        validated(name, move |input: CreateBranchInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.create_branch(&input).await?)) }
        }),
    )
}

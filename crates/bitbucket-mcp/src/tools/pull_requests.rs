//! Pull request tools.

use std::sync::Arc;

use bitbucket_client::{
    AddCommentInput, AddPrCommentInput, BitbucketApi, CreatePullRequestInput,
    DeclinePullRequestInput, GetDiffInput, MergePullRequestInput, PullRequestRef,
};
use serde_json::{json, Map, Value};

use super::handler::validated;
use super::registry::ToolDescriptor;
use crate::types::{McpError, ToolCallResult};

/// Schema for `project`/`repository`/`prId` plus `extra` properties.
fn pr_schema(extra: Value, extra_required: &[&str]) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "project".into(),
        json!({ "type": "string", "description": "Bitbucket project key. Defaults to BITBUCKET_DEFAULT_PROJECT." }),
    );
    properties.insert(
        "repository".into(),
        json!({ "type": "string", "description": "Repository slug" }),
    );
    properties.insert(
        "prId".into(),
        json!({ "type": "number", "description": "Pull request ID" }),
    );
    if let Value::Object(extra) = extra {
        properties.extend(extra);
    }

    let mut required = vec!["repository", "prId"];
    required.extend_from_slice(extra_required);

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub fn tools(api: &Arc<dyn BitbucketApi>) -> Vec<ToolDescriptor> {
    vec![
        create(api),
        details(api),
        merge(api),
        decline(api),
        comment(api),
        diff(api),
        reviews(api),
        file_line_comment(api),
    ]
}

fn create(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_create_pull_request";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Creates a new Bitbucket pull request",
        json!({
            "type": "object",
            "properties": {
                "project": { "type": "string", "description": "Bitbucket project key. Defaults to BITBUCKET_DEFAULT_PROJECT." },
                "repository": { "type": "string", "description": "Repository slug" },
                "title": { "type": "string", "description": "PR title" },
                "description": { "type": "string", "description": "PR description" },
                "sourceBranch": { "type": "string", "description": "Branch to merge from" },
                "targetBranch": { "type": "string", "description": "Branch to merge into" },
                "reviewers": { "type": "array", "items": { "type": "string" }, "description": "Reviewer usernames" }
            },
            "required": ["repository", "title", "sourceBranch", "targetBranch"],
            "additionalProperties": false
        }),
        validated(name, move |input: CreatePullRequestInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.create_pull_request(&input).await?)) }
        }),
    )
}

fn details(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_get_pull_request_details";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Gets detailed information for a Bitbucket pull request",
        pr_schema(json!({}), &[]),
        validated(name, move |pr: PullRequestRef| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.get_pull_request(&pr).await?)) }
        }),
    )
}

fn merge(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_merge_pull_request";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Merges a Bitbucket pull request",
        pr_schema(
            json!({
                "message": { "type": "string", "description": "Merge commit message" },
                "strategy": {
                    "type": "string",
                    "enum": ["merge-commit", "squash", "fast-forward"],
                    "description": "Merge strategy to use"
                }
            }),
            &[],
        ),
        validated(name, move |input: MergePullRequestInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.merge_pull_request(&input).await?)) }
        }),
    )
}

fn decline(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_decline_pull_request";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Declines a Bitbucket pull request",
        pr_schema(
            json!({ "message": { "type": "string", "description": "Reason for declining" } }),
            &[],
        ),
        validated(name, move |input: DeclinePullRequestInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.decline_pull_request(&input).await?)) }
        }),
    )
}

fn comment(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_add_pull_request_comment";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Adds a general comment to a Bitbucket pull request.",
        pr_schema(
            json!({
                "text": { "type": "string", "description": "Comment text" },
                "parentId": { "type": "number", "description": "Parent comment ID for replies" }
            }),
            &["text"],
        ),
        validated(name, move |input: AddCommentInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.add_comment(&input).await?)) }
        }),
    )
}

fn diff(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_get_pull_request_diff";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Gets the diff for a Bitbucket pull request",
        pr_schema(
            json!({ "contextLines": { "type": "number", "description": "Number of context lines (default 10)" } }),
            &[],
        ),
        validated(name, move |input: GetDiffInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::text(api.get_diff(&input).await?)) }
        }),
    )
}

fn reviews(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_get_pull_request_reviews";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Gets reviews for a Bitbucket pull request",
        pr_schema(json!({}), &[]),
        validated(name, move |pr: PullRequestRef| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.get_reviews(&pr).await?)) }
        }),
    )
}

fn file_line_comment(api: &Arc<dyn BitbucketApi>) -> ToolDescriptor {
    let name = "bitbucket_add_pull_request_file_line_comment";
    let api = Arc::clone(api);
    ToolDescriptor::new(
        name,
        "Adds a comment to a Bitbucket pull request, optionally as an inline comment on a specific file and line.",
        json!({
            "type": "object",
            "properties": {
                "workspaceSlug": { "type": "string", "description": "Project key the repository belongs to" },
                "repoSlug": { "type": "string", "description": "Repository slug" },
                "prId": { "type": "number", "description": "Pull request ID" },
                "content": { "type": "string", "description": "Comment text" },
                "parentId": { "type": "number", "description": "Parent comment ID for replies" },
                "inline": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path to the file being commented on." },
                        "line": { "type": "number", "description": "Line number for the comment anchor." },
                        "lineType": { "type": "string", "enum": ["ADDED", "REMOVED", "CONTEXT"] },
                        "fileType": { "type": "string", "enum": ["FROM", "TO"], "description": "Side of the diff. Defaults to TO." }
                    },
                    "required": ["path", "line"],
                    "additionalProperties": false
                }
            },
            "required": ["workspaceSlug", "repoSlug", "prId", "content"],
            "additionalProperties": false
        }),
        validated(name, move |input: AddPrCommentInput| {
            let api = Arc::clone(&api);
            async move { Ok::<_, McpError>(ToolCallResult::json(&api.add_pr_comment(&input).await?)) }
        }),
    )
}

//! Shared fixtures: an in-memory Bitbucket backend and request builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use bitbucket_client::*;
use bitbucket_mcp::protocol::{AuthGuard, ProtocolHandler};
use bitbucket_mcp::tools::ToolRegistry;

/// Records every call and answers with canned data.
///
/// A few inputs trigger failure paths:
/// - repository `missing` answers 404 from `get_repository`
/// - username `boom` panics inside `get_user`
/// - username `misconfigured` fails with a client configuration error
#[derive(Default)]
pub struct FakeBitbucket {
    calls: Mutex<Vec<String>>,
}

impl FakeBitbucket {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl BitbucketApi for FakeBitbucket {
    async fn create_pull_request(&self, input: &CreatePullRequestInput) -> Result<Value> {
        self.record("create_pull_request");
        Ok(json!({ "id": 1, "title": input.title }))
    }

    async fn get_pull_request(&self, pr: &PullRequestRef) -> Result<Value> {
        self.record("get_pull_request");
        Ok(json!({ "id": pr.pr_id, "repository": pr.repository, "state": "OPEN" }))
    }

    async fn merge_pull_request(&self, input: &MergePullRequestInput) -> Result<Value> {
        self.record("merge_pull_request");
        Ok(json!({ "id": input.pr_id, "state": "MERGED" }))
    }

    async fn decline_pull_request(&self, input: &DeclinePullRequestInput) -> Result<Value> {
        self.record("decline_pull_request");
        Ok(json!({ "id": input.pr_id, "state": "DECLINED" }))
    }

    async fn add_comment(&self, input: &AddCommentInput) -> Result<Value> {
        self.record("add_comment");
        Ok(json!({ "id": 10, "text": input.text }))
    }

    async fn get_diff(&self, _input: &GetDiffInput) -> Result<String> {
        self.record("get_diff");
        Ok("diff --git a/README.md b/README.md\n+hello\n".to_string())
    }

    async fn get_reviews(&self, _pr: &PullRequestRef) -> Result<Value> {
        self.record("get_reviews");
        Ok(json!([{ "action": "APPROVED" }]))
    }

    async fn add_pr_comment(&self, input: &AddPrCommentInput) -> Result<Value> {
        self.record("add_pr_comment");
        Ok(json!({ "id": 11, "text": input.content }))
    }

    async fn list_workspaces(&self, _input: &ListWorkspacesInput) -> Result<Value> {
        self.record("list_workspaces");
        Ok(json!({ "values": [{ "key": "PROJ", "name": "Project" }], "isLastPage": true }))
    }

    async fn list_repositories(&self, _input: &ListRepositoriesInput) -> Result<Value> {
        self.record("list_repositories");
        Ok(json!({ "values": [], "isLastPage": true }))
    }

    async fn list_branches(&self, _input: &ListBranchesInput) -> Result<Value> {
        self.record("list_branches");
        Ok(json!({ "values": [{ "displayId": "main" }] }))
    }

    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Value> {
        self.record("get_repository");
        if repo.repo_slug == "missing" {
            return Err(BitbucketError::Api {
                status: 404,
                message: "Repository missing does not exist.".to_string(),
            });
        }
        Ok(json!({ "slug": repo.repo_slug, "project": { "key": repo.workspace_slug } }))
    }

    async fn get_file_content(&self, _input: &GetFileInput) -> Result<String> {
        self.record("get_file_content");
        Ok("# Title\n".to_string())
    }

    async fn create_branch(&self, input: &CreateBranchInput) -> Result<Value> {
        self.record("create_branch");
        Ok(json!({ "displayId": input.new_branch_name }))
    }

    async fn search_content(&self, _input: &SearchContentInput) -> Result<Value> {
        self.record("search_content");
        Ok(json!({ "code": { "values": [] } }))
    }

    async fn get_user(&self, input: &GetUserInput) -> Result<Value> {
        self.record("get_user");
        match input.username.as_str() {
            "boom" => panic!("user lookup exploded"),
            "misconfigured" => Err(BitbucketError::Config("BITBUCKET_URL is not set".to_string())),
            name => Ok(json!({ "slug": name, "displayName": "Jane Doe" })),
        }
    }
}

pub fn fake() -> Arc<FakeBitbucket> {
    Arc::new(FakeBitbucket::default())
}

pub fn registry(api: &Arc<FakeBitbucket>) -> Arc<ToolRegistry> {
    let api: Arc<dyn BitbucketApi> = api.clone();
    Arc::new(ToolRegistry::bitbucket(api).unwrap())
}

/// Dispatcher over the fake backend with no key required.
pub fn open_handler(api: &Arc<FakeBitbucket>) -> ProtocolHandler {
    ProtocolHandler::new(registry(api), AuthGuard::open())
}

/// Dispatcher over the fake backend requiring `secret`.
pub fn guarded_handler(api: &Arc<FakeBitbucket>, secret: &str) -> ProtocolHandler {
    ProtocolHandler::new(registry(api), AuthGuard::new(Some(secret.to_string())))
}

pub fn request(id: Value, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    request(json!(id), "tools/call", json!({ "name": name, "arguments": arguments }))
}

/// The text of the first content block of a successful tool call.
pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result text")
}

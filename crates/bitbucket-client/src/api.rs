//! The operations the MCP server exposes, as an object-safe async trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::*;

/// Bitbucket Server operations.
///
/// JSON-returning methods hand back the decoded response body as-is; the two
/// text methods return the raw body (unified diff, file contents).
#[async_trait]
pub trait BitbucketApi: Send + Sync {
    async fn create_pull_request(&self, input: &CreatePullRequestInput) -> Result<Value>;

    async fn get_pull_request(&self, pr: &PullRequestRef) -> Result<Value>;

    async fn merge_pull_request(&self, input: &MergePullRequestInput) -> Result<Value>;

    async fn decline_pull_request(&self, input: &DeclinePullRequestInput) -> Result<Value>;

    async fn add_comment(&self, input: &AddCommentInput) -> Result<Value>;

    async fn get_diff(&self, input: &GetDiffInput) -> Result<String>;

    /// Pull request activities narrowed to approvals and reviews.
    async fn get_reviews(&self, pr: &PullRequestRef) -> Result<Value>;

    async fn add_pr_comment(&self, input: &AddPrCommentInput) -> Result<Value>;

    async fn list_workspaces(&self, input: &ListWorkspacesInput) -> Result<Value>;

    async fn list_repositories(&self, input: &ListRepositoriesInput) -> Result<Value>;

    async fn list_branches(&self, input: &ListBranchesInput) -> Result<Value>;

    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Value>;

    async fn get_file_content(&self, input: &GetFileInput) -> Result<String>;

    async fn create_branch(&self, input: &CreateBranchInput) -> Result<Value>;

    async fn search_content(&self, input: &SearchContentInput) -> Result<Value>;

    async fn get_user(&self, input: &GetUserInput) -> Result<Value>;
}

//! `reqwest`-backed implementation of [`BitbucketApi`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde_json::{json, Map, Value};

use crate::api::BitbucketApi;
use crate::config::{BitbucketConfig, Credentials};
use crate::error::{BitbucketError, Result};
use crate::types::*;

const DEFAULT_CONTEXT_LINES: u32 = 10;
const DEFAULT_START_POINT: &str = "main";

/// Client for the Bitbucket Server REST API 1.0.
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    config: BitbucketConfig,
    api_root: Url,
}

impl BitbucketClient {
    pub fn new(config: BitbucketConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bitbucket-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http_client(http, config)
    }

    /// Use a preconfigured `reqwest::Client` (proxies, timeouts, TLS roots).
    pub fn with_http_client(http: reqwest::Client, config: BitbucketConfig) -> Result<Self> {
        let api_root = Url::parse(&config.api_root())
            .map_err(|e| BitbucketError::Config(format!("invalid BITBUCKET_URL: {e}")))?;
        if api_root.cannot_be_a_base() {
            return Err(BitbucketError::Config(format!(
                "BITBUCKET_URL is not an http(s) base URL: {}",
                config.base_url
            )));
        }
        Ok(Self {
            http,
            config,
            api_root,
        })
    }

    /// `segments` are appended to the API root one by one, percent-encoded.
    fn url<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request<S: AsRef<str>>(&self, method: Method, segments: &[S]) -> RequestBuilder {
        let url = self.url(segments);
        tracing::debug!(%method, %url, "Bitbucket request");
        let builder = self.http.request(method, url);
        match &self.config.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        }
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_text(&self, builder: RequestBuilder) -> Result<String> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.text().await?)
    }

    /// `projects/{p}/repos/{r}/pull-requests/{id}` followed by `rest`.
    fn pull_request_path(
        &self,
        project: Option<&str>,
        repository: &str,
        pr_id: u64,
        rest: &[&str],
    ) -> Result<Vec<String>> {
        let project = self.config.project_key(project)?;
        let mut path = vec![
            "projects".to_string(),
            project,
            "repos".to_string(),
            repository.to_string(),
            "pull-requests".to_string(),
            pr_id.to_string(),
        ];
        path.extend(rest.iter().map(|s| s.to_string()));
        Ok(path)
    }
}

/// Turn a non-success response into [`BitbucketError::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status {}", status.as_u16()))
    });

    tracing::warn!(status = status.as_u16(), %message, "Bitbucket request failed");
    Err(BitbucketError::Api {
        status: status.as_u16(),
        message,
    })
}

/// `errors[0].message`, then `message`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/errors/0/message")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

fn ref_object(branch: &str, repository: &str, project: &str) -> Value {
    json!({
        "id": format!("refs/heads/{branch}"),
        "repository": {
            "slug": repository,
            "project": { "key": project }
        }
    })
}

fn is_review(activity: &Value) -> bool {
    matches!(
        activity.get("action").and_then(Value::as_str),
        Some("APPROVED") | Some("REVIEWED")
    )
}

#[async_trait]
impl BitbucketApi for BitbucketClient {
    async fn create_pull_request(&self, input: &CreatePullRequestInput) -> Result<Value> {
        let project = self.config.project_key(input.project.as_deref())?;
        let repo = &input.repository;

        let mut body = json!({
            "title": input.title,
            "description": input.description,
            "fromRef": ref_object(&input.source_branch, repo, &project),
            "toRef": ref_object(&input.target_branch, repo, &project),
        });
        if let Some(reviewers) = &input.reviewers {
            body["reviewers"] = reviewers
                .iter()
                .map(|name| json!({ "user": { "name": name } }))
                .collect();
        }

        let path = ["projects", project.as_str(), "repos", repo.as_str(), "pull-requests"];
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn get_pull_request(&self, pr: &PullRequestRef) -> Result<Value> {
        let path = self.pull_request_path(pr.project.as_deref(), &pr.repository, pr.pr_id, &[])?;
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn merge_pull_request(&self, input: &MergePullRequestInput) -> Result<Value> {
        let path = self.pull_request_path(
            input.project.as_deref(),
            &input.repository,
            input.pr_id,
            &["merge"],
        )?;
        let body = json!({
            "version": -1,
            "message": input.message,
            "strategy": input.strategy.unwrap_or_default(),
        });
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn decline_pull_request(&self, input: &DeclinePullRequestInput) -> Result<Value> {
        let path = self.pull_request_path(
            input.project.as_deref(),
            &input.repository,
            input.pr_id,
            &["decline"],
        )?;
        let body = json!({ "version": -1, "message": input.message });
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn add_comment(&self, input: &AddCommentInput) -> Result<Value> {
        let path = self.pull_request_path(
            input.project.as_deref(),
            &input.repository,
            input.pr_id,
            &["comments"],
        )?;
        let mut body = json!({ "text": input.text });
        if let Some(parent) = input.parent_id {
            body["parent"] = json!({ "id": parent });
        }
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn get_diff(&self, input: &GetDiffInput) -> Result<String> {
        let path = self.pull_request_path(
            input.project.as_deref(),
            &input.repository,
            input.pr_id,
            &["diff"],
        )?;
        let context_lines = input.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES);
        let builder = self
            .request(Method::GET, &path)
            .query(&[("contextLines", context_lines)])
            .header(reqwest::header::ACCEPT, "text/plain");
        self.send_text(builder).await
    }

    async fn get_reviews(&self, pr: &PullRequestRef) -> Result<Value> {
        let path = self.pull_request_path(
            pr.project.as_deref(),
            &pr.repository,
            pr.pr_id,
            &["activities"],
        )?;
        let activities = self.send_json(self.request(Method::GET, &path)).await?;
        let reviews: Vec<Value> = activities
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter(|a| is_review(a)).cloned().collect())
            .unwrap_or_default();
        Ok(Value::Array(reviews))
    }

    async fn add_pr_comment(&self, input: &AddPrCommentInput) -> Result<Value> {
        let pr_id = input.pr_id.to_string();
        let path = [
            "projects",
            input.workspace_slug.as_str(),
            "repos",
            input.repo_slug.as_str(),
            "pull-requests",
            pr_id.as_str(),
            "comments",
        ];

        let mut body = json!({ "text": input.content });
        if let Some(parent) = input.parent_id {
            body["parent"] = json!({ "id": parent });
        }
        if let Some(inline) = &input.inline {
            body["anchor"] = json!({
                "line": inline.line,
                "lineType": inline.line_type.unwrap_or(LineType::Context),
                "fileType": inline.file_type.unwrap_or(FileType::To),
                "path": inline.path,
            });
        }

        tracing::info!(payload = %body, "Adding pull request comment");
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn list_workspaces(&self, input: &ListWorkspacesInput) -> Result<Value> {
        let mut builder = self.request(Method::GET, &["projects"]);
        if let Some(query) = input.query.as_deref().filter(|q| !q.is_empty()) {
            builder = builder.query(&[("name", query)]);
        }
        self.send_json(builder).await
    }

    async fn list_repositories(&self, input: &ListRepositoriesInput) -> Result<Value> {
        let project = input
            .workspace_slug
            .as_deref()
            .or(input.project_key.as_deref())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.default_project.clone());

        let path = match &project {
            Some(project) => vec!["projects", project.as_str(), "repos"],
            None => vec!["repos"],
        };

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(query) = input.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("name", query));
        }
        if let Some(role) = input.role.as_deref().filter(|r| !r.is_empty()) {
            params.push(("permission", role));
        }

        self.send_json(self.request(Method::GET, &path).query(&params))
            .await
    }

    async fn list_branches(&self, input: &ListBranchesInput) -> Result<Value> {
        let path = [
            "projects",
            input.workspace_slug.as_str(),
            "repos",
            input.repo_slug.as_str(),
            "branches",
        ];

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(query) = input.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("filterText", query));
        }
        if let Some(sort) = input.sort.as_deref().filter(|s| !s.is_empty()) {
            params.push(("orderBy", sort));
        }

        self.send_json(self.request(Method::GET, &path).query(&params))
            .await
    }

    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Value> {
        let path = ["projects", repo.workspace_slug.as_str(), "repos", repo.repo_slug.as_str()];
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn get_file_content(&self, input: &GetFileInput) -> Result<String> {
        // Each directory level is its own segment so `/` stays a separator.
        let mut path = vec![
            "projects",
            input.workspace_slug.as_str(),
            "repos",
            input.repo_slug.as_str(),
            "raw",
        ];
        path.extend(input.file_path.split('/').filter(|s| !s.is_empty()));

        let mut builder = self.request(Method::GET, &path);
        if let Some(revision) = input.revision.as_deref().filter(|r| !r.is_empty()) {
            builder = builder.query(&[("at", revision)]);
        }
        self.send_text(builder).await
    }

    async fn create_branch(&self, input: &CreateBranchInput) -> Result<Value> {
        let path = [
            "projects",
            input.workspace_slug.as_str(),
            "repos",
            input.repo_slug.as_str(),
            "branches",
        ];
        let start_point = input
            .source_branch_or_commit
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_START_POINT);
        let body = json!({ "name": input.new_branch_name, "startPoint": start_point });

        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn search_content(&self, input: &SearchContentInput) -> Result<Value> {
        let mut body = Map::new();
        body.insert("query".into(), json!(input.query));
        body.insert("limits".into(), json!({ "primary": 10, "secondary": 5 }));

        if let Some(scope) = input.scope.as_deref().filter(|s| !s.is_empty()) {
            body.insert(
                "scope".into(),
                json!({
                    "type": "REPOSITORY",
                    "resource": { "project": { "key": input.workspace_slug }, "slug": scope }
                }),
            );
        }

        let mut advanced = Vec::new();
        if let Some(ext) = input.extension.as_deref().filter(|e| !e.is_empty()) {
            advanced.push(format!("ext:{ext}"));
        }
        if let Some(lang) = input.language.as_deref().filter(|l| !l.is_empty()) {
            advanced.push(format!("lang:{lang}"));
        }
        if !advanced.is_empty() {
            body.insert("advancedQuery".into(), json!(advanced.join(" ")));
        }

        self.send_json(self.request(Method::POST, &["search", "codes"]).json(&body))
            .await
    }

    async fn get_user(&self, input: &GetUserInput) -> Result<Value> {
        if input.username.trim().is_empty() {
            return Err(BitbucketError::InvalidInput(
                "User slug is required to fetch user details.".to_string(),
            ));
        }
        self.send_json(self.request(Method::GET, &["users", input.username.as_str()]))
            .await
    }
}

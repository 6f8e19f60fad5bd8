//! Minimal GitHub REST client for reading issues and posting comments.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Client, Method, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("issue-runner/", env!("CARGO_PKG_VERSION"));

/// `owner/name` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl FromStr for Repository {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("expected `owner/name`, got `{s}`")),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The issue fields the runner cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    /// GitHub returns `null` for issues without a description.
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Serialize)]
struct CommentPayload<'a> {
    body: &'a str,
}

pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build github http client")?;
        Ok(Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
        })
    }

    /// Point the client at another API root (GitHub Enterprise, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn issue_url(&self, repo: &Repository, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}",
            self.base_url, repo.owner, repo.name, number
        )
    }

    fn build(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .bearer_auth(&self.token)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    pub fn get_issue_request(&self, repo: &Repository, number: u64) -> Result<Request> {
        self.build(Method::GET, &self.issue_url(repo, number))
            .build()
            .context("build get issue request")
    }

    pub fn post_comment_request(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<Request> {
        let url = format!("{}/comments", self.issue_url(repo, number));
        self.build(Method::POST, &url)
            .json(&CommentPayload { body })
            .build()
            .context("build post comment request")
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn get_issue(&self, repo: &Repository, number: u64) -> Result<Issue> {
        let request = self.get_issue_request(repo, number)?;
        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("fetch issue {repo}#{number}"))?;
        let response = ensure_success(response, "fetch issue").await?;
        let issue: Issue = response
            .json()
            .await
            .with_context(|| format!("parse issue {repo}#{number}"))?;
        debug!(title = %issue.title, "fetched issue");
        Ok(issue)
    }

    #[instrument(skip(self, repo, body), fields(repo = %repo, body_bytes = body.len()))]
    pub async fn post_issue_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<()> {
        let request = self.post_comment_request(repo, number, body)?;
        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("post comment on {repo}#{number}"))?;
        ensure_success(response, "post comment").await?;
        debug!("posted comment");
        Ok(())
    }
}

async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    bail!("{action} failed: HTTP {status}: {}", text.trim())
}

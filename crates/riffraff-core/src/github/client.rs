//! Minimal GitHub REST client
//!
//! Only the four calls the notifier needs: pull requests for a commit, and
//! list/create/update of issue comments.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NotifyError;

const USER_AGENT: &str = concat!("riffraff-upload/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    #[serde(rename = "ref")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<CommentUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUser {
    pub login: String,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

/// Authenticated client scoped to one repository
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str, owner: &str, repo: &str) -> Result<Self, NotifyError> {
        Url::parse(api_url).map_err(|_| NotifyError::InvalidUrl(api_url.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| NotifyError::Request {
                url: api_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, NotifyError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| NotifyError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NotifyError> {
        let response = self.send(url, self.http.get(url)).await?;
        response.json().await.map_err(|source| NotifyError::Request {
            url: url.to_string(),
            source,
        })
    }

    pub async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>, NotifyError> {
        let url = self.repo_url(&format!("commits/{}/pulls", sha));
        self.get_json(&url).await
    }

    pub async fn list_comments(&self, issue: u64) -> Result<Vec<IssueComment>, NotifyError> {
        let url = self.repo_url(&format!("issues/{}/comments?per_page=100", issue));
        self.get_json(&url).await
    }

    pub async fn create_comment(&self, issue: u64, body: &str) -> Result<(), NotifyError> {
        let url = self.repo_url(&format!("issues/{}/comments", issue));
        self.send(&url, self.http.post(&url).json(&CommentBody { body }))
            .await?;
        Ok(())
    }

    pub async fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), NotifyError> {
        let url = self.repo_url(&format!("issues/comments/{}", comment_id));
        self.send(&url, self.http.patch(&url).json(&CommentBody { body }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_api_url_rejected() {
        let result = GithubClient::new("not a url", "token", "o", "r");
        assert!(matches!(result, Err(NotifyError::InvalidUrl(_))));
    }

    #[test]
    fn test_repo_url_trims_trailing_slash() {
        let client = GithubClient::new("https://api.github.com/", "t", "guardian", "foo").unwrap();
        assert_eq!(
            client.repo_url("issues/1/comments"),
            "https://api.github.com/repos/guardian/foo/issues/1/comments"
        );
    }
}

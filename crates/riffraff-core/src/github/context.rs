//! Workflow run context, read from the `GITHUB_*` environment

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::Environment;
use crate::error::NotifyError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// What GitHub Actions tells a step about the run it belongs to
#[derive(Debug, Clone, Default)]
pub struct GithubContext {
    pub event_name: Option<String>,
    pub sha: Option<String>,
    pub git_ref: Option<String>,
    /// `owner/repo`
    pub repository: Option<String>,
    pub api_url: String,
    pub workspace: Option<PathBuf>,
    /// `owner/repo/.github/workflows/<file>@<ref>`
    pub workflow_ref: Option<String>,
    pub step_summary: Option<PathBuf>,
    /// The webhook event payload, `Null` when unavailable
    pub payload: Value,
}

impl GithubContext {
    pub fn from_env(env: &Environment) -> Self {
        let payload = env
            .var("GITHUB_EVENT_PATH")
            .map(|path| read_payload(Path::new(&path)))
            .unwrap_or(Value::Null);

        Self {
            event_name: env.var("GITHUB_EVENT_NAME"),
            sha: env.var("GITHUB_SHA"),
            git_ref: env.var("GITHUB_REF"),
            repository: env.var("GITHUB_REPOSITORY"),
            api_url: env
                .var("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            workspace: env.var("GITHUB_WORKSPACE").map(PathBuf::from),
            workflow_ref: env.var("GITHUB_WORKFLOW_REF"),
            step_summary: env.var("GITHUB_STEP_SUMMARY").map(PathBuf::from),
            payload,
        }
    }

    /// Split `owner/repo`
    pub fn repo(&self) -> Result<(&str, &str), NotifyError> {
        self.repository
            .as_deref()
            .and_then(|r| r.split_once('/'))
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
            .ok_or(NotifyError::MissingRepository)
    }

    pub fn is_pull_request_event(&self) -> bool {
        self.event_name.as_deref() == Some("pull_request")
    }

    /// `pull_request.number` from the event payload
    pub fn payload_pull_request(&self) -> Option<u64> {
        self.payload
            .get("pull_request")
            .and_then(|pr| pr.get("number"))
            .and_then(Value::as_u64)
    }
}

fn read_payload(path: &Path) -> Value {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("Ignoring event payload at {}: {}", path.display(), err);
            Value::Null
        }
    }
}

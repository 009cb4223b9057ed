use super::client::{GithubClient, PullRequest};
use super::comment::{marker, render};
use super::context::GithubContext;
use crate::config::PullRequestComment;
use crate::error::NotifyError;

const BOT_LOGIN: &str = "github-actions[bot]";
const HEADS_PREFIX: &str = "refs/heads/";

/// What the notifier did to the pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Created { pull_request: u64 },
    Updated { pull_request: u64, comments: usize },
}

/// Finds the run's pull request and keeps one status comment on it
pub struct PullRequestNotifier<'a> {
    client: &'a GithubClient,
    context: &'a GithubContext,
}

impl<'a> PullRequestNotifier<'a> {
    pub fn new(client: &'a GithubClient, context: &'a GithubContext) -> Self {
        Self { client, context }
    }

    /// The event payload's pull request, else the open pull request for the
    /// run's commit whose head matches the run's ref, else the first open one.
    pub async fn find_pull_request(&self) -> Result<Option<u64>, NotifyError> {
        if let Some(number) = self.context.payload_pull_request() {
            tracing::debug!(
                "Identified PR number as {} from payload. Trigger was {:?}.",
                number,
                self.context.event_name
            );
            return Ok(Some(number));
        }

        let Some(sha) = self.context.sha.as_deref() else {
            tracing::debug!("No commit SHA available, cannot look up pull requests");
            return Ok(None);
        };

        tracing::debug!("Attempting to get PR number from commit {}", sha);
        let pulls = self.client.pull_requests_for_commit(sha).await?;
        let number = choose_pull_request(&pulls, self.context.git_ref.as_deref());
        match number {
            Some(n) => tracing::debug!("Identified PR number as {} from commit", n),
            None => tracing::debug!("Failed to identify PR number from commit {}", sha),
        }
        Ok(number)
    }

    /// Update every marked bot comment, or create one if there are none
    pub async fn upsert_comment(
        &self,
        pull_request: u64,
        config: &PullRequestComment,
    ) -> Result<CommentOutcome, NotifyError> {
        let body = render(config);
        let marker = marker(&config.project_name);

        let comments = self.client.list_comments(pull_request).await?;
        tracing::debug!("Total comments: {}", comments.len());

        let previous: Vec<u64> = comments
            .iter()
            .filter(|c| c.user.as_ref().is_some_and(|u| u.login == BOT_LOGIN))
            .filter(|c| c.body.as_deref().is_some_and(|b| b.contains(&marker)))
            .map(|c| c.id)
            .collect();

        if previous.is_empty() {
            tracing::debug!("No previous comment found. Creating one.");
            self.client.create_comment(pull_request, &body).await?;
            return Ok(CommentOutcome::Created { pull_request });
        }

        for id in &previous {
            tracing::debug!("Updating comment with id: {}.", id);
            self.client.update_comment(*id, &body).await?;
        }
        Ok(CommentOutcome::Updated {
            pull_request,
            comments: previous.len(),
        })
    }

    /// Comment on the run's pull request, if there is one
    pub async fn notify(
        &self,
        config: &PullRequestComment,
    ) -> Result<Option<CommentOutcome>, NotifyError> {
        let Some(pull_request) = self.find_pull_request().await? else {
            tracing::info!("No pull request found for this run, not commenting");
            return Ok(None);
        };

        tracing::info!("Commenting on PR {}", pull_request);
        self.upsert_comment(pull_request, config).await.map(Some)
    }
}

fn choose_pull_request(pulls: &[PullRequest], git_ref: Option<&str>) -> Option<u64> {
    let branch = git_ref.and_then(|r| r.strip_prefix(HEADS_PREFIX));
    let open: Vec<&PullRequest> = pulls.iter().filter(|pr| pr.state == "open").collect();

    open.iter()
        .find(|pr| Some(pr.head.git_ref.as_str()) == branch)
        .or_else(|| open.first())
        .map(|pr| pr.number)
}

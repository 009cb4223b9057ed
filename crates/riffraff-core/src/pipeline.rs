//! End-to-end run: summary, stage, dry-run exit, upload, notify.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::config::Configuration;
use crate::error::StorageError;
use crate::fs::digest::ArtifactDigests;
use crate::github::annotate::{
    MISSING_ROLE_MESSAGE, access_denied_commands, access_denied_message, write_step_summary,
};
use crate::github::{CommentOutcome, GithubClient, GithubContext, PullRequestNotifier};
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::stage::{StagedTree, Stager};
use crate::storage::{ObjectStore, PublishReport, publish};

/// A staged file and its digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub path: String,
    pub digest: String,
}

/// Staging output, before anything leaves the machine
#[derive(Debug, Clone)]
pub struct Prepared {
    pub tree: StagedTree,
    pub manifest: Manifest,
    pub digests: ArtifactDigests,
}

impl Prepared {
    /// Staged files with digests, sorted by path
    pub fn entries(&self) -> Vec<StagedEntry> {
        self.digests
            .iter()
            .filter(|(path, _)| *path != MANIFEST_FILE)
            .map(|(path, digest)| StagedEntry {
                path: path.to_string(),
                digest: digest.to_string(),
            })
            .collect()
    }
}

/// What a run did
#[derive(Debug, Clone)]
pub enum RunOutcome {
    DryRun {
        staging_dir: PathBuf,
        files: Vec<StagedEntry>,
    },
    Uploaded {
        staging_dir: PathBuf,
        report: PublishReport,
        comment: Option<CommentOutcome>,
    },
}

pub struct Pipeline<'a> {
    configuration: &'a Configuration,
    context: &'a GithubContext,
    stager: Stager,
    start_time: DateTime<Utc>,
    annotate: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        configuration: &'a Configuration,
        context: &'a GithubContext,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            configuration,
            context,
            stager: Stager::new(working_dir),
            start_time: Utc::now(),
            annotate: false,
        }
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Print workflow commands (`::error ...`) for upload failures
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Write the job summary, stage the tree, and digest it
    pub fn prepare(&self) -> anyhow::Result<Prepared> {
        let cfg = self.configuration;

        if let Some(summary) = &self.context.step_summary {
            write_step_summary(summary, &cfg.project_name, &cfg.build_number)?;
        }

        let manifest = Manifest::for_configuration(cfg, self.start_time);
        let tree = self.stager.stage(cfg)?;

        let manifest_json = manifest.to_json().context("Failed to encode manifest")?;
        let digests = ArtifactDigests::of_tree(tree.root())?.with_manifest(&manifest_json);

        Ok(Prepared {
            tree,
            manifest,
            digests,
        })
    }

    /// Publish a prepared tree, logging a hint on failure
    pub async fn upload<S: ObjectStore>(
        &self,
        prepared: &Prepared,
        store: Arc<S>,
    ) -> anyhow::Result<PublishReport> {
        for (path, digest) in prepared.digests.iter() {
            tracing::debug!("blake3 {} {}", digest, path);
        }

        match publish(store, prepared.tree.root(), &prepared.manifest).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.report_upload_error(&err);
                Err(err.into())
            }
        }
    }

    fn report_upload_error(&self, err: &StorageError) {
        let project = &self.configuration.project_name;
        if err.is_access_denied() {
            tracing::error!("{}", access_denied_message(project));
            if self.annotate {
                for command in access_denied_commands(self.context, project) {
                    println!("{}", command);
                }
            }
        } else {
            tracing::error!("{}", MISSING_ROLE_MESSAGE);
        }
    }

    /// Comment on the pull request when a GitHub token was supplied
    pub async fn notify(&self) -> anyhow::Result<Option<CommentOutcome>> {
        let Some(comment) = &self.configuration.pull_request_comment else {
            tracing::info!("No githubToken supplied, skipping pull request comment");
            return Ok(None);
        };

        let (owner, repo) = self.context.repo()?;
        let client = GithubClient::new(&self.context.api_url, &comment.github_token, owner, repo)?;
        let outcome = PullRequestNotifier::new(&client, self.context)
            .notify(comment)
            .await
            .context("Failed to comment on pull request")?;
        Ok(outcome)
    }

    /// Run every stage. `connect` is only called when uploading.
    pub async fn run<S, F, Fut>(&self, connect: F) -> anyhow::Result<RunOutcome>
    where
        S: ObjectStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Arc<S>>,
    {
        let prepared = self.prepare()?;
        let staging_dir = prepared.tree.root().to_path_buf();

        if self.configuration.dry_run {
            tracing::info!("Output (dryRun=true):");
            return Ok(RunOutcome::DryRun {
                staging_dir,
                files: prepared.entries(),
            });
        }

        let store = connect().await;
        let report = self.upload(&prepared, store).await?;
        let comment = self.notify().await?;

        Ok(RunOutcome::Uploaded {
            staging_dir,
            report,
            comment,
        })
    }
}

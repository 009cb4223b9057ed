//! Configuration reconciliation
//!
//! Turns raw inputs into exactly one [`Configuration`], or a
//! [`ConfigError`] naming what is missing or inconsistent. Nothing here
//! touches the staging directory or the network; the only I/O is reading a
//! descriptor from `configPath`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::content::{ContentDirectories, Deployment};
use super::descriptor::{DeploymentDescriptor, DeploymentSpec};
use super::env::{self, DEV, VcsInfo};
use super::source::{ConfigSource, Environment};
use crate::error::{ConfigError, ConfigResult};

/// Input names understood by the reconciler
pub mod inputs {
    pub const APP: &str = "app";
    pub const PROJECT_NAME: &str = "projectName";
    pub const CONFIG: &str = "config";
    pub const CONFIG_PATH: &str = "configPath";
    pub const CONTENT_DIRECTORIES: &str = "contentDirectories";
    pub const DRY_RUN: &str = "dryRun";
    pub const BUILD_NUMBER: &str = "buildNumber";
    pub const BUILD_NUMBER_OFFSET: &str = "buildNumberOffset";
    pub const STAGING_DIR: &str = "stagingDir";
    pub const ROLE_ARN: &str = "roleArn";
    pub const GITHUB_TOKEN: &str = "githubToken";
    pub const COMMENTING_STAGE: &str = "commentingStage";
}

/// Stage linked from pull request comments when none is given
pub const DEFAULT_COMMENTING_STAGE: &str = "CODE";

/// Everything the pull request comment needs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestComment {
    pub project_name: String,
    pub build_number: String,
    pub commenting_stage: String,
    #[serde(skip)]
    pub github_token: String,
}

/// Fully resolved configuration for one invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub project_name: String,
    /// Serialises without any `sources` fields
    #[serde(rename = "riffRaffYaml")]
    pub descriptor: DeploymentDescriptor,
    pub dry_run: bool,
    pub build_number: String,
    pub branch_name: String,
    #[serde(rename = "vcsURL")]
    pub vcs_url: String,
    pub revision: String,
    pub deployments: Vec<Deployment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir_override: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    /// `None` when no GitHub token was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_comment: Option<PullRequestComment>,
}

/// Resolves a [`Configuration`] from inputs and environment
pub struct ConfigReconciler<'a> {
    inputs: &'a dyn ConfigSource,
    env: &'a Environment,
}

impl<'a> ConfigReconciler<'a> {
    pub fn new(inputs: &'a dyn ConfigSource, env: &'a Environment) -> Self {
        Self { inputs, env }
    }

    fn input(&self, name: &str) -> Option<String> {
        self.inputs.get(name)
    }

    pub fn reconcile(&self) -> ConfigResult<Configuration> {
        let descriptor = self.descriptor()?;

        let project_name = project_name(
            self.input(inputs::APP).as_deref(),
            self.input(inputs::PROJECT_NAME).as_deref(),
            &descriptor.stacks(),
        )?;

        let content_directories = self
            .input(inputs::CONTENT_DIRECTORIES)
            .map(|raw| ContentDirectories::parse_non_empty(&raw))
            .transpose()?;
        let deployments = resolve_deployments(&descriptor, content_directories)?;

        let base_build_number = self
            .input(inputs::BUILD_NUMBER)
            .or_else(|| env::run_number(self.env))
            .unwrap_or_else(|| DEV.to_string());
        let build_number = offset_build_number(
            &base_build_number,
            self.input(inputs::BUILD_NUMBER_OFFSET).as_deref(),
        );

        let vcs = VcsInfo::from_env(self.env);

        let pull_request_comment =
            self.input(inputs::GITHUB_TOKEN)
                .map(|github_token| PullRequestComment {
                    project_name: project_name.clone(),
                    build_number: build_number.clone(),
                    commenting_stage: self
                        .input(inputs::COMMENTING_STAGE)
                        .unwrap_or_else(|| DEFAULT_COMMENTING_STAGE.to_string()),
                    github_token,
                });

        let configuration = Configuration {
            project_name,
            descriptor,
            dry_run: self.input(inputs::DRY_RUN).as_deref() == Some("true"),
            build_number,
            branch_name: vcs.branch_name,
            vcs_url: vcs.vcs_url,
            revision: vcs.revision,
            deployments,
            staging_dir_override: self.input(inputs::STAGING_DIR).map(PathBuf::from),
            role_arn: self.input(inputs::ROLE_ARN),
            pull_request_comment,
        };

        tracing::debug!(
            project = %configuration.project_name,
            build = %configuration.build_number,
            deployments = configuration.deployments.len(),
            "Resolved configuration"
        );

        Ok(configuration)
    }

    /// Exactly one of `config` and `configPath` must be given.
    fn descriptor(&self) -> ConfigResult<DeploymentDescriptor> {
        match (self.input(inputs::CONFIG), self.input(inputs::CONFIG_PATH)) {
            (Some(text), None) => DeploymentDescriptor::parse(&text),
            (None, Some(path)) => DeploymentDescriptor::load(Path::new(&path)),
            (None, None) => Err(ConfigError::MissingDescriptorSource),
            (Some(_), Some(config_path)) => {
                Err(ConfigError::ConflictingDescriptorSources { config_path })
            }
        }
    }
}

/// Project identity.
///
/// An explicit `projectName` wins outright. Otherwise the name is
/// `<stack>::<app>`, which needs exactly one root-level stack: the
/// descriptor format also allows stacks per deployment, so the root list is
/// only a reliable source when it names a single stack.
pub fn project_name(
    app: Option<&str>,
    explicit: Option<&str>,
    stacks: &[String],
) -> ConfigResult<String> {
    if app.is_none() && explicit.is_none() {
        return Err(ConfigError::MissingIdentity);
    }

    if let Some(name) = explicit {
        return Ok(name.to_string());
    }

    match (stacks, app) {
        ([stack], Some(app)) => Ok(format!("{}::{}", stack, app)),
        _ => Err(ConfigError::AmbiguousStacks {
            stacks: stacks.to_vec(),
        }),
    }
}

/// Apply an integer offset to a build number.
///
/// Both values are read by their leading integer, so `"5.0"` and `"5abc"`
/// count as 5. Returns `base` unchanged when there is no offset, when either
/// value has no leading integer, or when the sum overflows.
pub fn offset_build_number(base: &str, offset: Option<&str>) -> String {
    let Some(offset) = offset else {
        return base.to_string();
    };

    match (leading_integer(base), leading_integer(offset)) {
        (Some(number), Some(offset)) => number
            .checked_add(offset)
            .map(|sum| sum.to_string())
            .unwrap_or_else(|| base.to_string()),
        _ => base.to_string(),
    }
}

/// Optional leading whitespace and sign, then at least one digit
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len() - sign_len);
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

/// Merge the two deployment shapes into one list.
///
/// With a content-directory mapping, its entries come first (in input
/// order); descriptor entries that embed their own sources follow, and a name
/// present in both gets both source lists. Without one, every descriptor
/// entry becomes a deployment carrying its embedded sources.
pub fn resolve_deployments(
    descriptor: &DeploymentDescriptor,
    content_directories: Option<ContentDirectories>,
) -> ConfigResult<Vec<Deployment>> {
    let specs = descriptor.deployments();

    let Some(content_directories) = content_directories else {
        let deployments: Vec<Deployment> = specs
            .into_iter()
            .map(|spec| Deployment::new(spec.name, spec.sources.unwrap_or_default()))
            .collect();
        if deployments.iter().all(|d| d.sources.is_empty()) {
            tracing::warn!("No deployment declares any sources; only the descriptor will be uploaded");
        }
        return Ok(deployments);
    };

    validate_deployment_names(&specs, &content_directories)?;

    let mut deployments = content_directories.into_deployments();
    for spec in specs {
        let Some(embedded) = spec.sources else {
            continue;
        };
        match deployments.iter_mut().find(|d| d.name == spec.name) {
            Some(existing) => existing.sources.extend(embedded),
            None => deployments.push(Deployment::new(spec.name, embedded)),
        }
    }

    Ok(deployments)
}

/// Cross-check descriptor deployments against content-directory names.
///
/// Reports content directories with no deployment of the same name, and
/// deployments that need a content directory but have none. Entries whose
/// only field is `actions`, and entries embedding their own `sources`, need
/// no content directory.
pub fn validate_deployment_names(
    specs: &[DeploymentSpec],
    content_directories: &ContentDirectories,
) -> ConfigResult<()> {
    let declared: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    let supplied: HashSet<&str> = content_directories.names().collect();

    let undefined: Vec<String> = content_directories
        .names()
        .filter(|name| !declared.contains(name))
        .map(str::to_string)
        .collect();

    let unmatched: Vec<String> = specs
        .iter()
        .filter(|spec| spec.expects_content_directory())
        .filter(|spec| !supplied.contains(spec.name.as_str()))
        .map(|spec| spec.name.clone())
        .collect();

    if undefined.is_empty() && unmatched.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::DeploymentMismatch {
            undefined,
            unmatched,
        })
    }
}

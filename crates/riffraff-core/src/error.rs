//! Error taxonomy for the upload pipeline.
//!
//! Three failure classes, in the order a run can hit them:
//! - [`ConfigError`]: pre-flight, raised before anything touches disk or network
//! - [`StorageError`]: raised while pushing the staged tree to object storage
//! - [`NotifyError`]: raised while locating or commenting on the pull request

use std::path::PathBuf;

/// Result type for configuration resolution
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration errors. Every variant names the values at fault.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Must specify either config or configPath.")]
    MissingDescriptorSource,

    #[error("Only one of config or configPath may be specified (configPath: {config_path}).")]
    ConflictingDescriptorSources { config_path: String },

    #[error("Failed to read deployment descriptor {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse deployment descriptor: {0}")]
    DescriptorParse(#[source] serde_yaml::Error),

    #[error("Invalid deployment descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Must specify either app or projectName.")]
    MissingIdentity,

    #[error(
        "Unable to determine project name as 'projectName' is not set and unable to determine a unique stack value from the loaded config (stacks: [{}]). If deploying to multiple stacks, explicitly set the 'projectName' input.",
        .stacks.join(",")
    )]
    AmbiguousStacks { stacks: Vec<String> },

    #[error("Invalid contentDirectories. Each value must be a list of sources, but got: {input}")]
    InvalidContentDirectories { input: String },

    #[error("Not configured with any deployment sources, no files will be uploaded to Riff-Raff.")]
    NoDeploymentSources,

    #[error("{}", describe_mismatch(.undefined, .unmatched))]
    DeploymentMismatch {
        /// Content directories with no deployment of the same name
        undefined: Vec<String>,
        /// Deployments that expect a content directory but have none
        unmatched: Vec<String>,
    },
}

fn describe_mismatch(undefined: &[String], unmatched: &[String]) -> String {
    let mut parts = Vec::new();
    if !undefined.is_empty() {
        parts.push(format!(
            "content directories not defined in the deployment descriptor: {}",
            undefined.join(", ")
        ));
    }
    if !unmatched.is_empty() {
        parts.push(format!(
            "deployments with no matching content directories: {}",
            unmatched.join(", ")
        ));
    }
    format!("Deployment mismatch: {}", parts.join("; "))
}

/// Object storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Access denied writing s3://{bucket}/{key}")]
    AccessDenied { bucket: String, key: String },

    #[error("Failed to write s3://{bucket}/{key}: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("{failed} of {total} artifact uploads failed; first failure: {first}")]
    Incomplete {
        failed: usize,
        total: usize,
        #[source]
        first: Box<StorageError>,
    },

    #[error("Failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// True when the failure (or the first failure of a batch) was a permissions problem.
    pub fn is_access_denied(&self) -> bool {
        match self {
            StorageError::AccessDenied { .. } => true,
            StorageError::Incomplete { first, .. } => first.is_access_denied(),
            _ => false,
        }
    }
}

/// Pull request notification failures
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("GitHub request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GITHUB_REPOSITORY is not set, cannot address the repository")]
    MissingRepository,

    #[error("Invalid GitHub API URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_both_sides() {
        let err = ConfigError::DeploymentMismatch {
            undefined: vec!["extra".to_string()],
            unmatched: vec!["lambda".to_string(), "cfn".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("not defined in the deployment descriptor: extra"));
        assert!(msg.contains("no matching content directories: lambda, cfn"));
    }

    #[test]
    fn test_mismatch_message_one_side() {
        let err = ConfigError::DeploymentMismatch {
            undefined: vec![],
            unmatched: vec!["lambda".to_string()],
        };
        let msg = err.to_string();
        assert!(!msg.contains("not defined in the deployment descriptor"));
        assert!(msg.contains("lambda"));
    }

    #[test]
    fn test_ambiguous_stacks_lists_stacks() {
        let err = ConfigError::AmbiguousStacks {
            stacks: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("stacks: [a,b]"));
    }

    #[test]
    fn test_access_denied_seen_through_incomplete() {
        let err = StorageError::Incomplete {
            failed: 2,
            total: 5,
            first: Box::new(StorageError::AccessDenied {
                bucket: "b".to_string(),
                key: "k".to_string(),
            }),
        };
        assert!(err.is_access_denied());
    }
}

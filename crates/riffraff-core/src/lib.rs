//! Riff-Raff artifact upload
//!
//! Reconciles a deployment descriptor with content directories, stages the
//! artifacts, uploads them with a build manifest, and comments on the pull
//! request that triggered the build.
//!
//! # Modules
//! - `config`: input sources, descriptor, content directories, reconciliation
//! - `manifest`: the `build.json` record
//! - `stage`: the local staging tree
//! - `fs`: directory walking and artifact digests
//! - `storage`: object storage and the upload order
//! - `github`: pull request comments, annotations, job summary
//! - `pipeline`: the end-to-end run
//! - `error`: error types

pub mod config;
pub mod error;
pub mod fs;
pub mod github;
pub mod manifest;
pub mod pipeline;
pub mod stage;
pub mod storage;

pub mod prelude {
    pub use crate::config::{
        ActionInputs, ConfigReconciler, ConfigSource, Configuration, Deployment,
        DeploymentDescriptor, Environment, LayeredSource, MapSource,
    };
    pub use crate::error::{ConfigError, NotifyError, StorageError};
    pub use crate::github::GithubContext;
    pub use crate::manifest::Manifest;
    pub use crate::pipeline::{Pipeline, RunOutcome};
    pub use crate::storage::{MemoryStore, ObjectStore, S3Store};
}

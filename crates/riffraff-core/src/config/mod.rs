//! Configuration resolution
//!
//! Two independently authored inputs feed one [`Configuration`]:
//! - the deployment descriptor (`config` or `configPath`)
//! - the optional content-directory mapping (`contentDirectories`)
//!
//! Raw values come from a [`ConfigSource`]; CI coordinates come from an
//! [`Environment`] snapshot.

pub mod content;
pub mod descriptor;
pub mod env;
pub mod reconcile;
pub mod sanitize;
pub mod source;

pub use content::{ContentDirectories, Deployment};
pub use descriptor::{DeploymentDescriptor, DeploymentSpec};
pub use env::VcsInfo;
pub use reconcile::{
    ConfigReconciler, Configuration, PullRequestComment, inputs, offset_build_number,
    project_name, resolve_deployments, validate_deployment_names,
};
pub use sanitize::{strip_key, without_sources};
pub use source::{ActionInputs, ConfigSource, Environment, LayeredSource, MapSource};

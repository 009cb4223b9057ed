//! Content-directory mapping
//!
//! `contentDirectories` maps a deployment name to the paths whose files make
//! up that deployment's artifacts:
//!
//! ```yaml
//! upload:
//!   - test-data
//! cdk.out:
//!   - cdk.out
//! ```
//!
//! A list of single-entry mappings (`- upload: [test-data]`) is read the same
//! way; a name repeated across list items gets the sources of each.

use serde::Serialize;
use serde_yaml::Value;

use super::descriptor::{is_plain_name, kind_of};
use crate::error::{ConfigError, ConfigResult};

/// A deployment resolved to the paths staged for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub name: String,
    pub sources: Vec<String>,
}

impl Deployment {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

/// Parsed content-directory mapping, in input order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentDirectories {
    entries: Vec<Deployment>,
}

impl ContentDirectories {
    /// Parse the raw input. Every value must be a list of path strings.
    pub fn parse(input: &str) -> ConfigResult<Self> {
        let invalid = || ConfigError::InvalidContentDirectories {
            input: input.to_string(),
        };

        if input.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = serde_yaml::from_str(input).map_err(|_| invalid())?;
        let pairs: Vec<(Value, Value)> = match document {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping.into_iter().collect(),
            // `- name: [paths]` list of single-entry mappings
            Value::Sequence(items) => {
                let mut pairs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Mapping(mapping) => pairs.extend(mapping),
                        other => {
                            tracing::debug!(
                                "contentDirectories list item is {}, expected a mapping",
                                kind_of(&other)
                            );
                            return Err(invalid());
                        }
                    }
                }
                pairs
            }
            other => {
                tracing::debug!("contentDirectories is {}, expected a mapping", kind_of(&other));
                return Err(invalid());
            }
        };

        let mut entries: Vec<Deployment> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let name = match key {
                Value::String(name) if is_plain_name(&name) => name,
                other => {
                    tracing::debug!("contentDirectories has invalid deployment name {:?}", other);
                    return Err(invalid());
                }
            };
            let items = match value {
                Value::Sequence(items) => items,
                other => {
                    tracing::debug!(
                        "contentDirectories.{} is {}, expected a list",
                        name,
                        kind_of(&other)
                    );
                    return Err(invalid());
                }
            };
            let sources = items
                .into_iter()
                .map(|item| match item {
                    Value::String(path) => Ok(path.trim().to_string()),
                    _ => Err(invalid()),
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            match entries.iter_mut().find(|d| d.name == name) {
                Some(existing) => existing.sources.extend(sources),
                None => entries.push(Deployment { name, sources }),
            }
        }

        Ok(Self { entries })
    }

    /// Parse and require at least one source path across all entries
    pub fn parse_non_empty(input: &str) -> ConfigResult<Self> {
        let dirs = Self::parse(input)?;
        if dirs.total_sources() == 0 {
            return Err(ConfigError::NoDeploymentSources);
        }
        Ok(dirs)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name.as_str())
    }

    pub fn total_sources(&self) -> usize {
        self.entries.iter().map(|d| d.sources.len()).sum()
    }

    pub fn into_deployments(self) -> Vec<Deployment> {
        self.entries
    }
}

//! Deployment descriptor (`riff-raff.yaml`) loading
//!
//! The descriptor is kept as a YAML tree so that it can be written back out
//! for the deployment tool with every field it did not need to understand
//! intact. Typed accessors read the handful of fields this tool relies on.

use std::path::{Component, Path};

use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};

use super::sanitize::{SOURCES_KEY, without_sources};
use crate::error::{ConfigError, ConfigResult};

const STACKS_KEY: &str = "stacks";
const REGIONS_KEY: &str = "regions";
const DEPLOYMENTS_KEY: &str = "deployments";
const ACTIONS_KEY: &str = "actions";

/// A parsed deployment descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDescriptor {
    document: Mapping,
}

/// One entry of the descriptor's `deployments` mapping
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSpec {
    pub name: String,
    /// Every field of the entry except `sources`
    pub fields: Mapping,
    /// Embedded `sources`, trimmed; `None` when the entry has no such field
    pub sources: Option<Vec<String>>,
}

impl DeploymentSpec {
    /// True when the entry's only field is `actions`.
    pub fn is_actions_only(&self) -> bool {
        self.sources.is_none() && self.fields.len() == 1 && self.fields.contains_key(ACTIONS_KEY)
    }

    /// True when the entry needs files from a content directory
    pub fn expects_content_directory(&self) -> bool {
        !self.is_actions_only() && self.sources.is_none()
    }
}

impl DeploymentDescriptor {
    /// Parse descriptor text
    pub fn parse(text: &str) -> ConfigResult<Self> {
        if text.trim().is_empty() {
            return Self::from_value(Value::Null);
        }
        let document: Value = serde_yaml::from_str(text).map_err(ConfigError::DescriptorParse)?;
        Self::from_value(document)
    }

    /// Read and parse a descriptor file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::DescriptorRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Validate a YAML tree and apply root defaults
    pub fn from_value(document: Value) -> ConfigResult<Self> {
        let document = match document {
            Value::Null => Mapping::new(),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(ConfigError::InvalidDescriptor(format!(
                    "expected a mapping at the root, got {}",
                    kind_of(&other)
                )));
            }
        };

        let descriptor = Self {
            document: apply_defaults(document),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Root-level stacks. Empty when the descriptor declares stacks per deployment.
    pub fn stacks(&self) -> Vec<String> {
        string_list(self.document.get(STACKS_KEY))
    }

    /// Declared deployments in document order
    pub fn deployments(&self) -> Vec<DeploymentSpec> {
        let Some(Value::Mapping(deployments)) = self.document.get(DEPLOYMENTS_KEY) else {
            return Vec::new();
        };

        deployments
            .iter()
            .filter_map(|(key, value)| {
                let name = key.as_str()?.to_string();
                let mut fields = value.as_mapping().cloned().unwrap_or_default();
                let sources = fields
                    .shift_remove(SOURCES_KEY)
                    .map(|sources| {
                        string_list(Some(&sources))
                            .into_iter()
                            .map(|path| path.trim().to_string())
                            .collect()
                    });
                Some(DeploymentSpec {
                    name,
                    fields,
                    sources,
                })
            })
            .collect()
    }

    /// The descriptor tree with every `sources` field removed
    pub fn sanitized(&self) -> Value {
        without_sources(&Value::Mapping(self.document.clone()))
    }

    /// Serialise the sanitised descriptor for the deployment tool
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> ConfigResult<()> {
        for key in [STACKS_KEY, REGIONS_KEY] {
            if let Some(value) = self.document.get(key) {
                ensure_string_list(value, key)?;
            }
        }

        match self.document.get(DEPLOYMENTS_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(deployments)) => {
                for (key, value) in deployments {
                    let name = key.as_str().ok_or_else(|| {
                        ConfigError::InvalidDescriptor(format!(
                            "deployment names must be strings, got {:?}",
                            key
                        ))
                    })?;
                    if !is_plain_name(name) {
                        return Err(ConfigError::InvalidDescriptor(format!(
                            "deployment name '{}' must be a single path component",
                            name
                        )));
                    }
                    let entry = value.as_mapping().ok_or_else(|| {
                        ConfigError::InvalidDescriptor(format!(
                            "deployment '{}' must be a mapping, got {}",
                            name,
                            kind_of(value)
                        ))
                    })?;
                    if let Some(sources) = entry.get(SOURCES_KEY) {
                        ensure_string_list(sources, &format!("deployments.{}.sources", name))?;
                    }
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidDescriptor(format!(
                    "deployments must be a mapping, got {}",
                    kind_of(other)
                )));
            }
        }

        Ok(())
    }
}

/// Serialises the sanitised tree, never the embedded `sources`
impl Serialize for DeploymentDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sanitized().serialize(serializer)
    }
}

/// Give absent root fields their defaults. Present fields are left alone.
fn apply_defaults(document: Mapping) -> Mapping {
    if document.contains_key(STACKS_KEY) {
        return document;
    }

    let mut with_defaults = Mapping::new();
    with_defaults.insert(Value::from(STACKS_KEY), Value::Sequence(Vec::new()));
    with_defaults.extend(document);
    with_defaults
}

fn ensure_string_list(value: &Value, field: &str) -> ConfigResult<()> {
    let items = value.as_sequence().ok_or_else(|| {
        ConfigError::InvalidDescriptor(format!(
            "{} must be a list, got {}",
            field,
            kind_of(value)
        ))
    })?;
    if let Some(bad) = items.iter().find(|item| !item.is_string()) {
        return Err(ConfigError::InvalidDescriptor(format!(
            "{} must only contain strings, got {}",
            field,
            kind_of(bad)
        )));
    }
    Ok(())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Deployment names become directories under the staging root
pub(crate) fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

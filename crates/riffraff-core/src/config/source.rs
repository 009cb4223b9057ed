//! Raw input retrieval
//!
//! Inputs are a flat mapping from name to optional string. Blank values count
//! as absent, and every value is trimmed, matching how GitHub Actions hands
//! inputs to a step.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde_yaml::Value;

/// A source of named string inputs
pub trait ConfigSource {
    /// Look up an input. Returns `None` for missing or blank values.
    fn get(&self, name: &str) -> Option<String>;
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Snapshot of process environment variables
///
/// The core never reads `std::env` directly; callers capture an
/// `Environment` once and pass it down, so tests can inject their own.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed, non-blank value of a variable
    pub fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).and_then(|v| non_blank(v))
    }

    /// True when running as a GitHub Actions step
    pub fn is_github_actions(&self) -> bool {
        self.var("GITHUB_ACTIONS").as_deref() == Some("true")
    }
}

/// GitHub Actions step inputs, read from `INPUT_<NAME>` variables
#[derive(Debug, Clone)]
pub struct ActionInputs {
    env: Environment,
}

impl ActionInputs {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Variable name GitHub Actions uses for an input
    pub fn variable_name(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }
}

impl ConfigSource for ActionInputs {
    fn get(&self, name: &str) -> Option<String> {
        self.env.var(&Self::variable_name(name))
    }
}

/// In-memory inputs
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Parse `NAME=VALUE` pairs as given on the command line
    pub fn from_assignments<S: AsRef<str>>(pairs: &[S]) -> anyhow::Result<Self> {
        let mut source = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Invalid input '{}', expected NAME=VALUE", pair))?;
            if name.trim().is_empty() {
                anyhow::bail!("Invalid input '{}', name is empty", pair);
            }
            source.insert(name.trim(), value);
        }
        Ok(source)
    }

    /// Load a YAML inputs file
    ///
    /// The file is a flat mapping. Scalars are stringified; nested mappings
    /// and sequences are re-serialised to YAML text, so a content-directory
    /// mapping can be written inline.
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inputs file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse inputs file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let document: Value = serde_yaml::from_str(content)?;
        let mapping = match document {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(mapping) => mapping,
            _ => anyhow::bail!("Inputs file must be a mapping of input names to values"),
        };

        let mut source = Self::new();
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Input names must be strings, got {:?}", key))?
                .to_string();
            if let Some(text) = stringify(value)? {
                source.insert(name, text);
            }
        }
        Ok(source)
    }
}

fn stringify(value: Value) -> anyhow::Result<Option<String>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s),
        Value::Tagged(tagged) => stringify(tagged.value)?,
        nested @ (Value::Sequence(_) | Value::Mapping(_)) => Some(serde_yaml::to_string(&nested)?),
    })
}

impl ConfigSource for MapSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).and_then(|v| non_blank(v))
    }
}

/// Layers of sources; the first layer with a value wins
#[derive(Default)]
pub struct LayeredSource {
    layers: Vec<Box<dyn ConfigSource + Send + Sync>>,
}

impl LayeredSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer with lower precedence than those already present
    pub fn then(mut self, source: impl ConfigSource + Send + Sync + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }
}

impl ConfigSource for LayeredSource {
    fn get(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(name))
    }
}

//! Build manifest (`build.json`)
//!
//! The manifest is the object whose arrival tells the deployment tool a new
//! build exists, so it is always the last thing uploaded.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::config::Configuration;

/// Identifies this tool in the manifest
pub const BUILD_TOOL: &str = "riffraff-upload";

/// File name of the manifest object under the key prefix
pub const MANIFEST_FILE: &str = "build.json";

/// Build identity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub branch: String,
    #[serde(rename = "vcsURL")]
    pub vcs_url: String,
    pub revision: String,
    #[serde(rename = "buildNumber")]
    pub build_number: String,
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "startTime", serialize_with = "serialize_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "buildTool")]
    pub build_tool: String,
}

impl Manifest {
    pub fn new(
        project_name: impl Into<String>,
        build_number: impl Into<String>,
        branch: impl Into<String>,
        vcs_url: impl Into<String>,
        revision: impl Into<String>,
        build_tool: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            branch: branch.into(),
            vcs_url: vcs_url.into(),
            revision: revision.into(),
            build_number: build_number.into(),
            project_name: project_name.into(),
            start_time,
            build_tool: build_tool.into(),
        }
    }

    /// Manifest for a resolved configuration, stamped with `start_time`
    pub fn for_configuration(configuration: &Configuration, start_time: DateTime<Utc>) -> Self {
        Self::new(
            configuration.project_name.as_str(),
            configuration.build_number.as_str(),
            configuration.branch_name.as_str(),
            configuration.vcs_url.as_str(),
            configuration.revision.as_str(),
            BUILD_TOOL,
            start_time,
        )
    }

    /// `<projectName>/<buildNumber>`
    pub fn key_prefix(&self) -> String {
        format!("{}/{}", self.project_name, self.build_number)
    }

    /// Storage key of the manifest object itself
    pub fn key(&self) -> String {
        format!("{}/{}", self.key_prefix(), MANIFEST_FILE)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn serialize_millis<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Manifest {
        let start = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 5)
            .single()
            .expect("valid timestamp");
        Manifest::new(
            "deploy::foo",
            "42",
            "main",
            "https://github.com/guardian/foo",
            "abc123",
            BUILD_TOOL,
            start,
        )
    }

    #[test]
    fn test_key_prefix() {
        let manifest = sample();
        assert_eq!(manifest.key_prefix(), "deploy::foo/42");
        assert_eq!(manifest.key(), "deploy::foo/42/build.json");
    }

    #[test]
    fn test_json_keys_and_order() {
        let json = String::from_utf8(sample().to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"branch":"main","vcsURL":"https://github.com/guardian/foo","revision":"abc123","buildNumber":"42","projectName":"deploy::foo","startTime":"2024-03-01T12:30:05.000Z","buildTool":"riffraff-upload"}"#
        );
    }
}

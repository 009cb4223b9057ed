//! VCS coordinates from the CI environment
//!
//! Each value falls back to [`DEV`] when the variable is unset or blank,
//! so a local run still produces a complete manifest.

use super::source::Environment;

/// Placeholder used for anything the environment cannot supply
pub const DEV: &str = "dev";

/// Branch that triggered the run.
///
/// `GITHUB_HEAD_REF` is only set on pull request events and holds the bare
/// branch name; `GITHUB_REF` is a full ref such as `refs/heads/feature-1` or
/// `refs/pull/259/merge`. Either may be empty.
pub fn branch_name(env: &Environment) -> Option<String> {
    env.var("GITHUB_HEAD_REF")
        .or_else(|| env.var("GITHUB_REF"))
        .map(|branch| branch.replacen("refs/heads/", "", 1))
}

/// Web URL of the repository
pub fn vcs_url(env: &Environment) -> Option<String> {
    env.var("GITHUB_REPOSITORY")
        .map(|repo| format!("https://github.com/{}", repo))
}

/// Commit being built
pub fn revision(env: &Environment) -> Option<String> {
    env.var("GITHUB_SHA")
}

/// Workflow run counter
pub fn run_number(env: &Environment) -> Option<String> {
    env.var("GITHUB_RUN_NUMBER")
}

/// VCS coordinates with fallbacks applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsInfo {
    pub branch_name: String,
    pub vcs_url: String,
    pub revision: String,
}

impl VcsInfo {
    pub fn from_env(env: &Environment) -> Self {
        Self {
            branch_name: branch_name(env).unwrap_or_else(|| DEV.to_string()),
            vcs_url: vcs_url(env).unwrap_or_else(|| DEV.to_string()),
            revision: revision(env).unwrap_or_else(|| DEV.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_ref_preferred() {
        let env = Environment::from_pairs([
            ("GITHUB_HEAD_REF", "feature-1"),
            ("GITHUB_REF", "refs/pull/259/merge"),
        ]);
        assert_eq!(branch_name(&env), Some("feature-1".to_string()));
    }

    #[test]
    fn test_ref_heads_prefix_stripped() {
        let env = Environment::from_pairs([
            ("GITHUB_HEAD_REF", ""),
            ("GITHUB_REF", "refs/heads/main"),
        ]);
        assert_eq!(branch_name(&env), Some("main".to_string()));
    }

    #[test]
    fn test_pull_ref_kept_verbatim() {
        let env = Environment::from_pairs([("GITHUB_REF", "refs/pull/259/merge")]);
        assert_eq!(branch_name(&env), Some("refs/pull/259/merge".to_string()));
    }

    #[test]
    fn test_defaults_to_dev() {
        let info = VcsInfo::from_env(&Environment::default());
        assert_eq!(info.branch_name, "dev");
        assert_eq!(info.vcs_url, "dev");
        assert_eq!(info.revision, "dev");
    }

    #[test]
    fn test_vcs_url_from_repository() {
        let env = Environment::from_pairs([
            ("GITHUB_REPOSITORY", " guardian/example "),
            ("GITHUB_SHA", "abc123"),
        ]);
        let info = VcsInfo::from_env(&env);
        assert_eq!(info.vcs_url, "https://github.com/guardian/example");
        assert_eq!(info.revision, "abc123");
    }
}

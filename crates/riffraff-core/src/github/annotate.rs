//! Workflow commands and the job summary
//!
//! See the GitHub Actions "workflow commands" reference for the escaping
//! rules of `::error` lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use super::context::GithubContext;

const WORKFLOWS_DIR: &str = ".github/workflows/";
const ANNOTATION_TITLE: &str = "Error uploading to Riff-Raff";

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// `::error::<message>`
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// `::error file=..,line=..,title=..::<message>`
pub fn file_error_command(message: &str, file: &str, line: usize, title: &str) -> String {
    format!(
        "::error file={},line={},endLine={},title={}::{}",
        escape_property(file),
        line,
        line,
        escape_property(title),
        escape_data(message)
    )
}

pub fn access_denied_message(project_name: &str) -> String {
    format!(
        "Error uploading to Riff-Raff. Have you added {} to the Riff-Raff platform configuration?",
        project_name
    )
}

pub const MISSING_ROLE_MESSAGE: &str =
    "Error uploading to Riff-Raff. Does the repository have an IAM Role?";

/// Workflow file path relative to the repository root, from
/// `owner/repo/.github/workflows/<file>.yml@<ref>`
pub fn workflow_file(workflow_ref: &str) -> Option<String> {
    let without_ref = workflow_ref.split('@').next().unwrap_or(workflow_ref);
    let start = without_ref.find(WORKFLOWS_DIR)?;
    let path = &without_ref[start..];
    let name = &path[WORKFLOWS_DIR.len()..];

    let stem = name
        .strip_suffix(".yml")
        .or_else(|| name.strip_suffix(".yaml"))?;
    if stem.is_empty() || stem.contains('/') {
        return None;
    }
    Some(path.to_string())
}

/// One annotation per workflow line that mentions the project
pub fn project_annotations(project_name: &str, file: &str, content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(project_name))
        .map(|(index, _)| {
            file_error_command(
                &access_denied_message(project_name),
                file,
                index + 1,
                ANNOTATION_TITLE,
            )
        })
        .collect()
}

/// Workflow commands to print for an access-denied upload.
///
/// Annotations only show in a pull request, so outside `pull_request`
/// events, or when the workflow file can't be read, this is a single plain
/// error.
pub fn access_denied_commands(context: &GithubContext, project_name: &str) -> Vec<String> {
    let fallback = || vec![error_command(&access_denied_message(project_name))];

    if !context.is_pull_request_event() {
        return fallback();
    }

    let (Some(file), Some(workspace)) = (
        context.workflow_ref.as_deref().and_then(workflow_file),
        context.workspace.as_deref(),
    ) else {
        return fallback();
    };

    match std::fs::read_to_string(workspace.join(&file)) {
        Ok(content) => {
            let annotations = project_annotations(project_name, &file, &content);
            if annotations.is_empty() {
                fallback()
            } else {
                annotations
            }
        }
        Err(err) => {
            tracing::debug!("Unable to read workflow file {}: {}", file, err);
            fallback()
        }
    }
}

/// Markdown job summary for a run
pub fn summary_markdown(project_name: &str, build_number: &str) -> String {
    format!(
        "### Riff-Raff\n\n| Name | Value |\n| --- | --- |\n| Project name | {} |\n| Build number | {} |\n",
        project_name, build_number
    )
}

/// Append the job summary to the `GITHUB_STEP_SUMMARY` file
pub fn write_step_summary(path: &Path, project_name: &str, build_number: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open step summary: {}", path.display()))?;
    file.write_all(summary_markdown(project_name, build_number).as_bytes())
        .with_context(|| format!("Failed to write step summary: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workflow_file_from_ref() {
        assert_eq!(
            workflow_file("guardian/foo/.github/workflows/ci.yml@refs/heads/main").as_deref(),
            Some(".github/workflows/ci.yml")
        );
        assert_eq!(
            workflow_file("guardian/foo/.github/workflows/build.yaml@refs/pull/3/merge").as_deref(),
            Some(".github/workflows/build.yaml")
        );
        assert_eq!(workflow_file("guardian/foo/README.md@main"), None);
        assert_eq!(workflow_file("guardian/foo/.github/workflows/.yml@main"), None);
    }

    #[test]
    fn test_error_command_escaping() {
        assert_eq!(error_command("50% done\nnext"), "::error::50%25 done%0Anext");
        assert_eq!(
            file_error_command("msg", ".github/workflows/a,b.yml", 3, "T: x"),
            "::error file=.github/workflows/a%2Cb.yml,line=3,endLine=3,title=T%3A x::msg"
        );
    }

    #[test]
    fn test_annotations_on_matching_lines() {
        let content = "name: CI\njobs:\n  upload:\n    with:\n      projectName: deploy::foo\n";
        let annotations = project_annotations("deploy::foo", ".github/workflows/ci.yml", content);
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].contains("line=5"));
    }

    #[test]
    fn test_access_denied_outside_pull_request() {
        let context = GithubContext {
            event_name: Some("push".to_string()),
            ..Default::default()
        };
        let commands = access_denied_commands(&context, "deploy::foo");
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("::error::Error uploading to Riff-Raff. Have you added deploy::foo"));
    }

    #[test]
    fn test_access_denied_annotates_workflow_in_pull_request() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let workflows = tmp.path().join(".github/workflows");
        std::fs::create_dir_all(&workflows).expect("mkdir should succeed");
        std::fs::write(workflows.join("ci.yml"), "projectName: deploy::foo\n")
            .expect("write should succeed");

        let context = GithubContext {
            event_name: Some("pull_request".to_string()),
            workflow_ref: Some("guardian/foo/.github/workflows/ci.yml@refs/pull/1/merge".to_string()),
            workspace: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let commands = access_denied_commands(&context, "deploy::foo");
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("::error file=.github/workflows/ci.yml,line=1"));
    }

    #[test]
    fn test_step_summary_appends() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let summary = tmp.path().join("summary.md");
        std::fs::write(&summary, "existing\n").expect("write should succeed");

        write_step_summary(&summary, "deploy::foo", "42").expect("summary should be written");
        let content = std::fs::read_to_string(&summary).expect("read should succeed");
        assert!(content.starts_with("existing\n"));
        assert!(content.contains("| Project name | deploy::foo |"));
        assert!(content.contains("| Build number | 42 |"));
    }
}

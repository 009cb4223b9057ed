//! Pull request comment content

use url::Url;

use crate::config::PullRequestComment;

const RIFFRAFF_URL: &str = "https://riffraff.gutools.co.uk";
const UPDATE_STRATEGY: &str = "MostlyHarmless";

/// Hidden marker identifying this tool's comment for a project
pub fn marker(project_name: &str) -> String {
    format!("<!-- riffraff-upload for {} -->", project_name)
}

fn link(path: &str, params: &[(&str, &str)]) -> String {
    let base = format!("{}/{}", RIFFRAFF_URL, path);
    Url::parse_with_params(&base, params)
        .map(String::from)
        .unwrap_or(base)
}

pub fn deploy_url(config: &PullRequestComment) -> String {
    link(
        "deployment/deployAgain",
        &[
            ("project", config.project_name.as_str()),
            ("build", config.build_number.as_str()),
            ("stage", config.commenting_stage.as_str()),
            ("updateStrategy", UPDATE_STRATEGY),
            ("action", "deploy"),
        ],
    )
}

pub fn preview_url(config: &PullRequestComment) -> String {
    link(
        "preview/yaml",
        &[
            ("project", config.project_name.as_str()),
            ("build", config.build_number.as_str()),
            ("stage", config.commenting_stage.as_str()),
            ("updateStrategy", UPDATE_STRATEGY),
        ],
    )
}

pub fn history_url(config: &PullRequestComment) -> String {
    link(
        "deployment/history",
        &[
            ("projectName", config.project_name.as_str()),
            ("stage", config.commenting_stage.as_str()),
        ],
    )
}

/// Markdown body of the comment
pub fn render(config: &PullRequestComment) -> String {
    let PullRequestComment {
        project_name,
        build_number,
        commenting_stage,
        ..
    } = config;

    let headline = format!(
        "[Deploy build {} of `{}` to {}]({})",
        build_number,
        project_name,
        commenting_stage,
        deploy_url(config)
    );

    [
        format!("### {}", headline),
        "<details>".to_string(),
        "<summary>All deployment options</summary>".to_string(),
        String::new(),
        format!("- {}", headline),
        format!(
            "- [Deploy parts of build {} to {} by previewing it first]({})",
            build_number,
            commenting_stage,
            preview_url(config)
        ),
        format!(
            "- [What's on {} right now?]({})",
            commenting_stage,
            history_url(config)
        ),
        "</details>".to_string(),
        String::new(),
        "---".to_string(),
        "_From riffraff-upload._".to_string(),
        marker(project_name),
    ]
    .join("\n")
}

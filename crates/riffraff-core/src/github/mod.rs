//! GitHub integration: pull request comments, workflow annotations, and
//! the job summary.

pub mod annotate;
pub mod client;
pub mod comment;
pub mod context;
pub mod notify;

pub use client::GithubClient;
pub use context::GithubContext;
pub use notify::{CommentOutcome, PullRequestNotifier};

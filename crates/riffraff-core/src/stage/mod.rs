//! Artifact staging
//!
//! Builds the local tree that mirrors what ends up in storage:
//!
//! ```text
//! <staging>/riff-raff.yaml
//! <staging>/<deployment>/...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{Configuration, Deployment};
use crate::fs::{to_key_path, walk_files};

/// File name of the re-serialised descriptor in the staging tree
pub const DESCRIPTOR_FILE: &str = "riff-raff.yaml";

const STAGING_PREFIX: &str = "staging-";

/// A populated staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTree {
    root: PathBuf,
}

impl StagedTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staged files relative to the root, `/`-separated and sorted
    pub fn files(&self) -> anyhow::Result<Vec<String>> {
        let files = walk_files(&self.root)
            .with_context(|| format!("Failed to list staging directory: {}", self.root.display()))?;
        Ok(files.iter().map(|p| to_key_path(p)).collect())
    }
}

/// Copies deployment sources into a staging directory
///
/// Relative source paths and a relative staging override are resolved
/// against `working_dir`.
pub struct Stager {
    working_dir: PathBuf,
}

impl Stager {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Stage everything the configuration names
    pub fn stage(&self, configuration: &Configuration) -> anyhow::Result<StagedTree> {
        let root = self.staging_dir(configuration.staging_dir_override.as_deref())?;

        tracing::info!("Writing {}", DESCRIPTOR_FILE);
        let yaml = configuration
            .descriptor
            .to_yaml()
            .context("Failed to serialise deployment descriptor")?;
        let descriptor_path = root.join(DESCRIPTOR_FILE);
        fs::write(&descriptor_path, yaml)
            .with_context(|| format!("Failed to write {}", descriptor_path.display()))?;

        for deployment in &configuration.deployments {
            self.stage_deployment(&root, deployment)?;
        }

        Ok(StagedTree { root })
    }

    /// The override if given, else a fresh `staging-XXXXXX` directory.
    ///
    /// Concurrent runs in one workflow share a working directory, so the
    /// generated name must be unique. The directory is kept after the run.
    fn staging_dir(&self, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
        if let Some(dir) = override_dir {
            let dir = self.working_dir.join(dir);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create staging directory: {}", dir.display()))?;
            return Ok(dir);
        }

        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.working_dir)
            .with_context(|| {
                format!(
                    "Failed to create staging directory in {}",
                    self.working_dir.display()
                )
            })?;
        Ok(dir.keep())
    }

    fn stage_deployment(&self, root: &Path, deployment: &Deployment) -> anyhow::Result<()> {
        let target = root.join(&deployment.name);
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create directory: {}", target.display()))?;

        for source in &deployment.sources {
            let from = self.working_dir.join(source);
            tracing::debug!("Copying {} to {}", from.display(), target.display());
            copy_source(&from, &target)
                .with_context(|| format!("Failed to stage source '{}' for {}", source, deployment.name))?;
        }

        Ok(())
    }
}

/// Copy a directory's contents, or a single file, into `target`
fn copy_source(from: &Path, target: &Path) -> anyhow::Result<()> {
    let metadata = fs::symlink_metadata(from)
        .with_context(|| format!("Source not found: {}", from.display()))?;
    let ty = metadata.file_type();

    if ty.is_dir() {
        copy_tree(from, target)
    } else if ty.is_file() {
        let name = from
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Source has no file name: {}", from.display()))?;
        let to = target.join(name);
        fs::copy(from, &to).with_context(|| {
            format!("Failed to copy file from {} to {}", from.display(), to.display())
        })?;
        Ok(())
    } else {
        anyhow::bail!("Unsupported source type at {}", from.display());
    }
}

fn copy_tree(src: &Path, dst: &Path) -> anyhow::Result<()> {
    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read dir: {}", src.display()))?
    {
        let entry =
            entry.with_context(|| format!("Failed to read dir entry: {}", src.display()))?;
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat dir entry: {}", entry.path().display()))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if ty.is_dir() {
            fs::create_dir_all(&to)
                .with_context(|| format!("Failed to create directory: {}", to.display()))?;
            copy_tree(&from, &to)?;
        } else if ty.is_file() {
            fs::copy(&from, &to).with_context(|| {
                format!("Failed to copy file from {} to {}", from.display(), to.display())
            })?;
        } else {
            anyhow::bail!("Unsupported filesystem entry type at {}", from.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    #[test]
    fn test_copy_single_file_source() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("build/app.jar"), "jar");
        let target = tmp.path().join("out");
        fs::create_dir_all(&target).expect("mkdir should succeed");

        copy_source(&tmp.path().join("build/app.jar"), &target).expect("copy should succeed");
        assert_eq!(
            fs::read_to_string(target.join("app.jar")).expect("read should succeed"),
            "jar"
        );
    }

    #[test]
    fn test_copy_directory_includes_hidden_and_nested() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("src/.env"), "secret");
        write_file(&tmp.path().join("src/a/b.txt"), "b");
        let target = tmp.path().join("out");
        fs::create_dir_all(&target).expect("mkdir should succeed");

        copy_source(&tmp.path().join("src"), &target).expect("copy should succeed");
        assert!(target.join(".env").is_file());
        assert!(target.join("a/b.txt").is_file());
    }

    #[test]
    fn test_missing_source_fails() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let err = copy_source(&tmp.path().join("missing"), tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Source not found"));
    }

    #[test]
    fn test_generated_staging_dirs_are_unique() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let stager = Stager::new(tmp.path());
        let first = stager.staging_dir(None).expect("staging dir should be created");
        let second = stager.staging_dir(None).expect("staging dir should be created");

        assert_ne!(first, second);
        assert!(first.is_dir());
        assert!(
            first
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(STAGING_PREFIX))
        );
    }
}

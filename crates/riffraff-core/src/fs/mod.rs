//! Filesystem helpers for the staging tree

pub mod digest;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// List every regular file under `root`, relative to it, in sorted order.
///
/// Directories are descended in lexicographic order so that the listing
/// (and anything derived from it, such as upload keys or digests) is stable.
/// Symlinks and other special entries are rejected.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_recursive(root, Path::new(""), &mut files)?;
    Ok(files)
}

fn walk_recursive(dir: &Path, base: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let rel_path = base.join(entry.file_name());
        let ty = entry.file_type()?;

        if ty.is_dir() {
            walk_recursive(&entry.path(), &rel_path, files)?;
        } else if ty.is_file() {
            files.push(rel_path);
        } else {
            return Err(io::Error::other(format!(
                "Unsupported filesystem entry type at {}",
                entry.path().display()
            )));
        }
    }

    Ok(())
}

/// Render a relative path with `/` separators, as used in storage keys
pub fn to_key_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
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
    fn test_walk_sorted_and_recursive() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("z.txt"), "z");
        write_file(&tmp.path().join("a/b/c.txt"), "c");
        write_file(&tmp.path().join("a/a.txt"), "a");
        write_file(&tmp.path().join(".hidden"), "h");

        let files: Vec<String> = walk_files(tmp.path())
            .expect("walk should succeed")
            .iter()
            .map(|p| to_key_path(p))
            .collect();

        assert_eq!(files, vec![".hidden", "a/a.txt", "a/b/c.txt", "z.txt"]);
    }

    #[test]
    fn test_empty_directories_yield_nothing() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        fs::create_dir_all(tmp.path().join("empty/nested")).expect("mkdir should succeed");
        assert!(walk_files(tmp.path()).expect("walk should succeed").is_empty());
    }

    #[test]
    fn test_walk_missing_root_fails() {
        assert!(walk_files(Path::new("/nonexistent/staging")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_rejected() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("real.txt"), "x");
        std::os::unix::fs::symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt"))
            .expect("symlink should succeed");
        assert!(walk_files(tmp.path()).is_err());
    }
}

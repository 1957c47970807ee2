//! Directory tree copied from a source directory.
use anyhow::Result;
use std::path::{Path, PathBuf};

use super::helpers::fs::{copy_dir_recursive, is_symlink, occupied, remove_existing, tree_contained};
use super::{Resource, ResourceState};

/// Copy of the `source` tree at `target`.
///
/// The tree is correct when every file under `source` exists under `target`
/// with identical content; extra files in `target` are left alone.
#[derive(Debug, Clone)]
pub struct TreeResource {
    /// Source directory.
    pub source: PathBuf,
    /// Destination directory.
    pub target: PathBuf,
}

impl TreeResource {
    /// Create a new tree resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Resource for TreeResource {
    fn description(&self) -> String {
        format!("{} to {}", self.source.display(), self.target.display())
    }

    fn verb(&self) -> &'static str {
        "copy"
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("source is not a directory: {}", self.source.display()),
            });
        }
        if !occupied(&self.target) {
            return Ok(ResourceState::Missing);
        }
        if is_symlink(&self.target) || !self.target.is_dir() {
            return Ok(ResourceState::Incorrect {
                current: "target is not a real directory".to_string(),
            });
        }
        if tree_contained(&self.source, &self.target)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "tree content differs".to_string(),
            })
        }
    }

    fn apply(&self) -> Result<()> {
        if is_symlink(&self.target) || (occupied(&self.target) && !self.target.is_dir()) {
            remove_existing(&self.target)?;
        }
        copy_dir_recursive(&self.source, &self.target)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn source_tree() -> tempfile::TempDir {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("tmux.conf"), "set -g mouse on\n").unwrap();
        std::fs::create_dir(src.path().join("plugins")).unwrap();
        std::fs::write(src.path().join("plugins/tpm"), "tpm").unwrap();
        src
    }

    #[test]
    fn invalid_without_source() {
        let dir = tempfile::tempdir().unwrap();
        let resource = TreeResource::new(dir.path().join("nope"), dir.path().join("dst"));
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn copy_then_correct() {
        let src = source_tree();
        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("tmux");
        let resource = TreeResource::new(src.path().to_path_buf(), target.clone());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(std::fs::read_to_string(target.join("plugins/tpm")).unwrap(), "tpm");
    }

    #[test]
    fn modified_copy_is_incorrect_and_restored() {
        let src = source_tree();
        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("tmux");
        let resource = TreeResource::new(src.path().to_path_buf(), target.clone());
        resource.apply().unwrap();
        std::fs::write(target.join("tmux.conf"), "edited").unwrap();
        std::fs::write(target.join("local.conf"), "mine").unwrap();

        assert!(resource.current_state().unwrap().needs_change());
        resource.apply().unwrap();
        assert_eq!(
            std::fs::read_to_string(target.join("tmux.conf")).unwrap(),
            "set -g mouse on\n"
        );
        assert!(target.join("local.conf").exists(), "extra files are kept");
    }
}

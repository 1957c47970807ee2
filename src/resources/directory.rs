//! Directory resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{occupied, remove_existing};
use super::{Resource, ResourceState};

/// A directory that must exist at `path`.
///
/// A symlink to a directory counts as present.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Directory path.
    pub path: PathBuf,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Resource for DirectoryResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn verb(&self) -> &'static str {
        "create directory"
    }

    fn target(&self) -> &Path {
        &self.path
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.path.is_dir() {
            Ok(ResourceState::Correct)
        } else if occupied(&self.path) {
            Ok(ResourceState::Incorrect {
                current: "path is not a directory".to_string(),
            })
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<()> {
        remove_existing(&self.path)?;
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("creating directory {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let resource = DirectoryResource::new(dir.path().join("go/bin"));
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert!(dir.path().join("go/bin").is_dir());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn replaces_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, "not a dir").unwrap();
        let resource = DirectoryResource::new(path.clone());
        assert!(resource.current_state().unwrap().needs_change());
        resource.apply().unwrap();
        assert!(path.is_dir());
    }
}

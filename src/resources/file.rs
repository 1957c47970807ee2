//! Regular file with exact content.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, is_symlink, occupied, remove_existing, write_atomic};
use super::{Resource, ResourceState};

/// A regular file at `target` whose content must equal `content`.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// Destination path.
    pub target: PathBuf,
    /// Desired file content.
    pub content: Vec<u8>,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub fn new(target: PathBuf, content: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            content: content.into(),
        }
    }
}

impl Resource for FileResource {
    fn description(&self) -> String {
        self.target.display().to_string()
    }

    fn verb(&self) -> &'static str {
        "write"
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !occupied(&self.target) {
            return Ok(ResourceState::Missing);
        }
        if is_symlink(&self.target) {
            return Ok(ResourceState::Incorrect {
                current: "target is a symlink".to_string(),
            });
        }
        if self.target.is_dir() {
            return Ok(ResourceState::Incorrect {
                current: "target is a directory".to_string(),
            });
        }
        let existing = std::fs::read(&self.target)
            .with_context(|| format!("reading {}", self.target.display()))?;
        if existing == self.content {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("{} bytes with different content", existing.len()),
            })
        }
    }

    fn apply(&self) -> Result<()> {
        ensure_parent_dir(&self.target)?;
        // Writing through a symlink would modify the link's source.
        if is_symlink(&self.target) || self.target.is_dir() {
            remove_existing(&self.target)?;
        }
        write_atomic(&self.target, &self.content)?;
        Ok(())
    }
}

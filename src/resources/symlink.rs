//! Symlink resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, occupied, remove_existing};
use super::{Resource, ResourceState};

/// A symlink at `target` pointing to `source`.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// What the link points to.
    pub source: PathBuf,
    /// Where the link lives.
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    /// Whether an existing link value resolves to `source`.
    ///
    /// Relative link values are resolved against the link's directory, so a
    /// hand-made `../dotfiles/zshrc` link counts as correct.
    fn resolves_to_source(&self, link: &Path) -> bool {
        if link == self.source {
            return true;
        }
        let resolved = match self.target.parent() {
            Some(dir) if link.is_relative() => dir.join(link),
            _ => link.to_path_buf(),
        };
        match (resolved.canonicalize(), self.source.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Resource for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn verb(&self) -> &'static str {
        "link"
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let Ok(link) = std::fs::read_link(&self.target) else {
            return Ok(if self.target.is_dir() {
                ResourceState::Incorrect {
                    current: "a directory is in the way".to_string(),
                }
            } else if occupied(&self.target) {
                ResourceState::Incorrect {
                    current: "a regular file is in the way".to_string(),
                }
            } else {
                ResourceState::Missing
            });
        };

        if self.resolves_to_source(&link) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("points to {}", link.display()),
            })
        }
    }

    fn apply(&self) -> Result<()> {
        ensure_parent_dir(&self.target)?;
        remove_existing(&self.target)?;
        std::os::unix::fs::symlink(&self.source, &self.target).with_context(|| {
            format!("linking {} to {}", self.target.display(), self.source.display())
        })?;
        Ok(())
    }
}

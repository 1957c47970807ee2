//! Idempotent filesystem resource primitives (check + apply pattern).
//!
//! Each resource describes one desired end state on disk. Callers inspect
//! [`Resource::current_state`] and only call [`Resource::apply`] when the
//! state is not already [`ResourceState::Correct`]; the
//! [`MutationGuard`](crate::guard::MutationGuard) adds backups and dry-run
//! handling around that sequence.
pub mod directory;
pub mod file;
pub mod line;
pub mod symlink;
pub mod tree;

pub mod helpers {
    //! Shared helpers for resource implementations.
    pub mod fs;
}

use std::path::Path;

use anyhow::Result;

/// State of a filesystem resource.
///
/// # Examples
///
/// ```
/// use devenv_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
/// let invalid = ResourceState::Invalid { reason: "source does not exist".into() };
///
/// assert_ne!(missing, correct);
/// assert!(wrong.needs_change());
/// assert!(!invalid.needs_change());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Destination does not exist.
    Missing,
    /// Destination exists and matches the desired state.
    Correct,
    /// Destination exists but does not match the desired state.
    Incorrect {
        /// Description of what is currently there.
        current: String,
    },
    /// The desired state cannot be reached (e.g. the source is missing).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

impl ResourceState {
    /// Whether applying the resource would change the filesystem.
    #[must_use]
    pub const fn needs_change(&self) -> bool {
        matches!(self, Self::Missing | Self::Incorrect { .. })
    }
}

/// A filesystem resource that can be checked and applied.
pub trait Resource: Send + Sync {
    /// Human-readable description of this resource, used in log lines.
    fn description(&self) -> String;

    /// Verb describing the mutation (`link`, `write`, ...).
    fn verb(&self) -> &'static str;

    /// Destination path that [`apply`](Self::apply) modifies.
    fn target(&self) -> &Path;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined due to I/O failures.
    fn current_state(&self) -> Result<ResourceState>;

    /// Bring the destination into the desired state.
    ///
    /// Implementations create missing parent directories and replace whatever
    /// currently occupies the destination; backups are the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied due to I/O failures,
    /// permission issues, or invalid paths.
    fn apply(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_change_only_for_missing_and_incorrect() {
        assert!(ResourceState::Missing.needs_change());
        assert!(
            ResourceState::Incorrect {
                current: "x".to_string()
            }
            .needs_change()
        );
        assert!(!ResourceState::Correct.needs_change());
        assert!(
            !ResourceState::Invalid {
                reason: "x".to_string()
            }
            .needs_change()
        );
    }
}

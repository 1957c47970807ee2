//! Single line present in a text file.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, occupied};
use super::{Resource, ResourceState};

/// A line that must appear verbatim in `file`.
///
/// Comparison ignores trailing whitespace on existing lines. Applying appends
/// the line, adding a newline first when the file does not end with one.
#[derive(Debug, Clone)]
pub struct LineResource {
    /// File that must contain the line.
    pub file: PathBuf,
    /// The line, without a trailing newline.
    pub line: String,
}

impl LineResource {
    /// Create a new line resource.
    #[must_use]
    pub fn new(file: PathBuf, line: impl Into<String>) -> Self {
        Self {
            file,
            line: line.into(),
        }
    }
}

impl Resource for LineResource {
    fn description(&self) -> String {
        format!("'{}' to {}", self.line, self.file.display())
    }

    fn verb(&self) -> &'static str {
        "append"
    }

    fn target(&self) -> &Path {
        &self.file
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !occupied(&self.file) {
            return Ok(ResourceState::Missing);
        }
        if self.file.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a directory", self.file.display()),
            });
        }
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;
        let wanted = self.line.trim_end();
        if content.lines().any(|l| l.trim_end() == wanted) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "line absent".to_string(),
            })
        }
    }

    fn apply(&self) -> Result<()> {
        ensure_parent_dir(&self.file)?;
        let needs_newline = std::fs::read(&self.file)
            .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
            .unwrap_or(false);
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .with_context(|| format!("opening {}", self.file.display()))?;
        if needs_newline {
            writeln!(f).with_context(|| format!("writing {}", self.file.display()))?;
        }
        writeln!(f, "{}", self.line).with_context(|| format!("writing {}", self.file.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn appends_to_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".zshrc");
        let resource = LineResource::new(rc.clone(), "source ~/.aliases");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(
            std::fs::read_to_string(&rc).unwrap(),
            "source ~/.aliases\n"
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn adds_separator_newline_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".bashrc");
        std::fs::write(&rc, "export A=1").unwrap();
        let resource = LineResource::new(rc.clone(), "export B=2");
        resource.apply().unwrap();
        assert_eq!(
            std::fs::read_to_string(&rc).unwrap(),
            "export A=1\nexport B=2\n"
        );
    }

    #[test]
    fn present_line_with_trailing_spaces_is_correct() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".profile");
        std::fs::write(&rc, "one\neval \"$(brew shellenv)\"   \nthree\n").unwrap();
        let resource = LineResource::new(rc, "eval \"$(brew shellenv)\"");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn substring_is_not_a_match() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".profile");
        std::fs::write(&rc, "# export PATH=$HOME/bin\n").unwrap();
        let resource = LineResource::new(rc, "export PATH=$HOME/bin");
        assert!(resource.current_state().unwrap().needs_change());
    }
}

//! Guarded filesystem mutations with backup-before-mutate.
//!
//! Every helper checks whether the desired end state already holds and
//! returns without touching the filesystem if it does. Otherwise any existing
//! destination is backed up first, then replaced. In dry-run mode the would-be
//! action is logged with the same text a real run prints and nothing is
//! written, backups included.
pub mod backup;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use backup::{BackupRecord, BackupStore};

use crate::error::GuardError;
use crate::logging::Log;
use crate::resources::directory::DirectoryResource;
use crate::resources::file::FileResource;
use crate::resources::helpers::fs::occupied;
use crate::resources::line::LineResource;
use crate::resources::symlink::SymlinkResource;
use crate::resources::tree::TreeResource;
use crate::resources::{Resource, ResourceState};

/// Outcome of a guarded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// The desired state already held; nothing was touched.
    AlreadyInState,
    /// The destination was changed.
    Applied {
        /// Backup of the previous destination, if anything existed there.
        backup: Option<PathBuf>,
    },
    /// Dry-run: the change was logged but not performed.
    DryRun,
}

impl Mutation {
    /// Whether the mutation changed (or would have changed) the filesystem.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::AlreadyInState)
    }
}

/// Wraps filesystem mutations with state checks, backups, and dry-run handling.
pub struct MutationGuard {
    store: BackupStore,
    dry_run: bool,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for MutationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGuard")
            .field("store", &self.store)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl MutationGuard {
    /// Create a guard whose backups go to a fresh run directory under `backup_root`.
    #[must_use]
    pub fn new(backup_root: &Path, dry_run: bool, log: Arc<dyn Log>) -> Self {
        Self::with_store(BackupStore::new(backup_root), dry_run, log)
    }

    /// Create a guard around an existing backup store.
    #[must_use]
    pub fn with_store(store: BackupStore, dry_run: bool, log: Arc<dyn Log>) -> Self {
        Self {
            store,
            dry_run,
            log,
        }
    }

    /// The backup store for this run.
    #[must_use]
    pub const fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Ensure `dest` is a regular file holding exactly `content`.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn ensure_file(&self, content: impl Into<Vec<u8>>, dest: &Path) -> Result<Mutation, GuardError> {
        self.apply(&FileResource::new(dest.to_path_buf(), content))
    }

    /// Ensure `file` contains `line`, appending it if absent.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn ensure_line(&self, line: &str, file: &Path) -> Result<Mutation, GuardError> {
        self.apply(&LineResource::new(file.to_path_buf(), line))
    }

    /// Ensure `dest` is a symlink pointing to `source`.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn ensure_symlink(&self, source: &Path, dest: &Path) -> Result<Mutation, GuardError> {
        self.apply(&SymlinkResource::new(
            source.to_path_buf(),
            dest.to_path_buf(),
        ))
    }

    /// Ensure `path` is a directory.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn ensure_directory(&self, path: &Path) -> Result<Mutation, GuardError> {
        self.apply(&DirectoryResource::new(path.to_path_buf()))
    }

    /// Ensure every file under `source` is present under `dest` with the same content.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn copy_tree(&self, source: &Path, dest: &Path) -> Result<Mutation, GuardError> {
        self.apply(&TreeResource::new(source.to_path_buf(), dest.to_path_buf()))
    }

    /// Check `resource` and bring it into its desired state.
    ///
    /// # Errors
    ///
    /// - [`GuardError::Invalid`] if the desired state is unreachable.
    /// - [`GuardError::BackupFailed`] if the existing destination could not be
    ///   backed up; the destination is left untouched.
    /// - [`GuardError::MutationFailed`] if inspecting or changing the
    ///   destination failed; any backup taken is left in place.
    pub fn apply(&self, resource: &dyn Resource) -> Result<Mutation, GuardError> {
        let desc = resource.description();
        let verb = resource.verb();
        let target = resource.target();

        let state = resource
            .current_state()
            .map_err(|e| GuardError::MutationFailed {
                action: "inspect".to_string(),
                path: target.to_path_buf(),
                backup: None,
                reason: format!("{e:#}"),
            })?;

        match state {
            ResourceState::Correct => {
                self.log.debug(&format!("ok: {desc}"));
                Ok(Mutation::AlreadyInState)
            }
            ResourceState::Invalid { reason } => Err(GuardError::Invalid {
                path: target.to_path_buf(),
                reason,
            }),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                if let ResourceState::Incorrect { current } = &state {
                    self.log.debug(&format!("{desc}: {current}"));
                }
                let msg = format!("{verb} {desc}");
                if self.dry_run {
                    self.log.dry_run(&msg);
                    return Ok(Mutation::DryRun);
                }

                let backup = if occupied(target) {
                    let record =
                        self.store
                            .backup(target)
                            .map_err(|source| GuardError::BackupFailed {
                                path: target.to_path_buf(),
                                source,
                            })?;
                    self.log.debug(&format!(
                        "backed up {} to {}",
                        target.display(),
                        record.backup_path.display()
                    ));
                    Some(record.backup_path)
                } else {
                    None
                };

                resource
                    .apply()
                    .map_err(|e| GuardError::MutationFailed {
                        action: verb.to_string(),
                        path: target.to_path_buf(),
                        backup: backup.clone(),
                        reason: format!("{e:#}"),
                    })?;
                self.log.success(&msg);
                Ok(Mutation::Applied { backup })
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use std::fs;

    struct Fixture {
        home: tempfile::TempDir,
        backups: tempfile::TempDir,
        log: Arc<MemoryLog>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                home: tempfile::tempdir().unwrap(),
                backups: tempfile::tempdir().unwrap(),
                log: Arc::new(MemoryLog::default()),
            }
        }

        fn guard(&self, dry_run: bool) -> MutationGuard {
            MutationGuard::with_store(
                BackupStore::with_run_dir(self.backups.path().join("run")),
                dry_run,
                Arc::clone(&self.log) as Arc<dyn Log>,
            )
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.home.path().join(rel)
        }
    }

    /// Recursive listing of relative paths with file contents, for purity checks.
    fn snapshot(root: &Path) -> Vec<(String, Option<Vec<u8>>)> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, Option<Vec<u8>>)>) {
            let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap()).collect();
            entries.sort_by_key(fs::DirEntry::file_name);
            for entry in entries {
                let path = entry.path();
                let rel = path.strip_prefix(root).unwrap().display().to_string();
                let meta = fs::symlink_metadata(&path).unwrap();
                if meta.is_dir() {
                    out.push((rel, None));
                    walk(root, &path, out);
                } else if meta.is_symlink() {
                    let link = fs::read_link(&path).unwrap();
                    out.push((rel, Some(link.display().to_string().into_bytes())));
                } else {
                    out.push((rel, Some(fs::read(&path).unwrap())));
                }
            }
        }
        let mut out = Vec::new();
        walk(root, root, &mut out);
        out
    }

    // -----------------------------------------------------------------------
    // Idempotence
    // -----------------------------------------------------------------------

    #[test]
    fn symlink_twice_backs_up_once() {
        let fx = Fixture::new();
        let source = fx.path("dotfiles/zshrc");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "new").unwrap();
        let dest = fx.path(".zshrc");
        fs::write(&dest, "old").unwrap();

        let guard = fx.guard(false);
        let first = guard.ensure_symlink(&source, &dest).unwrap();
        assert!(matches!(first, Mutation::Applied { backup: Some(_) }));

        let second = guard.ensure_symlink(&source, &dest).unwrap();
        assert_eq!(second, Mutation::AlreadyInState);
        assert_eq!(guard.store().records().len(), 1);
        assert_eq!(fs::read_link(&dest).unwrap(), source);
    }

    #[test]
    fn second_run_changes_nothing() {
        let fx = Fixture::new();
        let guard = fx.guard(false);
        let rc = fx.path(".bashrc");
        guard.ensure_directory(&fx.path(".local/bin")).unwrap();
        guard.ensure_line("export PATH=$HOME/.local/bin:$PATH", &rc).unwrap();
        guard.ensure_file("[core]\n", &fx.path(".gitconfig")).unwrap();
        let before = snapshot(fx.home.path());

        let again = fx.guard(false);
        assert_eq!(
            again.ensure_directory(&fx.path(".local/bin")).unwrap(),
            Mutation::AlreadyInState
        );
        assert_eq!(
            again
                .ensure_line("export PATH=$HOME/.local/bin:$PATH", &rc)
                .unwrap(),
            Mutation::AlreadyInState
        );
        assert_eq!(
            again.ensure_file("[core]\n", &fx.path(".gitconfig")).unwrap(),
            Mutation::AlreadyInState
        );
        assert_eq!(snapshot(fx.home.path()), before);
        assert!(again.store().records().is_empty());
    }

    // -----------------------------------------------------------------------
    // Dry-run purity
    // -----------------------------------------------------------------------

    #[test]
    fn dry_run_writes_nothing() {
        let fx = Fixture::new();
        let source = fx.path("repo/tmux");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("tmux.conf"), "set -g mouse on").unwrap();
        fs::write(fx.path(".vimrc"), "old vimrc").unwrap();
        fs::write(fx.path(".profile"), "export A=1\n").unwrap();
        let before = snapshot(fx.home.path());

        let guard = fx.guard(true);
        assert_eq!(
            guard.ensure_file("new vimrc", &fx.path(".vimrc")).unwrap(),
            Mutation::DryRun
        );
        assert_eq!(
            guard.ensure_line("export B=2", &fx.path(".profile")).unwrap(),
            Mutation::DryRun
        );
        assert_eq!(
            guard
                .ensure_symlink(&fx.path(".vimrc"), &fx.path(".config/nvim/init.vim"))
                .unwrap(),
            Mutation::DryRun
        );
        assert_eq!(
            guard.ensure_directory(&fx.path("go/bin")).unwrap(),
            Mutation::DryRun
        );
        assert_eq!(
            guard.copy_tree(&source, &fx.path(".tmux")).unwrap(),
            Mutation::DryRun
        );

        assert_eq!(snapshot(fx.home.path()), before);
        assert!(!guard.store().run_dir().exists(), "no backup directory");
        assert!(guard.store().records().is_empty());
    }

    #[test]
    fn dry_run_uses_same_message_text() {
        let fx = Fixture::new();
        let dest = fx.path(".gitconfig");

        fx.guard(true).ensure_file("x", &dest).unwrap();
        fx.guard(false).ensure_file("x", &dest).unwrap();

        let dry = fx.log.messages("dry");
        let real = fx.log.messages("success");
        assert_eq!(dry.len(), 1);
        assert_eq!(dry, real);
        assert!(dry[0].starts_with("write "));
    }

    // -----------------------------------------------------------------------
    // Backup-before-overwrite
    // -----------------------------------------------------------------------

    #[test]
    fn overwrite_keeps_prior_content_in_backup() {
        let fx = Fixture::new();
        let dest = fx.path(".gitconfig");
        fs::write(&dest, "prior").unwrap();

        let guard = fx.guard(false);
        let Mutation::Applied {
            backup: Some(backup),
        } = guard.ensure_file("replacement", &dest).unwrap()
        else {
            panic!("expected a backup");
        };

        assert_eq!(fs::read_to_string(&backup).unwrap(), "prior");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "replacement");
        assert_ne!(backup, dest);
    }

    #[test]
    fn appending_a_line_backs_up_the_file() {
        let fx = Fixture::new();
        let rc = fx.path(".zshrc");
        fs::write(&rc, "export A=1\n").unwrap();

        let guard = fx.guard(false);
        guard.ensure_line("export B=2", &rc).unwrap();

        let records = guard.store().records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            fs::read_to_string(&records[0].backup_path).unwrap(),
            "export A=1\n"
        );
    }

    #[test]
    fn creating_new_path_takes_no_backup() {
        let fx = Fixture::new();
        let guard = fx.guard(false);
        let result = guard.ensure_file("x", &fx.path("new/file")).unwrap();
        assert_eq!(result, Mutation::Applied { backup: None });
        assert!(guard.store().records().is_empty());
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[test]
    fn backup_failure_is_fatal_and_leaves_destination() {
        let fx = Fixture::new();
        let dest = fx.path(".vimrc");
        fs::write(&dest, "keep me").unwrap();
        // A regular file where the run directory's parent should be.
        let blocker = fx.backups.path().join("blocked");
        fs::write(&blocker, "").unwrap();

        let guard = MutationGuard::with_store(
            BackupStore::with_run_dir(blocker.join("run")),
            false,
            Arc::clone(&fx.log) as Arc<dyn Log>,
        );
        let err = guard.ensure_file("new", &dest).unwrap_err();
        assert!(matches!(err, GuardError::BackupFailed { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "keep me");
    }

    struct FailingResource {
        target: PathBuf,
    }

    impl Resource for FailingResource {
        fn description(&self) -> String {
            self.target.display().to_string()
        }
        fn verb(&self) -> &'static str {
            "write"
        }
        fn target(&self) -> &Path {
            &self.target
        }
        fn current_state(&self) -> anyhow::Result<ResourceState> {
            Ok(ResourceState::Incorrect {
                current: "stale".to_string(),
            })
        }
        fn apply(&self) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn mutation_failure_reports_and_keeps_backup() {
        let fx = Fixture::new();
        let dest = fx.path("settings.json");
        fs::write(&dest, "{}").unwrap();

        let guard = fx.guard(false);
        let err = guard
            .apply(&FailingResource {
                target: dest.clone(),
            })
            .unwrap_err();

        let GuardError::MutationFailed { backup, reason, .. } = err else {
            panic!("expected MutationFailed");
        };
        let backup = backup.expect("backup path reported");
        assert!(reason.contains("disk on fire"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "{}");
    }

    #[test]
    fn invalid_state_is_an_error_without_writes() {
        let fx = Fixture::new();
        let guard = fx.guard(false);
        let err = guard
            .ensure_symlink(&fx.path("missing-source"), &fx.path(".zshrc"))
            .unwrap_err();
        assert!(matches!(err, GuardError::Invalid { .. }));
        assert!(!fx.path(".zshrc").exists());
    }
}

//! Timestamped backups and the per-run JSON manifest.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use serde::Serialize;

/// One backup taken immediately before a destructive filesystem operation.
///
/// Backups are an audit trail; nothing restores them automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    /// Path that was about to be overwritten or removed.
    pub original_path: PathBuf,
    /// Where its previous content now lives.
    pub backup_path: PathBuf,
    /// Capture time (RFC 3339, UTC).
    pub timestamp: String,
    /// SHA-256 of the backed-up file content, or of the link text for
    /// symlinks. Directories carry no digest.
    pub sha256: Option<String>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    run: String,
    backups: &'a [BackupRecord],
}

/// Backup location scoped to one run: `<backup root>/<run id>/`.
///
/// The directory is claimed on the first backup, so runs that change nothing
/// leave no trace. A run id already taken by another run gets a numeric
/// suffix.
#[derive(Debug)]
pub struct BackupStore {
    state: Mutex<RunState>,
}

#[derive(Debug)]
struct RunState {
    run_dir: PathBuf,
    claimed: bool,
    records: Vec<BackupRecord>,
}

impl RunState {
    /// Create the run directory, moving to `<id>.<n>` while the name is taken.
    fn claim(&mut self) -> io::Result<()> {
        if self.claimed {
            return Ok(());
        }
        if let Some(parent) = self.run_dir.parent() {
            fs::create_dir_all(parent)?;
        }
        let base = self.run_dir.clone();
        let mut n = 1u32;
        loop {
            match fs::create_dir(&self.run_dir) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let mut name = base.as_os_str().to_os_string();
                    name.push(format!(".{n}"));
                    self.run_dir = PathBuf::from(name);
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
        self.claimed = true;
        Ok(())
    }
}

impl BackupStore {
    /// Create a store for a new run under `backup_root`.
    #[must_use]
    pub fn new(backup_root: &Path) -> Self {
        let run_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6f").to_string();
        Self::with_run_dir(backup_root.join(run_id))
    }

    /// Create a store whose run directory is `run_dir`, or a suffixed
    /// sibling if that is taken when the first backup happens.
    #[must_use]
    pub const fn with_run_dir(run_dir: PathBuf) -> Self {
        Self {
            state: Mutex::new(RunState {
                run_dir,
                claimed: false,
                records: Vec::new(),
            }),
        }
    }

    /// Directory holding this run's backups.
    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .run_dir
            .clone()
    }

    /// Copy whatever exists at `original` into the run directory.
    ///
    /// Files are copied, symlinks are recreated as links, directories are
    /// copied recursively without following links.
    ///
    /// # Errors
    ///
    /// Returns an error if the run directory cannot be created or the copy fails.
    pub fn backup(&self, original: &Path) -> io::Result<BackupRecord> {
        // Held for the whole copy so concurrent backups never pick the same name.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        state.claim()?;
        let now = chrono::Utc::now();
        let basename = original
            .file_name()
            .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().to_string());
        let stem = format!("{basename}.{}", now.format("%Y%m%dT%H%M%S%.6f"));
        let mut backup_path = state.run_dir.join(&stem);
        let mut n = 1u32;
        while backup_path.symlink_metadata().is_ok() {
            backup_path = state.run_dir.join(format!("{stem}.{n}"));
            n += 1;
        }

        if let Err(e) = copy_preserving(original, &backup_path) {
            fs::remove_dir_all(&backup_path)
                .or_else(|_| fs::remove_file(&backup_path))
                .ok();
            return Err(e);
        }

        let record = BackupRecord {
            original_path: original.to_path_buf(),
            sha256: digest(&backup_path),
            backup_path,
            timestamp: now.to_rfc3339(),
        };
        state.records.push(record.clone());
        Ok(record)
    }

    /// All backups taken so far, in capture order.
    #[must_use]
    pub fn records(&self) -> Vec<BackupRecord> {
        self.state
            .lock()
            .map_or_else(|_| vec![], |g| g.records.clone())
    }

    /// Write `manifest.json` into the run directory.
    ///
    /// Returns the manifest path, or `None` when no backup was taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be serialized or written.
    pub fn write_manifest(&self) -> Result<Option<PathBuf>> {
        let records = self.records();
        if records.is_empty() {
            return Ok(None);
        }
        let run_dir = self.run_dir();
        let run = run_dir
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string());
        let manifest = Manifest {
            run,
            backups: &records,
        };
        let json =
            serde_json::to_string_pretty(&manifest).context("serializing backup manifest")?;
        let path = run_dir.join("manifest.json");
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(Some(path))
    }
}

fn copy_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.is_symlink() {
        std::os::unix::fs::symlink(fs::read_link(src)?, dst)
    } else if meta.is_dir() {
        fs::create_dir(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_preserving(&entry.path(), &dst.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}

fn digest(path: &Path) -> Option<String> {
    let meta = fs::symlink_metadata(path).ok()?;
    if meta.is_symlink() {
        let link = fs::read_link(path).ok()?;
        Some(sha256_hex(link.as_os_str().as_encoded_bytes()))
    } else if meta.is_file() {
        fs::read(path).ok().map(|bytes| sha256_hex(&bytes))
    } else {
        None
    }
}

/// Lowercase hex SHA-256 digest of `bytes`.
fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in &result {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn run_dir_created_lazily() {
        let root = tempfile::tempdir().unwrap();
        let store = BackupStore::new(root.path());
        assert!(!store.run_dir().exists());
        assert!(store.write_manifest().unwrap().is_none());
        assert!(!store.run_dir().exists());
    }

    #[test]
    fn backup_copies_file_and_records_digest() {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let rc = home.path().join(".zshrc");
        fs::write(&rc, "hello world").unwrap();

        let store = BackupStore::new(root.path());
        let record = store.backup(&rc).unwrap();

        assert_eq!(record.original_path, rc);
        assert!(record.backup_path.starts_with(store.run_dir()));
        let name = record.backup_path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".zshrc."), "unexpected backup name {name}");
        assert_eq!(fs::read_to_string(&record.backup_path).unwrap(), "hello world");
        assert_eq!(
            record.sha256.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn backup_keeps_symlinks_as_links() {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let link = home.path().join("vimrc");
        std::os::unix::fs::symlink("/nowhere/vimrc", &link).unwrap();

        let store = BackupStore::with_run_dir(root.path().join("run"));
        let record = store.backup(&link).unwrap();
        assert_eq!(
            fs::read_link(&record.backup_path).unwrap(),
            PathBuf::from("/nowhere/vimrc")
        );
    }

    #[test]
    fn backup_copies_directories() {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join("nvim");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("init.lua"), "-- lua").unwrap();

        let store = BackupStore::with_run_dir(root.path().join("run"));
        let record = store.backup(&dir).unwrap();
        assert_eq!(
            fs::read_to_string(record.backup_path.join("init.lua")).unwrap(),
            "-- lua"
        );
        assert!(record.sha256.is_none());
    }

    #[test]
    fn colliding_names_get_suffix() {
        let root = tempfile::tempdir().unwrap();
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("config"), "a").unwrap();
        fs::write(b.path().join("config"), "b").unwrap();

        let store = BackupStore::with_run_dir(root.path().join("run"));
        let first = store.backup(&a.path().join("config")).unwrap();
        let second = store.backup(&b.path().join("config")).unwrap();
        assert_ne!(first.backup_path, second.backup_path);
        assert_eq!(fs::read_to_string(&second.backup_path).unwrap(), "b");
    }

    #[test]
    fn runs_sharing_an_id_keep_separate_manifests() {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("a"), "1").unwrap();
        fs::write(home.path().join("b"), "2").unwrap();

        let first = BackupStore::with_run_dir(root.path().join("20260101T000000"));
        let second = BackupStore::with_run_dir(root.path().join("20260101T000000"));
        first.backup(&home.path().join("a")).unwrap();
        second.backup(&home.path().join("b")).unwrap();

        assert_ne!(first.run_dir(), second.run_dir());
        assert_eq!(
            second.run_dir(),
            root.path().join("20260101T000000.1")
        );
        let m1 = first.write_manifest().unwrap().expect("first manifest");
        let m2 = second.write_manifest().unwrap().expect("second manifest");
        assert_ne!(m1, m2);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(m1).unwrap()).unwrap();
        let backups = json["backups"].as_array().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0]["original_path"].as_str().unwrap().ends_with("/a"));
    }

    #[test]
    fn run_ids_have_sub_second_resolution() {
        let root = tempfile::tempdir().unwrap();
        let store = BackupStore::new(root.path());
        let id = store.run_dir().file_name().unwrap().to_string_lossy().to_string();
        let (_, fraction) = id.split_once('.').expect("fractional seconds");
        assert_eq!(fraction.len(), 6, "unexpected run id {id}");
    }

    #[test]
    fn manifest_lists_every_backup() {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("a"), "1").unwrap();
        fs::write(home.path().join("b"), "2").unwrap();

        let store = BackupStore::with_run_dir(root.path().join("20260101T000000"));
        store.backup(&home.path().join("a")).unwrap();
        store.backup(&home.path().join("b")).unwrap();

        let path = store.write_manifest().unwrap().expect("manifest written");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["run"], "20260101T000000");
        let backups = json["backups"].as_array().unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0]["original_path"]
            .as_str()
            .unwrap()
            .ends_with("/a"));
        assert_eq!(backups[1]["sha256"].as_str().unwrap().len(), 64);
    }
}

//! Filesystem primitives shared by the resources and the mutation guard.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

/// Directory names never descended into when walking a tree.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Create every missing ancestor of `path`.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {}", parent.display())),
        _ => Ok(()),
    }
}

/// Delete the entry at `path` without following it.
///
/// Symlinks (broken or not) are unlinked, directories removed recursively.
/// A missing path is not an error.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.with_context(|| format!("removing {}", path.display()))
}

/// Whether anything, including a dangling symlink, sits at `path`.
#[must_use]
pub fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Whether `path` is itself a symlink.
#[must_use]
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_symlink())
}

/// Replace the contents of `path` by writing a sibling temp file and
/// renaming it over the target.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(format!(".devenv-{}", std::process::id()));
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()));
    }
    Ok(())
}

/// Paths, relative to `root`, of every file in the tree, sorted.
///
/// Version-control directories are skipped. Directory symlinks are followed,
/// so their contents count as part of the tree.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn tree_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![PathBuf::new()];
    while let Some(rel) = pending.pop() {
        let dir = root.join(&rel);
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("reading directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
            let name = entry.file_name();
            let child = rel.join(&name);
            if entry.path().is_dir() {
                if !VCS_DIRS.iter().any(|v| name == *v) {
                    pending.push(child);
                }
            } else {
                files.push(child);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// First path strictly between `root` and `root/rel` that exists but is not a
/// real directory, such as a symlink to a directory elsewhere.
fn blocked_ancestor(root: &Path, rel: &Path) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    for component in rel.parent()?.components() {
        current.push(component);
        match current.symlink_metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Some(current),
            Err(_) => return None,
        }
    }
    None
}

/// Copy every file of the `src` tree into `dst`, creating directories as
/// needed. Files already in `dst` but absent from `src` are left alone.
///
/// Symlinks inside `dst` that stand where the tree needs a directory or a
/// file are replaced, never written through.
///
/// # Errors
///
/// Returns an error if the source cannot be walked or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).with_context(|| format!("creating directory {}", dst.display()))?;
    for rel in tree_files(src)? {
        let from = src.join(&rel);
        let to = dst.join(&rel);
        if let Some(blocked) = blocked_ancestor(dst, &rel) {
            remove_existing(&blocked)?;
        }
        ensure_parent_dir(&to)?;
        if is_symlink(&to) || to.is_dir() {
            remove_existing(&to)?;
        }
        std::fs::copy(&from, &to)
            .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
    }
    Ok(())
}

/// Whether every file of the `src` tree exists under `dst` as a regular file
/// with the same bytes, reached without passing through a symlink.
///
/// # Errors
///
/// Returns an error if the source cannot be walked or read.
pub fn tree_contained(src: &Path, dst: &Path) -> Result<bool> {
    if !dst.is_dir() {
        return Ok(false);
    }
    for rel in tree_files(src)? {
        let to = dst.join(&rel);
        if blocked_ancestor(dst, &rel).is_some() || is_symlink(&to) {
            return Ok(false);
        }
        let from = src.join(&rel);
        let expected = std::fs::read(&from).with_context(|| format!("reading {}", from.display()))?;
        if std::fs::read(&to).ok().as_ref() != Some(&expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        ensure_parent_dir(&path).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    // -----------------------------------------------------------------------
    // tree_files / copy / contained
    // -----------------------------------------------------------------------

    #[test]
    fn tree_files_are_relative_sorted_and_skip_vcs() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "zshrc", "z");
        write(src.path(), "conf.d/aliases.zsh", "a");
        write(src.path(), ".git/HEAD", "ref");
        write(src.path(), ".hg/store", "x");

        assert_eq!(
            tree_files(src.path()).unwrap(),
            vec![PathBuf::from("conf.d/aliases.zsh"), PathBuf::from("zshrc")]
        );
    }

    #[test]
    fn copy_then_contained() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "init.lua", "vim.o.number = true");
        write(src.path(), "lua/plugins.lua", "return {}");
        let target = dst.path().join("nvim");

        assert!(!tree_contained(src.path(), &target).unwrap());
        copy_dir_recursive(src.path(), &target).unwrap();
        assert_eq!(
            std::fs::read_to_string(target.join("lua/plugins.lua")).unwrap(),
            "return {}"
        );
        assert!(tree_contained(src.path(), &target).unwrap());
    }

    #[test]
    fn contained_ignores_extra_files_but_not_changed_ones() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "a", "1");
        write(dst.path(), "a", "1");
        write(dst.path(), "extra", "x");
        assert!(tree_contained(src.path(), dst.path()).unwrap());

        write(dst.path(), "a", "2");
        assert!(!tree_contained(src.path(), dst.path()).unwrap());
    }

    #[test]
    fn copy_replaces_symlinked_file_instead_of_writing_through() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "config", "new");
        let elsewhere = dst.path().join("elsewhere");
        std::fs::write(&elsewhere, "keep").unwrap();
        let target = dst.path().join("t");
        std::fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&elsewhere, target.join("config")).unwrap();

        copy_dir_recursive(src.path(), &target).unwrap();
        assert!(!is_symlink(&target.join("config")));
        assert_eq!(std::fs::read_to_string(&elsewhere).unwrap(), "keep");
    }

    #[test]
    fn copy_never_writes_through_symlinked_directory() {
        let repo = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(repo.path(), "nvim/init.lua", "kept");
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "nvim/init.lua", "copied");
        std::os::unix::fs::symlink(repo.path().join("nvim"), dst.path().join("nvim")).unwrap();

        assert!(!tree_contained(src.path(), dst.path()).unwrap());
        copy_dir_recursive(src.path(), dst.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(repo.path().join("nvim/init.lua")).unwrap(),
            "kept"
        );
        assert!(!is_symlink(&dst.path().join("nvim")));
        assert_eq!(
            std::fs::read_to_string(dst.path().join("nvim/init.lua")).unwrap(),
            "copied"
        );
        assert!(tree_contained(src.path(), dst.path()).unwrap());
    }

    #[test]
    fn leaf_symlink_with_matching_content_is_not_contained() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "config", "same");
        write(dst.path(), "elsewhere", "same");
        std::os::unix::fs::symlink(dst.path().join("elsewhere"), dst.path().join("config")).unwrap();

        assert!(!tree_contained(src.path(), dst.path()).unwrap());
    }

    #[test]
    fn file_standing_in_for_directory_is_replaced() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "conf.d/aliases.zsh", "alias ll='ls -l'");
        write(dst.path(), "conf.d", "not a directory");

        copy_dir_recursive(src.path(), dst.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dst.path().join("conf.d/aliases.zsh")).unwrap(),
            "alias ll='ls -l'"
        );
    }

    // -----------------------------------------------------------------------
    // write_atomic
    // -----------------------------------------------------------------------

    #[test]
    fn write_atomic_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitconfig");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    // -----------------------------------------------------------------------
    // remove_existing / occupied
    // -----------------------------------------------------------------------

    #[test]
    fn remove_existing_is_quiet_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_existing(&dir.path().join("nope")).unwrap();
    }

    #[test]
    fn dangling_symlink_is_occupied_and_removable() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("gone"), &link).unwrap();
        assert!(occupied(&link));
        assert!(is_symlink(&link));
        remove_existing(&link).unwrap();
        assert!(!occupied(&link));
    }

    #[test]
    fn removing_directory_link_keeps_its_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        write(&real, "keep", "k");
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        remove_existing(&link).unwrap();
        assert!(real.join("keep").exists());

        remove_existing(&real).unwrap();
        assert!(!real.exists());
    }
}

//! prepare-commit-msg hook management
//!
//! Installs a hook block that runs `commit-prefix apply` when git prepares a
//! commit message. Existing hook content is preserved: the block is appended
//! and later removed between its markers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::Repository;

use crate::error::{PrefixError, Result};

/// Hook git runs before opening the commit message editor
pub const HOOK_NAME: &str = "prepare-commit-msg";

const BEGIN_MARKER: &str = "# commit-prefix: begin";
const END_MARKER: &str = "# commit-prefix: end";
const SHEBANG: &str = "#!/bin/sh";

/// Installation state of the hook block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    /// No hook file exists
    Missing,
    /// A hook exists but doesn't call commit-prefix
    Foreign,
    Installed,
}

fn hook_block() -> String {
    format!(
        "{BEGIN_MARKER}\ncommit-prefix apply \"$1\" \"$2\" \"$3\" || true\n{END_MARKER}\n"
    )
}

/// Path of the prepare-commit-msg hook for the repository containing `repo_path`
pub fn hook_path(repo_path: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(repo_path).map_err(|_| PrefixError::NotGitRepository)?;
    Ok(common_dir(repo.path())?.join("hooks").join(HOOK_NAME))
}

/// Git directory shared by all worktrees
///
/// A linked worktree's private git dir holds a `commondir` file pointing at
/// the main one, relative to itself.
fn common_dir(git_dir: &Path) -> Result<PathBuf> {
    match fs::read_to_string(git_dir.join("commondir")) {
        Ok(target) => Ok(git_dir.join(target.trim())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(git_dir.to_path_buf()),
        Err(e) => Err(e.into()),
    }
}

/// Install the hook, keeping any existing content
///
/// Returns `false` if it was already installed.
pub fn install(repo_path: &Path) -> Result<bool> {
    let path = hook_path(repo_path)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let existing = read_existing(&path)?;
    if existing.contains(BEGIN_MARKER) {
        return Ok(false);
    }

    let content = if existing.trim().is_empty() {
        format!("{SHEBANG}\n{}", hook_block())
    } else {
        format!("{}\n\n{}", existing.trim_end(), hook_block())
    };

    fs::write(&path, content)?;
    make_executable(&path)?;

    Ok(true)
}

/// Remove the hook block, deleting the file if nothing else is left
///
/// Returns `false` if it wasn't installed.
pub fn uninstall(repo_path: &Path) -> Result<bool> {
    let path = hook_path(repo_path)?;
    let existing = read_existing(&path)?;
    if !existing.contains(BEGIN_MARKER) {
        return Ok(false);
    }

    let remaining = strip_block(&existing);
    let trimmed = remaining.trim();
    if trimmed.is_empty() || trimmed == SHEBANG {
        fs::remove_file(&path)?;
    } else {
        fs::write(&path, format!("{}\n", remaining.trim_end()))?;
    }

    Ok(true)
}

/// Current hook state
pub fn status(repo_path: &Path) -> Result<HookStatus> {
    let path = hook_path(repo_path)?;
    if !path.exists() {
        return Ok(HookStatus::Missing);
    }

    if read_existing(&path)?.contains(BEGIN_MARKER) {
        Ok(HookStatus::Installed)
    } else {
        Ok(HookStatus::Foreign)
    }
}

fn read_existing(path: &Path) -> Result<String> {
    if path.exists() {
        Ok(fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}

/// Drop every line between the markers, inclusive
fn strip_block(content: &str) -> String {
    let mut inside = false;
    let mut kept = Vec::new();

    for line in content.lines() {
        if line.trim() == BEGIN_MARKER {
            inside = true;
            continue;
        }
        if inside {
            if line.trim() == END_MARKER {
                inside = false;
            }
            continue;
        }
        kept.push(line);
    }

    kept.join("\n")
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

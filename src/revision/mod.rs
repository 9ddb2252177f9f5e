//! Revision tag discovery.
//!
//! The tag identifies the source revision a binary was built from and is stamped
//! on every diagnostic record. It is looked up once, next to the source tree the
//! executable lives in:
//! 1. `ArchiveTag.txt` in the source directory (first line)
//! 2. the head commit of `.git` in that directory, which is then cached to
//!    `ArchiveTag.txt`
//! 3. a sentinel string describing what was missing

mod cache;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::config::{GIT_FAILED_TAG, GIT_NOT_FOUND_TAG, NOT_SET_TAG, SOURCE_NOT_FOUND_TAG};
use crate::error_handling::RevisionError;

/// Reads the head revision of a `.git` directory.
pub trait TagSource: Send + Sync {
    fn head_revision(&self, git_dir: &Path) -> Result<String, RevisionError>;
}

/// Runs `git --git-dir=<dir> log -1 --format=%H`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCommand;

impl TagSource for GitCommand {
    fn head_revision(&self, git_dir: &Path) -> Result<String, RevisionError> {
        let output = Command::new("git")
            .arg(format!("--git-dir={}", git_dir.display()))
            .args(["log", "-1", "--format=%H"])
            .output()?;

        if !output.status.success() {
            return Err(RevisionError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("git stderr: {}", stderr.trim());
        }

        let revision = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        if revision.is_empty() {
            return Err(RevisionError::EmptyOutput);
        }
        Ok(revision)
    }
}

#[derive(Debug)]
struct Resolved {
    tag: String,
    source_dir: Option<PathBuf>,
}

/// Resolves and remembers the revision tag.
///
/// The first successful [`resolve`](Self::resolve) wins; later calls return
/// the remembered value without touching the filesystem.
#[derive(Debug)]
pub struct RevisionTagResolver<S = GitCommand> {
    source: S,
    state: Mutex<Resolved>,
}

impl RevisionTagResolver<GitCommand> {
    pub fn new() -> Self {
        Self::with_source(GitCommand)
    }
}

impl Default for RevisionTagResolver<GitCommand> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TagSource> RevisionTagResolver<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(Resolved {
                tag: NOT_SET_TAG.to_string(),
                source_dir: None,
            }),
        }
    }

    /// Returns the revision tag for the source tree containing `program_name`,
    /// searching upwards from the directory of `executable`.
    ///
    /// Never fails: problems are logged and reported as sentinel tags.
    pub fn resolve(&self, executable: &Path, program_name: &str) -> String {
        let mut state = self.lock();
        if !state.tag.is_empty() && state.tag != NOT_SET_TAG {
            debug!("Revision tag already set: {}", state.tag);
            return state.tag.clone();
        }

        let Some(source_dir) = find_source_dir(executable, program_name) else {
            warn!("Source path not found for {}", program_name);
            state.tag = SOURCE_NOT_FOUND_TAG.to_string();
            return state.tag.clone();
        };
        debug!("Source path is {}", source_dir.display());
        state.source_dir = Some(source_dir.clone());

        match cache::load_tag(&source_dir) {
            Ok(Some(tag)) => {
                info!("Revision tag from {}: {}", cache::tag_file(&source_dir).display(), tag);
                state.tag = tag;
                return state.tag.clone();
            }
            Ok(None) => {}
            Err(e) => warn!("Unable to read cached revision tag: {e}"),
        }

        let git_dir = source_dir.join(".git");
        if !git_dir.is_dir() {
            warn!("Git archive not found; path is {}", git_dir.display());
            state.tag = GIT_NOT_FOUND_TAG.to_string();
            return state.tag.clone();
        }

        state.tag = match self.source.head_revision(&git_dir) {
            Ok(revision) => {
                if let Err(e) = cache::save_tag(&source_dir, &revision) {
                    warn!("Unable to cache revision tag: {e}");
                }
                revision
            }
            Err(e) => {
                warn!("Unable to read revision from {}: {e}", git_dir.display());
                GIT_FAILED_TAG.to_string()
            }
        };
        info!("Revision tag: {}", state.tag);
        state.tag.clone()
    }

    /// Current tag, `NotSet` until resolved.
    pub fn tag(&self) -> String {
        self.lock().tag.clone()
    }

    /// Directory found by the last [`resolve`](Self::resolve).
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.lock().source_dir.clone()
    }

    /// Base name of the source directory, suitable as a connection name.
    pub fn source_name(&self) -> Option<String> {
        self.source_dir()
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn lock(&self) -> MutexGuard<'_, Resolved> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Nearest ancestor of the executable's directory that contains `program_name`.
fn find_source_dir(executable: &Path, program_name: &str) -> Option<PathBuf> {
    let canonical = executable
        .canonicalize()
        .unwrap_or_else(|_| executable.to_path_buf());
    let start = canonical.parent()?;
    start
        .ancestors()
        .find(|dir| dir.join(program_name).exists())
        .map(Path::to_path_buf)
}

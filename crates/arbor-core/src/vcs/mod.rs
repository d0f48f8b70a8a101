//! Version control backends behind one status interface
//!
//! Two backends are supported: git (primary) and jj (secondary). A directory
//! can carry both `.git` and `.jj`; jj wins when its binary is installed
//! because it is the more specific of the two.

pub mod git;
pub mod jj;

pub use git::GitRepo;
pub use jj::JjRepo;

use crate::diff::DiffMarker;
use crate::status::{normalize_path, StatusIndex, VcsStatus};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Failure of a single VCS subprocess.
///
/// Never escapes a backend: callers see neutral status instead.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{program} produced non-UTF-8 output")]
    NonUtf8 { program: String },
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    /// Probe the directory
    #[default]
    Auto,
    Git,
    Jj,
}

impl VcsKind {
    pub fn label(self) -> &'static str {
        match self {
            VcsKind::Auto => "auto",
            VcsKind::Git => "git",
            VcsKind::Jj => "jj",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(VcsKind::Auto),
            "git" => Ok(VcsKind::Git),
            "jj" | "jujutsu" => Ok(VcsKind::Jj),
            other => Err(format!("unknown VCS backend: {other}")),
        }
    }
}

/// Status capabilities every backend provides
pub trait VcsRepo {
    /// Concrete backend (never `Auto`)
    fn kind(&self) -> VcsKind;

    fn is_inside_repo(&self) -> bool;

    /// Status of `path`, inherited from descendants for directories
    fn status(&self, path: &Path) -> VcsStatus;

    /// Short label for the status bar; empty outside a repository
    fn display_info(&self) -> String;

    fn root(&self) -> Option<&Path>;

    /// Re-derive everything by asking the tool again
    fn refresh(&mut self, path: &Path);

    /// Paths currently reported as deleted
    fn deleted_files(&self) -> &[PathBuf];

    /// Per-line change markers for one working-copy file
    fn file_diff(&self, path: &Path) -> Vec<DiffMarker>;
}

/// Pick the backend for `path` by probing: jj when `.jj` is present in the
/// path or an ancestor and `jj` is installed, git otherwise.
pub fn detect(path: &Path) -> VcsKind {
    if has_jj_repo(path) && has_command("jj") {
        VcsKind::Jj
    } else {
        VcsKind::Git
    }
}

/// Open and load the repository containing `path`.
///
/// Forcing jj still falls back to git when jj cannot be used here.
pub fn open_repo(path: &Path, kind: VcsKind) -> Box<dyn VcsRepo> {
    let resolved = match kind {
        VcsKind::Auto => detect(path),
        VcsKind::Jj if detect(path) == VcsKind::Jj => VcsKind::Jj,
        VcsKind::Jj => {
            debug!(path = %path.display(), "jj requested but unavailable, using git");
            VcsKind::Git
        }
        VcsKind::Git => VcsKind::Git,
    };

    match resolved {
        VcsKind::Jj => Box::new(JjRepo::open(path)),
        _ => Box::new(GitRepo::open(path)),
    }
}

/// Walk up from `path` looking for a `.jj` directory
pub fn has_jj_repo(path: &Path) -> bool {
    let start = normalize_path(path);
    start.ancestors().any(|dir| dir.join(".jj").is_dir())
}

/// Whether `program` can be found on `PATH`
pub fn has_command(program: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return true;
        }
        cfg!(windows) && candidate.with_extension("exe").is_file()
    })
}

/// Run a VCS tool and return its stdout on success
pub(crate) fn run<I, S>(program: &str, args: I) -> Result<String, VcsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_PAGER", "cat")
        .env("PAGER", "cat")
        .env("NO_COLOR", "1")
        .output()
        .map_err(|source| VcsError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(VcsError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| VcsError::NonUtf8 {
        program: program.to_string(),
    })
}

/// `run`, with failures logged and flattened to `None`
pub(crate) fn run_quiet<I, S>(program: &str, args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    match run(program, args) {
        Ok(out) => Some(out),
        Err(err) => {
            debug!(error = %err, "vcs command failed");
            None
        }
    }
}

/// Root, index and deleted list shared by every backend
#[derive(Debug, Clone, Default)]
pub(crate) struct RepoState {
    pub(crate) root: Option<PathBuf>,
    pub(crate) statuses: StatusIndex,
    pub(crate) deleted: Vec<PathBuf>,
}

impl RepoState {
    pub(crate) fn reset(&mut self) {
        self.root = None;
        self.statuses.clear();
        self.deleted.clear();
    }

    /// Record a repository-relative path
    pub(crate) fn record(&mut self, relative: &str, status: VcsStatus) {
        let Some(root) = self.root.as_ref() else {
            return;
        };
        let full = normalize_path(&root.join(relative));
        let previous = self.statuses.insert(full.clone(), status);
        if status == VcsStatus::Deleted && previous != Some(VcsStatus::Deleted) {
            self.deleted.push(full);
        }
    }

    pub(crate) fn status(&self, path: &Path) -> VcsStatus {
        if self.root.is_none() {
            return VcsStatus::None;
        }
        self.statuses.lookup(path)
    }

    /// `path` relative to the repository root, if it lives inside it
    pub(crate) fn relative(&self, path: &Path) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let normalized = normalize_path(path);
        normalized
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

/// Turn a tool's `root` output into a normalized path
pub(crate) fn parse_root(output: &str) -> Option<PathBuf> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize_path(Path::new(trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("git".parse::<VcsKind>(), Ok(VcsKind::Git));
        assert_eq!("JJ".parse::<VcsKind>(), Ok(VcsKind::Jj));
        assert_eq!(" auto ".parse::<VcsKind>(), Ok(VcsKind::Auto));
        assert!("svn".parse::<VcsKind>().is_err());
    }

    #[test]
    fn test_has_jj_repo_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".jj")).unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        assert!(has_jj_repo(&dir.path().join("a/b")));
        assert!(has_jj_repo(&dir.path().join("a/b/missing.txt")));
    }

    #[test]
    fn test_has_command_missing() {
        assert!(!has_command("arbor-definitely-not-installed"));
    }

    #[test]
    fn test_run_missing_program_is_spawn_error() {
        let err = run("arbor-definitely-not-installed", ["--version"]).unwrap_err();
        assert!(matches!(err, VcsError::Spawn { .. }));
    }

    #[test]
    fn test_repo_state_records_deleted_once() {
        let dir = TempDir::new().unwrap();
        let mut state = RepoState {
            root: Some(normalize_path(dir.path())),
            ..Default::default()
        };
        state.record("gone.txt", VcsStatus::Deleted);
        state.record("gone.txt", VcsStatus::Deleted);
        state.record("src/lib.rs", VcsStatus::Modified);

        assert_eq!(state.deleted.len(), 1);
        assert_eq!(state.status(&dir.path().join("src")), VcsStatus::Modified);
        assert_eq!(
            state.relative(&dir.path().join("src/lib.rs")),
            Some(PathBuf::from("src/lib.rs"))
        );
        assert_eq!(state.relative(dir.path()), None);
    }

    #[test]
    fn test_repo_state_without_root_is_neutral() {
        let mut state = RepoState::default();
        state.record("x", VcsStatus::Modified);
        assert!(state.statuses.is_empty());
        assert_eq!(state.status(Path::new("/x")), VcsStatus::None);
    }

    #[test]
    fn test_open_outside_any_repo_is_neutral() {
        let dir = TempDir::new().unwrap();
        let repo = open_repo(dir.path(), VcsKind::Git);
        if repo.is_inside_repo() {
            // The temp dir itself sits inside a checkout on this machine.
            return;
        }
        assert_eq!(repo.display_info(), "");
        assert!(repo.deleted_files().is_empty());
        assert_eq!(repo.status(dir.path()), VcsStatus::None);
        assert!(repo.file_diff(&dir.path().join("x")).is_empty());
    }
}

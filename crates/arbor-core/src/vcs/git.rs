//! Git backend driven by `git status --porcelain`

use super::{parse_root, run_quiet, RepoState, VcsKind, VcsRepo};
use crate::diff::{classify, DiffMarker};
use crate::status::VcsStatus;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Status snapshot of a git working tree
#[derive(Debug, Clone, Default)]
pub struct GitRepo {
    state: RepoState,
    branch: String,
    ahead: usize,
}

impl GitRepo {
    /// Locate the repository containing `path` and load its status.
    /// Outside a repository the result reports nothing.
    pub fn open(path: &Path) -> Self {
        let mut repo = Self::default();
        repo.refresh(path);
        repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Commits on HEAD not yet on its upstream
    pub fn ahead(&self) -> usize {
        self.ahead
    }

    fn git(&self, args: &[&str]) -> Option<String> {
        git_in(self.state.root.as_ref()?, args)
    }

    fn load_statuses(&mut self) {
        if let Some(output) = self.git(&["status", "--porcelain", "-uall"]) {
            for (path, status) in parse_porcelain(&output) {
                self.state.record(&path, status);
            }
        }

        if let Some(output) = self.git(&["status", "--porcelain", "--ignored", "-uall"]) {
            for path in parse_ignored(&output) {
                self.state.record(&path, VcsStatus::Ignored);
            }
        }
    }
}

impl VcsRepo for GitRepo {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn is_inside_repo(&self) -> bool {
        self.state.root.is_some()
    }

    fn status(&self, path: &Path) -> VcsStatus {
        self.state.status(path)
    }

    fn display_info(&self) -> String {
        if self.ahead > 0 {
            format!("{} ↑{}", self.branch, self.ahead)
        } else {
            self.branch.clone()
        }
    }

    fn root(&self) -> Option<&Path> {
        self.state.root.as_deref()
    }

    fn refresh(&mut self, path: &Path) {
        self.state.reset();
        self.branch.clear();
        self.ahead = 0;

        let dir = if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(path)
        };
        let Some(root) =
            git_in(dir, &["rev-parse", "--show-toplevel"]).and_then(|out| parse_root(&out))
        else {
            debug!(path = %path.display(), "not inside a git repository");
            return;
        };

        self.state.root = Some(root);
        self.load_statuses();
        self.branch = self
            .git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|out| out.trim().to_string())
            .unwrap_or_default();
        // No upstream is the common case; the command fails and ahead stays 0.
        self.ahead = self
            .git(&["rev-list", "--count", "@{upstream}..HEAD"])
            .and_then(|out| out.trim().parse().ok())
            .unwrap_or(0);

        debug!(
            root = ?self.state.root,
            entries = self.state.statuses.len(),
            deleted = self.state.deleted.len(),
            branch = %self.branch,
            "git status loaded"
        );
    }

    fn deleted_files(&self) -> &[PathBuf] {
        &self.state.deleted
    }

    fn file_diff(&self, path: &Path) -> Vec<DiffMarker> {
        let Some(relative) = self.state.relative(path) else {
            return Vec::new();
        };
        let Some(rel) = relative.to_str() else {
            return Vec::new();
        };
        self.git(&["diff", "-U0", "--", rel])
            .map(|out| classify(&out))
            .unwrap_or_default()
    }
}

/// Run git with its working directory forced to `dir`
fn git_in(dir: &Path, args: &[&str]) -> Option<String> {
    let mut full: Vec<&OsStr> = vec![OsStr::new("-C"), dir.as_os_str()];
    full.extend(args.iter().map(OsStr::new));
    run_quiet("git", full)
}

/// Map the two porcelain status columns onto the shared vocabulary
pub fn parse_status_code(index: u8, worktree: u8) -> VcsStatus {
    match (index, worktree) {
        (b'?', b'?') => VcsStatus::Untracked,
        (b'!', b'!') => VcsStatus::Ignored,
        (b'U', _) | (_, b'U') | (b'A', b'A') | (b'D', b'D') => VcsStatus::Conflict,
        (b'R', _) => VcsStatus::Renamed,
        (b'A', _) => VcsStatus::Added,
        (b'D', _) | (_, b'D') => VcsStatus::Deleted,
        (b'M', _) | (_, b'M') => VcsStatus::Modified,
        _ => VcsStatus::None,
    }
}

/// Parse `status --porcelain` output into repository-relative paths.
///
/// Renames keep only the destination path.
pub fn parse_porcelain(output: &str) -> Vec<(String, VcsStatus)> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let bytes = line.as_bytes();
        if bytes.len() < 4 {
            continue;
        }
        let status = parse_status_code(bytes[0], bytes[1]);
        let Some(mut path) = line.get(3..) else {
            continue;
        };
        if let Some((_, new)) = path.split_once(" -> ") {
            path = new;
        }
        entries.push((unquote(path), status));
    }
    entries
}

/// Paths from the `!! ` lines of `status --porcelain --ignored`
pub fn parse_ignored(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("!! "))
        .map(unquote)
        .collect()
}

/// Undo git's path quoting: surrounding quotes plus C-style escapes, with
/// non-ASCII bytes written as octal (`core.quotePath`).
fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_code_table() {
        let cases = [
            (b'?', b'?', VcsStatus::Untracked),
            (b'!', b'!', VcsStatus::Ignored),
            (b'U', b'U', VcsStatus::Conflict),
            (b'A', b'U', VcsStatus::Conflict),
            (b'A', b'A', VcsStatus::Conflict),
            (b'D', b'D', VcsStatus::Conflict),
            (b'R', b' ', VcsStatus::Renamed),
            (b'R', b'M', VcsStatus::Renamed),
            (b'A', b' ', VcsStatus::Added),
            (b'A', b'M', VcsStatus::Added),
            (b'D', b' ', VcsStatus::Deleted),
            (b' ', b'D', VcsStatus::Deleted),
            (b'M', b' ', VcsStatus::Modified),
            (b' ', b'M', VcsStatus::Modified),
            (b'M', b'M', VcsStatus::Modified),
            (b' ', b' ', VcsStatus::None),
        ];
        for (x, y, expected) in cases {
            assert_eq!(
                parse_status_code(x, y),
                expected,
                "{}{}",
                x as char,
                y as char
            );
        }
    }

    #[test]
    fn test_parse_porcelain() {
        let output = " M src/main.rs\nA  new.rs\n D gone.rs\nR  old.rs -> renamed.rs\n?? notes.txt\nUU both.rs\n\nxy\n";
        let entries = parse_porcelain(output);
        assert_eq!(
            entries,
            vec![
                ("src/main.rs".to_string(), VcsStatus::Modified),
                ("new.rs".to_string(), VcsStatus::Added),
                ("gone.rs".to_string(), VcsStatus::Deleted),
                ("renamed.rs".to_string(), VcsStatus::Renamed),
                ("notes.txt".to_string(), VcsStatus::Untracked),
                ("both.rs".to_string(), VcsStatus::Conflict),
            ]
        );
    }

    #[test]
    fn test_parse_porcelain_quoted_path() {
        let entries = parse_porcelain("?? \"with space.txt\"\n");
        assert_eq!(
            entries,
            vec![("with space.txt".to_string(), VcsStatus::Untracked)]
        );
    }

    #[test]
    fn test_parse_porcelain_escaped_non_ascii() {
        let entries = parse_porcelain(" M \"caf\\303\\251.txt\"\n?? \"tab\\there \\\"q\\\".md\"\n");
        assert_eq!(
            entries,
            vec![
                ("café.txt".to_string(), VcsStatus::Modified),
                ("tab\there \"q\".md".to_string(), VcsStatus::Untracked),
            ]
        );
    }

    #[test]
    fn test_parse_ignored_only_bang_lines() {
        let output = " M a.rs\n!! target/debug/out\n?? b.rs\n!! .env\n";
        assert_eq!(parse_ignored(output), vec!["target/debug/out", ".env"]);
    }

    #[test]
    fn test_display_info_with_ahead() {
        let repo = GitRepo {
            branch: "main".to_string(),
            ahead: 2,
            ..Default::default()
        };
        assert_eq!(repo.display_info(), "main ↑2");

        let repo = GitRepo {
            branch: "main".to_string(),
            ..Default::default()
        };
        assert_eq!(repo.display_info(), "main");
        assert_eq!(GitRepo::default().display_info(), "");
    }
}

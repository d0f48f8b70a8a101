//! Jujutsu backend driven by `jj status` and `jj log`

use super::{parse_root, run_quiet, RepoState, VcsKind, VcsRepo};
use crate::diff::{classify, DiffMarker};
use crate::status::VcsStatus;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

const CHANGES_HEADER: &str = "Working copy changes:";

/// Status snapshot of a jj working copy
#[derive(Debug, Clone, Default)]
pub struct JjRepo {
    state: RepoState,
    change_id: String,
    bookmark: String,
}

impl JjRepo {
    pub fn open(path: &Path) -> Self {
        let mut repo = Self::default();
        repo.refresh(path);
        repo
    }

    /// Short id of the working-copy change
    pub fn change_id(&self) -> &str {
        &self.change_id
    }

    pub fn bookmark(&self) -> &str {
        &self.bookmark
    }

    fn jj(&self, args: &[&str]) -> Option<String> {
        jj_in(self.state.root.as_ref()?, args)
    }

    fn load_statuses(&mut self) {
        let Some(output) = self.jj(&["status"]) else {
            return;
        };
        for (path, status) in parse_jj_status(&output) {
            self.state.record(&path, status);
        }
    }

    fn load_working_copy_info(&mut self) {
        self.change_id = self
            .jj(&["log", "-r", "@", "--no-graph", "-T", "change_id.short(8)"])
            .map(|out| out.trim().to_string())
            .unwrap_or_default();
        self.bookmark = self
            .jj(&["log", "-r", "@", "--no-graph", "-T", "bookmarks"])
            .map(|out| clean_bookmark(&out))
            .unwrap_or_default();
    }
}

impl VcsRepo for JjRepo {
    fn kind(&self) -> VcsKind {
        VcsKind::Jj
    }

    fn is_inside_repo(&self) -> bool {
        self.state.root.is_some()
    }

    fn status(&self, path: &Path) -> VcsStatus {
        self.state.status(path)
    }

    fn display_info(&self) -> String {
        match (self.change_id.is_empty(), self.bookmark.is_empty()) {
            (true, _) => String::new(),
            (false, true) => format!("@{}", self.change_id),
            (false, false) => format!("@{} ({})", self.change_id, self.bookmark),
        }
    }

    fn root(&self) -> Option<&Path> {
        self.state.root.as_deref()
    }

    fn refresh(&mut self, path: &Path) {
        self.state.reset();
        self.change_id.clear();
        self.bookmark.clear();

        let Some(root) = jj_in(path, &["root"]).and_then(|out| parse_root(&out)) else {
            debug!(path = %path.display(), "not inside a jj repository");
            return;
        };

        self.state.root = Some(root);
        self.load_statuses();
        self.load_working_copy_info();

        debug!(
            root = ?self.state.root,
            entries = self.state.statuses.len(),
            change = %self.change_id,
            "jj status loaded"
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
        self.jj(&["diff", "--git", "--context", "0", "--", rel])
            .map(|out| classify(&out))
            .unwrap_or_default()
    }
}

fn jj_in(repo: &Path, args: &[&str]) -> Option<String> {
    let mut full: Vec<&OsStr> = vec![
        OsStr::new("-R"),
        repo.as_os_str(),
        OsStr::new("--color"),
        OsStr::new("never"),
    ];
    full.extend(args.iter().map(OsStr::new));
    run_quiet("jj", full)
}

pub fn parse_jj_code(code: u8) -> VcsStatus {
    match code {
        b'M' => VcsStatus::Modified,
        b'A' => VcsStatus::Added,
        b'D' => VcsStatus::Deleted,
        b'R' => VcsStatus::Renamed,
        b'C' => VcsStatus::Conflict,
        _ => VcsStatus::None,
    }
}

/// Parse the `Working copy changes:` section of `jj status`.
///
/// The section ends at the next header (`Working copy ...`, `Parent commit...`).
/// Renames written as `dir/{old => new}` keep only the new path.
pub fn parse_jj_status(output: &str) -> Vec<(String, VcsStatus)> {
    let mut entries = Vec::new();
    let mut in_changes = false;

    for line in output.lines() {
        if line.starts_with(CHANGES_HEADER) {
            in_changes = true;
            continue;
        }
        if line.starts_with("Working copy") || line.starts_with("Parent commit") {
            in_changes = false;
            continue;
        }
        if !in_changes {
            continue;
        }

        let line = line.trim();
        let Some((code, path)) = line.split_once(' ') else {
            continue;
        };
        let &[code] = code.as_bytes() else {
            continue;
        };
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        let status = parse_jj_code(code);
        if status == VcsStatus::None {
            continue;
        }
        entries.push((rename_target(path), status));
    }
    entries
}

/// Resolve `src/{a.rs => b.rs}` or `{a => b}/c.rs` to the destination path
fn rename_target(path: &str) -> String {
    let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) else {
        return path.to_string();
    };
    if close < open {
        return path.to_string();
    }
    let inner = &path[open + 1..close];
    let Some((_, new)) = inner.split_once(" => ") else {
        return path.to_string();
    };
    let joined = format!("{}{}{}", &path[..open], new, &path[close + 1..]);
    // An empty side of the brace leaves a doubled separator behind.
    joined.replace("//", "/")
}

/// Reduce the `bookmarks` template output to one plain name
pub fn clean_bookmark(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches('*')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "\
Working copy changes:
M src/main.rs
A src/new.rs
D old.txt
R src/{lib.rs => core.rs}
C conflicted.rs
Working copy  (@) : kntqzsqt 1a2b3c4d (no description set)
Parent commit (@-): zzzzzzzz 00000000 (empty) (no description set)
";

    #[test]
    fn test_parse_jj_status_section() {
        let entries = parse_jj_status(STATUS);
        assert_eq!(
            entries,
            vec![
                ("src/main.rs".to_string(), VcsStatus::Modified),
                ("src/new.rs".to_string(), VcsStatus::Added),
                ("old.txt".to_string(), VcsStatus::Deleted),
                ("src/core.rs".to_string(), VcsStatus::Renamed),
                ("conflicted.rs".to_string(), VcsStatus::Conflict),
            ]
        );
    }

    #[test]
    fn test_parse_jj_status_older_headers() {
        let output = "Parent commit: abc\nWorking copy changes:\nM a.rs\nWorking copy : def\nM ignored.rs\n";
        assert_eq!(
            parse_jj_status(output),
            vec![("a.rs".to_string(), VcsStatus::Modified)]
        );
    }

    #[test]
    fn test_parse_jj_status_clean() {
        let output = "The working copy has no changes.\nWorking copy  (@) : abc\n";
        assert!(parse_jj_status(output).is_empty());
    }

    #[test]
    fn test_parse_jj_status_skips_unknown_codes() {
        let output = "Working copy changes:\nX weird.rs\nM\nM  spaced.rs\n";
        assert_eq!(
            parse_jj_status(output),
            vec![("spaced.rs".to_string(), VcsStatus::Modified)]
        );
    }

    #[test]
    fn test_rename_target() {
        assert_eq!(rename_target("src/{a.rs => b.rs}"), "src/b.rs");
        assert_eq!(rename_target("{old => new}/mod.rs"), "new/mod.rs");
        assert_eq!(rename_target("src/{ => nested}/x.rs"), "src/nested/x.rs");
        assert_eq!(rename_target("src/{nested => }/x.rs"), "src/x.rs");
        assert_eq!(rename_target("plain.rs"), "plain.rs");
    }

    #[test]
    fn test_clean_bookmark() {
        assert_eq!(clean_bookmark("main*\n"), "main");
        assert_eq!(clean_bookmark("  feature dev\n"), "feature");
        assert_eq!(clean_bookmark("main* other"), "main");
        assert_eq!(clean_bookmark(""), "");
    }

    #[test]
    fn test_display_info() {
        let mut repo = JjRepo::default();
        assert_eq!(repo.display_info(), "");
        repo.change_id = "kntqzsqt".to_string();
        assert_eq!(repo.display_info(), "@kntqzsqt");
        repo.bookmark = "main".to_string();
        assert_eq!(repo.display_info(), "@kntqzsqt (main)");
    }
}

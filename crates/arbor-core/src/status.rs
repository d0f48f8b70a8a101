//! Normalized VCS status vocabulary and the per-path status index

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Status of a path, shared by every VCS backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsStatus {
    #[default]
    None,
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Ignored,
    Conflict,
}

impl VcsStatus {
    /// Single-letter code used in plain listings
    pub fn letter(self) -> char {
        match self {
            VcsStatus::None => ' ',
            VcsStatus::Modified => 'M',
            VcsStatus::Added => 'A',
            VcsStatus::Deleted => 'D',
            VcsStatus::Renamed => 'R',
            VcsStatus::Untracked => '?',
            VcsStatus::Ignored => '!',
            VcsStatus::Conflict => 'U',
        }
    }

    /// True for statuses that make a parent directory show as modified
    pub fn is_change(self) -> bool {
        matches!(
            self,
            VcsStatus::Modified
                | VcsStatus::Added
                | VcsStatus::Deleted
                | VcsStatus::Renamed
                | VcsStatus::Conflict
        )
    }
}

/// Absolute, symlink-resolved path -> status.
///
/// Replaced wholesale on every refresh; never merged.
#[derive(Debug, Clone, Default)]
pub struct StatusIndex {
    entries: FxHashMap<PathBuf, VcsStatus>,
}

impl StatusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status, returning the one it replaced. The path is expected
    /// to be normalized already.
    pub fn insert(&mut self, path: PathBuf, status: VcsStatus) -> Option<VcsStatus> {
        self.entries.insert(path, status)
    }

    pub fn get(&self, path: &Path) -> Option<VcsStatus> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up `path`: exact entry first, then inherited from descendants
    pub fn lookup(&self, path: &Path) -> VcsStatus {
        let normalized = normalize_path(path);
        if let Some(status) = self.get(&normalized) {
            return status;
        }
        self.propagate(&normalized)
    }

    /// Status a directory inherits from the paths below it.
    ///
    /// Any change below wins over untracked; a plain linear scan.
    pub fn propagate(&self, dir: &Path) -> VcsStatus {
        let mut prefix = dir.as_os_str().to_string_lossy().into_owned();
        if !prefix.ends_with(MAIN_SEPARATOR) {
            prefix.push(MAIN_SEPARATOR);
        }

        let mut has_untracked = false;
        for (path, status) in &self.entries {
            if !path.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            if status.is_change() {
                return VcsStatus::Modified;
            }
            if *status == VcsStatus::Untracked {
                has_untracked = true;
            }
        }

        if has_untracked {
            VcsStatus::Untracked
        } else {
            VcsStatus::None
        }
    }
}

/// Make `path` absolute and resolve symlinks.
///
/// Falls back to the absolute form when the path cannot be resolved
/// (deleted files have nothing on disk to canonicalize). For those, the
/// nearest existing ancestor is resolved and the missing tail re-attached so
/// aliased roots still compare equal.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };

    if let Ok(resolved) = absolute.canonicalize() {
        return resolved;
    }

    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(resolved) = parent.canonicalize() {
            let mut out = resolved;
            for name in tail.iter().rev() {
                out.push(name);
            }
            return out;
        }
        current = parent;
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, VcsStatus)]) -> StatusIndex {
        let mut idx = StatusIndex::new();
        for (path, status) in entries {
            idx.insert(PathBuf::from(path), *status);
        }
        idx
    }

    #[test]
    fn test_propagate_modified_to_parent() {
        let idx = index(&[("/r/d/f1", VcsStatus::Modified)]);
        assert_eq!(idx.propagate(Path::new("/r/d")), VcsStatus::Modified);
        assert_eq!(idx.propagate(Path::new("/r")), VcsStatus::Modified);
        assert_eq!(idx.propagate(Path::new("/r/other")), VcsStatus::None);
    }

    #[test]
    fn test_propagate_prefers_change_over_untracked() {
        let idx = index(&[
            ("/r/d/new.txt", VcsStatus::Untracked),
            ("/r/d/sub/gone.txt", VcsStatus::Deleted),
        ]);
        assert_eq!(idx.propagate(Path::new("/r/d")), VcsStatus::Modified);

        let idx = index(&[("/r/d/new.txt", VcsStatus::Untracked)]);
        assert_eq!(idx.propagate(Path::new("/r/d")), VcsStatus::Untracked);
    }

    #[test]
    fn test_propagate_ignores_ignored_and_sibling_prefixes() {
        let idx = index(&[
            ("/r/d/target/out", VcsStatus::Ignored),
            ("/r/dx/f", VcsStatus::Modified),
        ]);
        assert_eq!(idx.propagate(Path::new("/r/d")), VcsStatus::None);
    }

    #[test]
    fn test_exact_entry_wins_over_propagation() {
        let idx = index(&[
            ("/r/d", VcsStatus::Untracked),
            ("/r/d/f", VcsStatus::Modified),
        ]);
        assert_eq!(idx.get(Path::new("/r/d")), Some(VcsStatus::Untracked));
    }

    #[test]
    fn test_normalize_missing_file_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");
        let normalized = normalize_path(&missing);
        assert_eq!(normalized.file_name().unwrap(), "gone.txt");
        assert_eq!(
            normalized.parent().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_insert_returns_previous_status() {
        let mut idx = StatusIndex::new();
        assert_eq!(idx.insert(PathBuf::from("/r/a"), VcsStatus::Deleted), None);
        assert_eq!(
            idx.insert(PathBuf::from("/r/a"), VcsStatus::Modified),
            Some(VcsStatus::Deleted)
        );
        assert_eq!(idx.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_aliases_compare_equal() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let alias = dir.path().join("alias");
        std::fs::create_dir(&real).unwrap();
        std::fs::write(real.join("x"), "").unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        let mut idx = StatusIndex::new();
        idx.insert(normalize_path(&alias.join("x")), VcsStatus::Modified);
        assert_eq!(idx.lookup(&real.join("x")), VcsStatus::Modified);
        assert_eq!(idx.lookup(&alias.join("x")), VcsStatus::Modified);
        assert_eq!(idx.lookup(&real), VcsStatus::Modified);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_file_under_symlinked_parent() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let alias = dir.path().join("alias");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        let gone = normalize_path(&alias.join("gone.txt"));
        assert_eq!(gone, real.canonicalize().unwrap().join("gone.txt"));

        let mut idx = StatusIndex::new();
        idx.insert(gone, VcsStatus::Deleted);
        assert_eq!(idx.lookup(&real.join("gone.txt")), VcsStatus::Deleted);
        assert_eq!(idx.lookup(&alias.join("gone.txt")), VcsStatus::Deleted);
    }

    #[test]
    fn test_letters_are_distinct() {
        let all = [
            VcsStatus::Modified,
            VcsStatus::Added,
            VcsStatus::Deleted,
            VcsStatus::Renamed,
            VcsStatus::Untracked,
            VcsStatus::Ignored,
            VcsStatus::Conflict,
        ];
        let mut letters: Vec<char> = all.iter().map(|s| s.letter()).collect();
        letters.sort();
        letters.dedup();
        assert_eq!(letters.len(), all.len());
    }
}

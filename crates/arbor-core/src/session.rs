//! Keeps a [`FileTree`] and a VCS snapshot consistent with each other.
//!
//! Every mutation funnels through the same order: re-read the tree from disk,
//! re-query the repository, then re-insert ghost nodes for deleted paths.
//! Ghost insertion is idempotent, so it also runs after any expansion that
//! may have revealed a directory holding deleted files.

use crate::diff::DiffMarker;
use crate::status::VcsStatus;
use crate::tree::{FileNode, FileTree, TreeError};
use crate::vcs::{open_repo, VcsKind, VcsRepo};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// One visible row, as emitted by listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatEntry {
    pub path: PathBuf,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub expanded: bool,
    pub is_ghost: bool,
    pub status: VcsStatus,
}

pub struct Session {
    tree: FileTree,
    repo: Box<dyn VcsRepo>,
    kind: VcsKind,
}

impl Session {
    /// Build the tree at `path` and load the repository that contains it
    pub fn open(
        path: impl AsRef<Path>,
        show_hidden: bool,
        kind: VcsKind,
    ) -> Result<Self, SessionError> {
        let tree = FileTree::build(path, show_hidden)?;
        let repo = open_repo(tree.root_path(), kind);
        Ok(Self::from_parts(tree, repo, kind))
    }

    /// Combine an already loaded tree and repository
    pub fn from_parts(tree: FileTree, repo: Box<dyn VcsRepo>, kind: VcsKind) -> Self {
        let mut session = Self { tree, repo, kind };
        session.apply_ghosts();
        session
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn repo(&self) -> &dyn VcsRepo {
        self.repo.as_ref()
    }

    /// Backend selection this session was opened with
    pub fn requested_kind(&self) -> VcsKind {
        self.kind
    }

    /// Full refresh after an external change
    pub fn reload(&mut self) -> Result<(), SessionError> {
        let started = Instant::now();
        self.tree.refresh()?;
        self.repo.refresh(self.tree.root_path());
        self.apply_ghosts();
        debug!(
            elapsed = ?started.elapsed(),
            visible = self.tree.len(),
            "reconciled"
        );
        Ok(())
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) -> Result<(), SessionError> {
        self.tree.set_show_hidden(show_hidden)?;
        self.apply_ghosts();
        Ok(())
    }

    /// Re-root the session, keeping the hidden-file setting and backend choice
    pub fn change_root(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let tree = FileTree::build(path, self.tree.show_hidden())?;
        self.repo = open_repo(tree.root_path(), self.kind);
        self.tree = tree;
        self.apply_ghosts();
        Ok(())
    }

    pub fn expand(&mut self, index: usize) -> Result<(), SessionError> {
        self.tree.expand(index)?;
        self.apply_ghosts();
        Ok(())
    }

    pub fn collapse(&mut self, index: usize) {
        self.tree.collapse(index);
    }

    pub fn toggle_expand(&mut self, index: usize) -> Result<(), SessionError> {
        self.tree.toggle_expand(index)?;
        self.apply_ghosts();
        Ok(())
    }

    /// Ghosts are re-applied even when some directory failed to load
    pub fn expand_all(&mut self) -> Result<(), SessionError> {
        let result = self.tree.expand_all();
        self.apply_ghosts();
        result.map_err(SessionError::from)
    }

    pub fn collapse_all(&mut self) {
        self.tree.collapse_all();
    }

    /// Status of the visible node at `index`
    pub fn status_of(&self, index: usize) -> VcsStatus {
        self.tree
            .get(index)
            .map(|node| self.status_for(node))
            .unwrap_or_default()
    }

    fn status_for(&self, node: &FileNode) -> VcsStatus {
        if node.is_ghost {
            return VcsStatus::Deleted;
        }
        self.repo.status(&node.path)
    }

    /// Change markers for a file shown in the tree
    pub fn file_diff(&self, path: &Path) -> Vec<DiffMarker> {
        self.repo.file_diff(path)
    }

    /// Snapshot of every visible row with its status
    pub fn flat_entries(&self) -> Vec<FlatEntry> {
        self.tree
            .iter()
            .map(|node| FlatEntry {
                path: node.path.clone(),
                name: node.name.clone(),
                depth: node.depth,
                is_dir: node.is_dir,
                expanded: node.expanded,
                is_ghost: node.is_ghost,
                status: self.status_for(node),
            })
            .collect()
    }

    fn apply_ghosts(&mut self) {
        let deleted = self.repo.deleted_files();
        if deleted.is_empty() {
            return;
        }
        self.tree.add_ghost_nodes(deleted);
    }
}

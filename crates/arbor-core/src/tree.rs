//! Lazily loaded directory tree with a flattened, index-addressable view

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file system entry in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub expanded: bool,
    pub depth: usize,
    /// Empty until the directory is first expanded
    pub children: Vec<FileNode>,
    /// Deleted in the VCS and absent from disk
    pub is_ghost: bool,
}

impl FileNode {
    /// Stat `path` and build an unexpanded node for it
    pub fn from_path(path: PathBuf, depth: usize) -> io::Result<Self> {
        let metadata = fs::metadata(&path)?;
        Ok(Self {
            name: display_name(&path),
            is_dir: metadata.is_dir(),
            expanded: false,
            depth,
            children: Vec::new(),
            is_ghost: false,
            path,
        })
    }

    /// A placeholder for a file the VCS reports as deleted
    pub fn ghost(path: PathBuf, depth: usize) -> Self {
        Self {
            name: display_name(&path),
            is_dir: false,
            expanded: false,
            depth,
            children: Vec::new(),
            is_ghost: true,
            path,
        }
    }

    /// Read this directory and replace the children with its entries.
    ///
    /// Entries that vanish or fail to stat while listing are skipped.
    pub fn load_children(&mut self, show_hidden: bool) -> io::Result<()> {
        if !self.is_dir {
            return Ok(());
        }

        let mut children = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(dir = %self.path.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !show_hidden && entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            match FileNode::from_path(entry.path(), self.depth + 1) {
                Ok(child) => children.push(child),
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "skipping entry that failed to stat");
                }
            }
        }

        children.sort_by(compare_nodes);
        self.children = children;
        Ok(())
    }

    fn find_mut(&mut self, path: &Path) -> Option<&mut FileNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(path))
    }

    fn find(&self, path: &Path) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    fn expand_recursive(&mut self, show_hidden: bool) -> io::Result<()> {
        if !self.is_dir {
            return Ok(());
        }
        if self.children.is_empty() {
            self.load_children(show_hidden)?;
        }
        self.expanded = true;
        for child in &mut self.children {
            // Symlinked directories stay collapsed; following them can cycle.
            if child.is_dir && is_symlink(&child.path) {
                continue;
            }
            child.expand_recursive(show_hidden)?;
        }
        Ok(())
    }

    fn collapse_recursive(&mut self) {
        self.expanded = false;
        for child in &mut self.children {
            child.collapse_recursive();
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Directories first, then case-sensitive by name
fn compare_nodes(a: &FileNode, b: &FileNode) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name))
}

/// Child-index address of a node, starting below the root
type NodeAddr = Vec<usize>;

/// The whole tree plus its visible, flattened pre-order view
#[derive(Debug, Clone)]
pub struct FileTree {
    root: FileNode,
    flat: Vec<NodeAddr>,
    show_hidden: bool,
}

impl FileTree {
    /// Build a tree rooted at `path` with its first level loaded
    pub fn build(path: impl AsRef<Path>, show_hidden: bool) -> Result<Self, TreeError> {
        let root = load_root(path.as_ref(), show_hidden)?;
        let mut tree = Self {
            root,
            flat: Vec::new(),
            show_hidden,
        };
        tree.rebuild_flat_list();
        Ok(tree)
    }

    pub fn root(&self) -> &FileNode {
        &self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Number of visible nodes
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Visible node at a flat-list index
    pub fn get(&self, index: usize) -> Option<&FileNode> {
        let addr = self.flat.get(index)?;
        self.node_at(addr)
    }

    /// Visible nodes in display order
    pub fn iter(&self) -> impl Iterator<Item = &FileNode> + '_ {
        self.flat.iter().filter_map(|addr| self.node_at(addr))
    }

    /// Flat-list index of the visible node with this path
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.iter().position(|node| node.path == path)
    }

    /// Any loaded node with this path, visible or not
    pub fn find(&self, path: &Path) -> Option<&FileNode> {
        self.root.find(path)
    }

    fn node_at(&self, addr: &[usize]) -> Option<&FileNode> {
        let mut node = &self.root;
        for &i in addr {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, addr: &[usize]) -> Option<&mut FileNode> {
        let mut node = &mut self.root;
        for &i in addr {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut FileNode> {
        let addr = self.flat.get(index)?.clone();
        self.node_at_mut(&addr)
    }

    /// Recompute the visible list from scratch
    pub fn rebuild_flat_list(&mut self) {
        let mut flat = Vec::new();
        let mut addr = Vec::new();
        flatten(&self.root, &mut addr, &mut flat);
        self.flat = flat;
    }

    /// Expand the directory at `index`, loading it on first use
    pub fn expand(&mut self, index: usize) -> Result<(), TreeError> {
        let show_hidden = self.show_hidden;
        let Some(node) = self.node_mut(index) else {
            return Ok(());
        };
        if !node.is_dir || node.expanded {
            return Ok(());
        }
        if node.children.is_empty() {
            node.load_children(show_hidden).map_err(|source| TreeError::Io {
                path: node.path.clone(),
                source,
            })?;
        }
        node.expanded = true;
        self.rebuild_flat_list();
        Ok(())
    }

    /// Collapse the directory at `index`
    pub fn collapse(&mut self, index: usize) {
        let Some(node) = self.node_mut(index) else {
            return;
        };
        if !node.is_dir || !node.expanded {
            return;
        }
        node.expanded = false;
        self.rebuild_flat_list();
    }

    pub fn toggle_expand(&mut self, index: usize) -> Result<(), TreeError> {
        match self.get(index) {
            Some(node) if node.is_dir && node.expanded => {
                self.collapse(index);
                Ok(())
            }
            Some(node) if node.is_dir => self.expand(index),
            _ => Ok(()),
        }
    }

    /// Expand every directory, loading children as needed
    pub fn expand_all(&mut self) -> Result<(), TreeError> {
        let show_hidden = self.show_hidden;
        let result = self.root.expand_recursive(show_hidden);
        self.rebuild_flat_list();
        result.map_err(|source| TreeError::Io {
            path: self.root.path.clone(),
            source,
        })
    }

    /// Collapse every directory except the root
    pub fn collapse_all(&mut self) {
        self.root.collapse_recursive();
        self.root.expanded = true;
        self.rebuild_flat_list();
    }

    /// Flat index of the visible parent directory of the node at `index`
    pub fn find_parent_index(&self, index: usize) -> Option<usize> {
        let parent = self.get(index)?.path.parent()?;
        self.index_of(parent)
    }

    /// Rebuild everything from disk; only the root stays expanded
    pub fn refresh(&mut self) -> Result<(), TreeError> {
        self.root = load_root(&self.root.path, self.show_hidden)?;
        self.rebuild_flat_list();
        Ok(())
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) -> Result<(), TreeError> {
        self.show_hidden = show_hidden;
        self.refresh()
    }

    /// Insert ghost entries for deleted paths under visible, expanded parents.
    ///
    /// Paths whose parent is missing or collapsed are skipped; paths that
    /// already have a sibling of the same name are left alone.
    pub fn add_ghost_nodes(&mut self, deleted: &[PathBuf]) {
        if deleted.is_empty() {
            return;
        }
        let mut inserted = false;
        for path in deleted {
            inserted |= self.add_ghost_node(path);
        }
        if inserted {
            self.rebuild_flat_list();
        }
    }

    fn add_ghost_node(&mut self, path: &Path) -> bool {
        let Some(parent_path) = path.parent() else {
            return false;
        };
        let Some(parent) = self.root.find_mut(parent_path) else {
            return false;
        };
        if !parent.is_dir || !parent.expanded {
            return false;
        }

        let ghost = FileNode::ghost(path.to_path_buf(), parent.depth + 1);
        if parent.children.iter().any(|child| child.name == ghost.name) {
            return false;
        }

        let pos = parent
            .children
            .partition_point(|child| compare_nodes(child, &ghost) == Ordering::Less);
        parent.children.insert(pos, ghost);
        true
    }
}

fn load_root(path: &Path, show_hidden: bool) -> Result<FileNode, TreeError> {
    let absolute = absolute_path(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !absolute.exists() {
        return Err(TreeError::NotFound(absolute));
    }
    // Resolve symlinks so node paths line up with VCS-reported paths.
    let resolved = absolute.canonicalize().unwrap_or(absolute);

    let mut root = FileNode::from_path(resolved.clone(), 0).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TreeError::NotFound(resolved.clone()),
        _ => TreeError::Io {
            path: resolved.clone(),
            source,
        },
    })?;
    root.expanded = true;
    root.load_children(show_hidden)
        .map_err(|source| TreeError::Io {
            path: resolved,
            source,
        })?;
    Ok(root)
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn flatten(node: &FileNode, addr: &mut NodeAddr, out: &mut Vec<NodeAddr>) {
    out.push(addr.clone());
    if node.expanded {
        for (i, child) in node.children.iter().enumerate() {
            addr.push(i);
            flatten(child, addr, out);
            addr.pop();
        }
    }
}

//! arbor-core: file tree model with version control awareness
//!
//! This crate provides:
//! - A lazily loaded directory tree with a flat, index-addressable view
//! - Git and jj status backends behind one trait
//! - Directory status propagation and path normalization
//! - Classification of zero-context diffs into per-line change markers
//! - A session that keeps the tree and VCS snapshot reconciled

pub mod diff;
pub mod preview;
pub mod session;
pub mod status;
pub mod tree;
pub mod vcs;

pub use diff::{clamp_markers, classify, DiffKind, DiffMarker};
pub use preview::{Preview, PreviewError};
pub use session::{FlatEntry, Session, SessionError};
pub use status::{normalize_path, StatusIndex, VcsStatus};
pub use tree::{FileNode, FileTree, TreeError};
pub use vcs::{open_repo, GitRepo, JjRepo, VcsKind, VcsRepo};

//! Read-only file preview with change markers

use crate::diff::{clamp_markers, DiffKind, DiffMarker};
use crate::vcs::VcsRepo;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest prefix of a file read for preview
pub const MAX_PREVIEW_BYTES: usize = 512 * 1024;
/// Largest prefix of a binary file shown as hex
pub const MAX_HEX_BYTES: usize = 1600;
const BINARY_SNIFF_BYTES: usize = 512;
const HEX_ROW: usize = 16;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Cannot preview a directory: {}", .0.display())]
    IsDirectory(PathBuf),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    path: PathBuf,
    lines: Vec<String>,
    is_binary: bool,
    truncated: bool,
    markers: Vec<DiffMarker>,
}

impl Preview {
    /// Load `path` for display. Text files get change markers from `repo`.
    pub fn load(path: &Path, repo: Option<&dyn VcsRepo>) -> Result<Self, PreviewError> {
        let io_err = |source: io::Error| match source.kind() {
            io::ErrorKind::NotFound => PreviewError::NotFound(path.to_path_buf()),
            _ => PreviewError::Io {
                path: path.to_path_buf(),
                source,
            },
        };

        let meta = std::fs::metadata(path).map_err(io_err)?;
        if meta.is_dir() {
            return Err(PreviewError::IsDirectory(path.to_path_buf()));
        }

        let mut bytes = Vec::new();
        File::open(path)
            .map_err(io_err)?
            .take(MAX_PREVIEW_BYTES as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(io_err)?;
        let truncated = bytes.len() > MAX_PREVIEW_BYTES;
        bytes.truncate(MAX_PREVIEW_BYTES);

        let preview = Self::from_bytes(path.to_path_buf(), &bytes, truncated);
        match repo {
            Some(repo) if !preview.is_binary => {
                let markers = repo.file_diff(path);
                Ok(preview.with_markers(&markers))
            }
            _ => Ok(preview),
        }
    }

    /// Build a preview from content already in memory
    pub fn from_bytes(path: PathBuf, bytes: &[u8], truncated: bool) -> Self {
        let is_binary = is_binary(bytes);
        let lines = if is_binary {
            hex_dump(bytes)
        } else {
            String::from_utf8_lossy(bytes)
                .lines()
                .map(|line| line.to_string())
                .collect()
        };
        Self {
            path,
            lines,
            is_binary,
            truncated,
            markers: Vec::new(),
        }
    }

    /// Attach markers, pinning any past the end onto the last line
    pub fn with_markers(mut self, markers: &[DiffMarker]) -> Self {
        self.markers = clamp_markers(markers, self.lines.len());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// More than [`MAX_PREVIEW_BYTES`] were on disk
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn markers(&self) -> &[DiffMarker] {
        &self.markers
    }

    /// Marker on a 1-based line
    pub fn marker_at(&self, line: usize) -> Option<DiffKind> {
        self.markers
            .binary_search_by_key(&line, |m| m.line)
            .ok()
            .map(|i| self.markers[i].kind)
    }

    /// First changed line after `from`
    pub fn next_change(&self, from: usize) -> Option<usize> {
        self.markers.iter().map(|m| m.line).find(|&line| line > from)
    }

    /// Last changed line before `from`
    pub fn prev_change(&self, from: usize) -> Option<usize> {
        self.markers
            .iter()
            .rev()
            .map(|m| m.line)
            .find(|&line| line < from)
    }
}

/// NUL anywhere in the first 512 bytes, or more than 30% control bytes
pub fn is_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    if head.is_empty() {
        return false;
    }
    if head.contains(&0) {
        return true;
    }
    let control = head
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t'))
        .count();
    control * 10 > head.len() * 3
}

/// `offset  hex bytes  ascii` rows over the first [`MAX_HEX_BYTES`]
pub fn hex_dump(bytes: &[u8]) -> Vec<String> {
    let shown = &bytes[..bytes.len().min(MAX_HEX_BYTES)];
    let mut rows: Vec<String> = shown
        .chunks(HEX_ROW)
        .enumerate()
        .map(|(i, chunk)| {
            let mut hex = String::with_capacity(HEX_ROW * 3);
            for (j, b) in chunk.iter().enumerate() {
                if j > 0 {
                    hex.push(' ');
                }
                let _ = write!(hex, "{b:02x}");
            }
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if (0x20..0x7f).contains(&b) {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:08x}  {:<47}  {}", i * HEX_ROW, hex, ascii)
        })
        .collect();
    if bytes.len() > MAX_HEX_BYTES {
        rows.push("... (truncated)".to_string());
    }
    rows
}

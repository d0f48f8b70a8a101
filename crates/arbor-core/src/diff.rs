//! Classify zero-context unified diffs into per-line change markers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Kind of change shown next to a line of the working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Modified,
    Deleted,
}

/// A change marker for one line of the current file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMarker {
    pub line: usize,
    pub kind: DiffKind,
}

impl DiffMarker {
    pub fn new(line: usize, kind: DiffKind) -> Self {
        Self { line, kind }
    }
}

fn hunk_regex() -> &'static Regex {
    static HUNK: OnceLock<Regex> = OnceLock::new();
    HUNK.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk regex is valid")
    })
}

/// Line ranges announced by a `@@ -a,b +c,d @@` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_count: usize,
    new_start: usize,
    new_count: usize,
}

fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let caps = hunk_regex().captures(line)?;
    let count = |group: usize| -> Option<usize> {
        match caps.get(group) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(1),
        }
    };
    Some(HunkHeader {
        old_count: count(2)?,
        new_start: caps.get(3)?.as_str().parse().ok()?,
        new_count: count(4)?,
    })
}

struct Classifier {
    markers: Vec<DiffMarker>,
    current_new_line: usize,
    pending_deletions: usize,
    hunk_has_additions: bool,
    // Body lines still owed by the current hunk header
    old_remaining: usize,
    new_remaining: usize,
}

impl Classifier {
    fn new() -> Self {
        Self {
            markers: Vec::new(),
            current_new_line: 0,
            pending_deletions: 0,
            hunk_has_additions: false,
            old_remaining: 0,
            new_remaining: 0,
        }
    }

    /// Markers stay strictly ascending and positive; anything else is dropped.
    fn push(&mut self, kind: DiffKind) {
        let line = self.current_new_line;
        if line == 0 {
            return;
        }
        if let Some(last) = self.markers.last() {
            if last.line >= line {
                return;
            }
        }
        self.markers.push(DiffMarker::new(line, kind));
    }

    /// Emit the single gap marker for a hunk that only removed lines
    fn flush_pure_deletion(&mut self) {
        if self.pending_deletions > 0 && !self.hunk_has_additions {
            self.push(DiffKind::Deleted);
        }
    }

    fn start_hunk(&mut self, header: HunkHeader) {
        self.flush_pure_deletion();
        // An empty new range names the line before the gap.
        self.current_new_line = if header.new_count == 0 {
            header.new_start + 1
        } else {
            header.new_start
        };
        self.pending_deletions = 0;
        self.hunk_has_additions = false;
        self.old_remaining = header.old_count;
        self.new_remaining = header.new_count;
    }

    fn end_hunk(&mut self) {
        self.flush_pure_deletion();
        self.pending_deletions = 0;
        self.old_remaining = 0;
        self.new_remaining = 0;
    }

    fn line(&mut self, line: &str) {
        // Once the header's counts are used up, `---`/`+++` lines belong to
        // the next file header rather than to the hunk body.
        let in_hunk = self.old_remaining > 0 || self.new_remaining > 0;
        if !in_hunk || line.starts_with("@@") {
            if line.starts_with("@@") {
                match parse_hunk_header(line) {
                    Some(header) => self.start_hunk(header),
                    None => self.end_hunk(),
                }
            }
            return;
        }

        match line.as_bytes().first() {
            Some(b'+') if self.new_remaining > 0 => {
                self.new_remaining -= 1;
                self.hunk_has_additions = true;
                if self.pending_deletions > 0 {
                    self.push(DiffKind::Modified);
                    self.pending_deletions -= 1;
                } else {
                    self.push(DiffKind::Added);
                }
                self.current_new_line += 1;
            }
            Some(b'-') if self.old_remaining > 0 => {
                self.old_remaining -= 1;
                self.pending_deletions += 1;
            }
            Some(b' ') => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                // Context only shows up when the diff was not requested with -U0.
                self.flush_pure_deletion();
                self.pending_deletions = 0;
                self.hunk_has_additions = false;
                self.current_new_line += 1;
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<DiffMarker> {
        self.flush_pure_deletion();
        self.markers
    }
}

/// Classify a zero-context unified diff into ascending line markers.
///
/// Never fails: text outside recognizable hunks yields no markers.
pub fn classify(diff: &str) -> Vec<DiffMarker> {
    let mut classifier = Classifier::new();
    for line in diff.lines() {
        classifier.line(line);
    }
    classifier.finish()
}

/// Pin markers that point past the end of the displayed content to its last
/// line. When several markers land on the same line the later one wins.
pub fn clamp_markers(markers: &[DiffMarker], line_count: usize) -> Vec<DiffMarker> {
    if line_count == 0 {
        return markers.to_vec();
    }

    let mut out: Vec<DiffMarker> = Vec::with_capacity(markers.len());
    for marker in markers {
        let clamped = DiffMarker::new(marker.line.min(line_count), marker.kind);
        match out.last_mut() {
            Some(last) if last.line == clamped.line => *last = clamped,
            _ => out.push(clamped),
        }
    }
    out
}

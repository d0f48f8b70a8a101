//! Application state and key handling

use crate::theme::Style;
use arbor_core::{FileNode, Preview, Session};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use tracing::warn;

/// What the main pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tree,
    Preview,
}

/// An open preview and its scroll position (0-based top line)
pub struct PreviewState {
    pub preview: Preview,
    pub scroll: usize,
}

pub struct App {
    pub session: Session,
    pub style: Style,
    pub mode: Mode,
    /// Flat-list index of the cursor
    pub selected: usize,
    /// First visible row of the tree pane
    pub offset: usize,
    /// Rows available to the main pane, updated on every draw
    pub viewport_height: usize,
    pub message: Option<String>,
    pub preview: Option<PreviewState>,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, style: Style) -> Self {
        Self {
            session,
            style,
            mode: Mode::Tree,
            selected: 0,
            offset: 0,
            viewport_height: 20,
            message: None,
            preview: None,
            should_quit: false,
        }
    }

    pub fn selected_node(&self) -> Option<&FileNode> {
        self.session.tree().get(self.selected)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            Mode::Tree => self.handle_tree_key(key.code),
            Mode::Preview => self.handle_preview_key(key.code),
        }
    }

    fn handle_tree_key(&mut self, code: KeyCode) {
        self.message = None;
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_down(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_up(1),
            KeyCode::Home | KeyCode::Char('g') => self.select(0),
            KeyCode::End | KeyCode::Char('G') => {
                self.select(self.session.tree().len().saturating_sub(1))
            }
            KeyCode::Right | KeyCode::Enter | KeyCode::Char('l') => self.expand_or_preview(),
            KeyCode::Left | KeyCode::Char('h') => self.collapse_or_parent(),
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('E') => self.expand_all(),
            KeyCode::Char('C') => self.collapse_all(),
            KeyCode::Char('.') => self.toggle_hidden(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('o') => self.open_preview(),
            _ => {}
        }
    }

    fn handle_preview_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.close_preview(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_preview(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_preview(-1),
            KeyCode::PageDown | KeyCode::Char('f') => {
                self.scroll_preview(self.page_size() as isize)
            }
            KeyCode::PageUp | KeyCode::Char('b') => {
                self.scroll_preview(-(self.page_size() as isize))
            }
            KeyCode::Home | KeyCode::Char('g') => self.scroll_preview_to(0),
            KeyCode::End | KeyCode::Char('G') => self.scroll_preview_to(usize::MAX),
            KeyCode::Char('n') => self.next_change(),
            KeyCode::Char('N') => self.prev_change(),
            _ => {}
        }
    }

    fn page_size(&self) -> usize {
        self.viewport_height.max(1)
    }

    // Tree navigation

    pub fn select(&mut self, index: usize) {
        let len = self.session.tree().len();
        self.selected = index.min(len.saturating_sub(1));
        self.ensure_visible();
    }

    pub fn move_down(&mut self, n: usize) {
        self.select(self.selected.saturating_add(n));
    }

    pub fn move_up(&mut self, n: usize) {
        self.select(self.selected.saturating_sub(n));
    }

    /// Keep the cursor inside the tree viewport
    pub fn ensure_visible(&mut self) {
        let height = self.page_size();
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + height {
            self.offset = self.selected + 1 - height;
        }
        let max_offset = self.session.tree().len().saturating_sub(height);
        self.offset = self.offset.min(max_offset);
    }

    fn selected_path(&self) -> Option<PathBuf> {
        self.selected_node().map(|node| node.path.clone())
    }

    /// Put the cursor back on `path` after the flat list changed, or on the
    /// nearest surviving row
    fn restore_selection(&mut self, path: Option<PathBuf>) {
        let index = path
            .and_then(|p| self.session.tree().index_of(&p))
            .unwrap_or(self.selected);
        self.select(index);
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        if let Err(err) = result {
            warn!(error = %err, "tree operation failed");
            self.message = Some(format!("Error: {err}"));
        }
    }

    pub fn expand_or_preview(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        match (node.is_dir, node.expanded) {
            (true, false) => {
                let result = self.session.expand(self.selected);
                self.report(result);
            }
            (true, true) => {
                let has_children = self
                    .session
                    .tree()
                    .get(self.selected + 1)
                    .is_some_and(|next| next.depth > node.depth);
                if has_children {
                    self.move_down(1);
                }
            }
            (false, _) => self.open_preview(),
        }
    }

    pub fn collapse_or_parent(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        if node.is_dir && node.expanded && self.selected != 0 {
            self.session.collapse(self.selected);
            self.ensure_visible();
        } else if let Some(parent) = self.session.tree().find_parent_index(self.selected) {
            self.select(parent);
        }
    }

    pub fn toggle_selected(&mut self) {
        if self.selected == 0 {
            return;
        }
        let result = self.session.toggle_expand(self.selected);
        self.report(result);
        self.ensure_visible();
    }

    pub fn expand_all(&mut self) {
        let path = self.selected_path();
        let result = self.session.expand_all();
        self.report(result);
        self.restore_selection(path);
    }

    pub fn collapse_all(&mut self) {
        let path = self.selected_path();
        self.session.collapse_all();
        self.restore_selection(path);
    }

    pub fn toggle_hidden(&mut self) {
        let path = self.selected_path();
        let show = !self.session.tree().show_hidden();
        let result = self.session.set_show_hidden(show);
        self.report(result);
        self.restore_selection(path);
        if self.message.is_none() {
            self.message = Some(if show {
                "Showing hidden files".to_string()
            } else {
                "Hiding hidden files".to_string()
            });
        }
    }

    pub fn reload(&mut self) {
        let path = self.selected_path();
        let result = self.session.reload();
        self.report(result);
        self.restore_selection(path);
        if self.message.is_none() {
            self.message = Some("Reloaded".to_string());
        }
    }

    // Preview

    pub fn open_preview(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        if node.is_dir {
            return;
        }
        if node.is_ghost {
            self.message = Some(format!("{} was deleted", node.name));
            return;
        }

        let path = node.path.clone();
        match Preview::load(&path, Some(self.session.repo())) {
            Ok(preview) => {
                if preview.truncated() {
                    self.message = Some("Preview truncated (file > 512KB)".to_string());
                }
                self.preview = Some(PreviewState { preview, scroll: 0 });
                self.mode = Mode::Preview;
            }
            Err(err) => {
                warn!(error = %err, "preview failed");
                self.message = Some(format!("Error: {err}"));
            }
        }
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
        self.mode = Mode::Tree;
    }

    fn max_preview_scroll(&self) -> usize {
        self.preview
            .as_ref()
            .map(|state| state.preview.line_count().saturating_sub(self.page_size()))
            .unwrap_or(0)
    }

    pub fn scroll_preview_to(&mut self, line: usize) {
        let max = self.max_preview_scroll();
        if let Some(state) = self.preview.as_mut() {
            state.scroll = line.min(max);
        }
    }

    pub fn scroll_preview(&mut self, delta: isize) {
        let Some(current) = self.preview.as_ref().map(|s| s.scroll) else {
            return;
        };
        self.scroll_preview_to(current.saturating_add_signed(delta));
    }

    /// Jump so the next changed line below the top of the view is at the top
    pub fn next_change(&mut self) {
        let Some(state) = self.preview.as_ref() else {
            return;
        };
        match state.preview.next_change(state.scroll + 1) {
            Some(line) => self.scroll_preview_to(line - 1),
            None => self.message = Some("No more changes".to_string()),
        }
    }

    pub fn prev_change(&mut self) {
        let Some(state) = self.preview.as_ref() else {
            return;
        };
        match state.preview.prev_change(state.scroll + 1) {
            Some(line) => self.scroll_preview_to(line - 1),
            None => self.message = Some("No previous changes".to_string()),
        }
    }

    /// Left part of the status bar
    pub fn status_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if self.session.tree().show_hidden() {
            parts.push("[hidden]".to_string());
        }
        let info = self.session.repo().display_info();
        if !info.is_empty() {
            parts.push(info);
        }
        parts.join(" | ")
    }

    /// Right part of the status bar
    pub fn position_text(&self) -> String {
        match (&self.mode, &self.preview) {
            (Mode::Preview, Some(state)) => format!(
                "{}/{}",
                (state.scroll + 1).min(state.preview.line_count().max(1)),
                state.preview.line_count()
            ),
            _ => format!("{}/{}", self.selected + 1, self.session.tree().len()),
        }
    }
}

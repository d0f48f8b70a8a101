//! UI rendering for the TUI

use crate::app::{App, Mode, PreviewState};
use arbor_core::{DiffKind, FileNode, VcsStatus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Main drawing function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let constraints = if app.style.status_bar {
        vec![Constraint::Min(0), Constraint::Length(1)]
    } else {
        vec![Constraint::Min(0)]
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    match app.mode {
        Mode::Tree => draw_tree(frame, app, chunks[0]),
        Mode::Preview => draw_preview(frame, app, chunks[0]),
    }

    if let Some(&area) = chunks.get(1) {
        draw_status_bar(frame, app, area);
    }
}

fn draw_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    app.viewport_height = area.height as usize;
    app.ensure_visible();

    let theme = &app.style.theme;
    let tree = app.session.tree();
    let lines: Vec<Line> = tree
        .iter()
        .enumerate()
        .skip(app.offset)
        .take(area.height as usize)
        .map(|(index, node)| {
            let status = app.session.status_of(index);
            let mut line = tree_row(app, node, status);
            if index == app.selected {
                line = line.style(Style::default().bg(theme.selection));
            }
            line
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn tree_row<'a>(app: &App, node: &'a FileNode, status: VcsStatus) -> Line<'a> {
    let theme = &app.style.theme;
    let icons = &app.style.icons;

    let indent = "  ".repeat(node.depth);
    let icon = if node.is_ghost {
        icons.ghost
    } else if node.is_dir {
        icons.directory(node.expanded)
    } else {
        icons.file_icon(&node.name)
    };

    let mut name_style = Style::default().fg(theme.text);
    if node.is_dir {
        name_style = name_style.fg(theme.directory).add_modifier(Modifier::BOLD);
    }
    if let Some(color) = theme.status_color(status) {
        name_style = name_style.fg(color);
    }
    if node.is_ghost {
        name_style = name_style
            .fg(theme.ghost)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    if status == VcsStatus::Ignored {
        name_style = name_style.add_modifier(Modifier::DIM);
    }

    let mut spans = vec![
        Span::raw(indent),
        Span::styled(icon, name_style.remove_modifier(Modifier::CROSSED_OUT)),
        Span::raw(" "),
        Span::styled(node.name.as_str(), name_style),
    ];
    if status != VcsStatus::None {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            status.letter().to_string(),
            Style::default().fg(theme.status_color(status).unwrap_or(theme.text)),
        ));
    }
    Line::from(spans)
}

fn marker_glyph(kind: DiffKind) -> &'static str {
    match kind {
        DiffKind::Added => "+",
        DiffKind::Modified => "~",
        DiffKind::Deleted => "_",
    }
}

fn draw_preview(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    app.viewport_height = chunks[1].height as usize;

    let Some(PreviewState { preview, scroll }) = app.preview.as_ref() else {
        return;
    };
    let theme = &app.style.theme;

    let name = preview
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = if preview.is_binary() {
        format!(" {name} (binary) ")
    } else {
        format!(" {name} ")
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ))),
        chunks[0],
    );

    let number_width = preview.line_count().max(1).to_string().len().max(4);
    let lines: Vec<Line> = preview
        .lines()
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(chunks[1].height as usize)
        .map(|(i, text)| {
            let line_no = i + 1;
            let gutter = match preview.marker_at(line_no) {
                Some(kind) => Span::styled(
                    marker_glyph(kind),
                    Style::default().fg(theme.marker_color(kind)),
                ),
                None => Span::raw(" "),
            };
            Line::from(vec![
                Span::styled(
                    format!("{line_no:>number_width$} "),
                    Style::default().fg(theme.line_number),
                ),
                gutter,
                Span::raw(" "),
                Span::raw(text.as_str()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), chunks[1]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left = format!(" {}", app.status_text());
    let right = format!("{} ", app.position_text());
    let width = area.width as usize;
    let used = left.width() + right.width();
    let padding = " ".repeat(width.saturating_sub(used));

    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(padding),
        Span::raw(right),
    ])
    .style(Style::default().bg(app.style.theme.status_bar));
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{Style as ArborStyle, ASCII_ICONS};
    use arbor_core::{FileTree, GitRepo, Session, VcsKind};
    use crossterm::event::{KeyCode, KeyEvent};
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use std::fs;
    use tempfile::TempDir;

    fn make_app(dir: &TempDir) -> App {
        let tree = FileTree::build(dir.path(), false).unwrap();
        let session = Session::from_parts(tree, Box::new(GitRepo::default()), VcsKind::Git);
        let style = ArborStyle {
            icons: ASCII_ICONS,
            ..ArborStyle::default()
        };
        App::new(session, style)
    }

    fn render_buffer(app: &mut App, width: u16, height: u16) -> Buffer {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw");
        terminal.backend().buffer().clone()
    }

    fn buffer_text(buf: &Buffer) -> Vec<String> {
        let mut lines = Vec::new();
        for y in 0..buf.area.height {
            let mut line = String::new();
            for x in 0..buf.area.width {
                line.push_str(buf[(x, y)].symbol());
            }
            lines.push(line);
        }
        lines
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "one\ntwo\nthree\n").unwrap();
        dir
    }

    #[test]
    fn test_tree_render_with_indentation() {
        let dir = fixture();
        let mut app = make_app(&dir);
        app.handle_key(KeyEvent::from(KeyCode::Char('j')));
        app.handle_key(KeyEvent::from(KeyCode::Char('l')));

        let text = buffer_text(&render_buffer(&mut app, 40, 6));
        assert!(text[1].starts_with("  - src"));
        assert!(text[2].starts_with("      main.rs"));
        assert!(text[3].starts_with("    notes.txt"));
        assert!(text[5].trim_end().ends_with("2/4"));
    }

    #[test]
    fn test_selected_row_highlighted() {
        let dir = fixture();
        let mut app = make_app(&dir);
        app.handle_key(KeyEvent::from(KeyCode::Char('j')));
        let buf = render_buffer(&mut app, 30, 5);
        assert_eq!(buf[(0, 1)].bg, app.style.theme.selection);
        assert_ne!(buf[(0, 2)].bg, app.style.theme.selection);
    }

    #[test]
    fn test_preview_render_has_line_numbers() {
        let dir = fixture();
        let mut app = make_app(&dir);
        app.handle_key(KeyEvent::from(KeyCode::Char('G')));
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        let text = buffer_text(&render_buffer(&mut app, 30, 6));
        assert!(text[0].contains("notes.txt"));
        assert!(text[1].starts_with("   1   one"));
        assert!(text[3].starts_with("   3   three"));
        assert!(text[5].trim_end().ends_with("1/3"));
    }

    #[test]
    fn test_status_bar_can_be_hidden() {
        let dir = fixture();
        let mut app = make_app(&dir);
        app.style.status_bar = false;
        let text = buffer_text(&render_buffer(&mut app, 30, 4));
        assert!(text.iter().all(|line| !line.contains("1/3")));
        assert_eq!(app.viewport_height, 4);
    }
}

//! Colors, icons and the combined `Style` passed to rendering

use crate::config::IconMode;
use arbor_core::{DiffKind, VcsStatus};
use ratatui::style::Color;
use std::collections::HashMap;

/// Parse a `#rrggbb` string
pub fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 {
        return Err(format!(
            "invalid hex color: expected 6 characters, got {}",
            s.len()
        ));
    }

    let component = |range: std::ops::Range<usize>, name: &str| {
        s.get(range)
            .and_then(|part| u8::from_str_radix(part, 16).ok())
            .ok_or_else(|| format!("invalid hex color: bad {name} component in '{s}'"))
    };
    Ok(Color::Rgb(
        component(0..2, "red")?,
        component(2..4, "green")?,
        component(4..6, "blue")?,
    ))
}

pub fn parse_ansi_name(name: &str) -> Option<Color> {
    match name.to_lowercase().replace('-', "_").as_str() {
        "default" | "reset" => Some(Color::Reset),
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "light_red" | "lightred" => Some(Color::LightRed),
        "light_green" | "lightgreen" => Some(Color::LightGreen),
        "light_yellow" | "lightyellow" => Some(Color::LightYellow),
        "light_blue" | "lightblue" => Some(Color::LightBlue),
        "light_magenta" | "lightmagenta" => Some(Color::LightMagenta),
        "light_cyan" | "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

/// Resolve a def reference, hex value or ANSI name
pub fn resolve_color(value: &str, defs: &HashMap<String, String>) -> Option<Color> {
    let value = value.trim();

    if let Some(hex) = defs.get(value) {
        return parse_hex(hex).ok();
    }

    if value.starts_with('#') {
        return parse_hex(value).ok();
    }

    parse_ansi_name(value)
}

pub fn resolve_color_or(value: &str, defs: &HashMap<String, String>, fallback: Color) -> Color {
    resolve_color(value, defs).unwrap_or(fallback)
}

/// Resolved theme, all ratatui Colors ready to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub directory: Color,

    // VCS status
    pub modified: Color,
    pub added: Color,
    pub deleted: Color,
    pub renamed: Color,
    pub untracked: Color,
    pub ignored: Color,
    pub conflict: Color,
    pub ghost: Color,

    // Chrome
    pub selection: Color,
    pub status_bar: Color,
    pub line_number: Color,

    // Preview gutter
    pub marker_added: Color,
    pub marker_modified: Color,
    pub marker_deleted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Color::Reset,
            directory: Color::Blue,
            modified: Color::Yellow,
            added: Color::Green,
            deleted: Color::Red,
            renamed: Color::Cyan,
            untracked: Color::LightGreen,
            ignored: Color::DarkGray,
            conflict: Color::LightRed,
            ghost: Color::Red,
            selection: Color::Indexed(238),
            status_bar: Color::Indexed(236),
            line_number: Color::DarkGray,
            marker_added: Color::Green,
            marker_modified: Color::Yellow,
            marker_deleted: Color::Red,
        }
    }
}

impl Theme {
    /// Foreground for a status; `None` when the entry keeps its plain color
    pub fn status_color(&self, status: VcsStatus) -> Option<Color> {
        match status {
            VcsStatus::None => None,
            VcsStatus::Modified => Some(self.modified),
            VcsStatus::Added => Some(self.added),
            VcsStatus::Deleted => Some(self.deleted),
            VcsStatus::Renamed => Some(self.renamed),
            VcsStatus::Untracked => Some(self.untracked),
            VcsStatus::Ignored => Some(self.ignored),
            VcsStatus::Conflict => Some(self.conflict),
        }
    }

    pub fn marker_color(&self, kind: DiffKind) -> Color {
        match kind {
            DiffKind::Added => self.marker_added,
            DiffKind::Modified => self.marker_modified,
            DiffKind::Deleted => self.marker_deleted,
        }
    }
}

/// Glyphs for tree entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Icons {
    pub folder_closed: &'static str,
    pub folder_open: &'static str,
    pub file: &'static str,
    pub file_text: &'static str,
    pub ghost: &'static str,
    pub rust: &'static str,
    pub go: &'static str,
    pub python: &'static str,
    pub javascript: &'static str,
    pub typescript: &'static str,
    pub markdown: &'static str,
    pub config: &'static str,
    pub lock: &'static str,
    pub image: &'static str,
    pub archive: &'static str,
    pub shell: &'static str,
    pub git: &'static str,
}

pub const NERD_ICONS: Icons = Icons {
    folder_closed: "\u{f07b}",
    folder_open: "\u{f07c}",
    file: "\u{f15b}",
    file_text: "\u{f15c}",
    ghost: "\u{f4a4}",
    rust: "\u{e7a8}",
    go: "\u{e627}",
    python: "\u{e73c}",
    javascript: "\u{e781}",
    typescript: "\u{e628}",
    markdown: "\u{e73e}",
    config: "\u{e60b}",
    lock: "\u{f023}",
    image: "\u{f1c5}",
    archive: "\u{f1c6}",
    shell: "\u{e795}",
    git: "\u{e702}",
};

pub const ASCII_ICONS: Icons = Icons {
    folder_closed: "+",
    folder_open: "-",
    file: " ",
    file_text: " ",
    ghost: "x",
    rust: " ",
    go: " ",
    python: " ",
    javascript: " ",
    typescript: " ",
    markdown: " ",
    config: " ",
    lock: " ",
    image: " ",
    archive: " ",
    shell: " ",
    git: " ",
};

impl Icons {
    pub fn for_mode(mode: IconMode) -> Self {
        match mode {
            IconMode::Nerd => NERD_ICONS,
            IconMode::Ascii => ASCII_ICONS,
        }
    }

    pub fn directory(&self, expanded: bool) -> &'static str {
        if expanded {
            self.folder_open
        } else {
            self.folder_closed
        }
    }

    /// Icon for a file, picked by special name then extension
    pub fn file_icon(&self, name: &str) -> &'static str {
        let lower = name.to_lowercase();
        if matches!(
            lower.as_str(),
            ".gitignore" | ".gitattributes" | ".gitmodules"
        ) {
            return self.git;
        }

        // Leading-dot names like `.bashrc` have no extension.
        let ext = match lower.rfind('.') {
            Some(idx) if idx > 0 => &lower[idx + 1..],
            _ => return self.file,
        };
        match ext {
            "rs" => self.rust,
            "go" => self.go,
            "py" => self.python,
            "js" | "jsx" | "mjs" => self.javascript,
            "ts" | "tsx" => self.typescript,
            "md" => self.markdown,
            "txt" => self.file_text,
            "json" | "toml" | "yaml" | "yml" => self.config,
            "lock" => self.lock,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "webp" | "bmp" => self.image,
            "zip" | "tar" | "gz" | "rar" | "7z" => self.archive,
            "sh" | "bash" | "zsh" | "fish" => self.shell,
            _ => self.file,
        }
    }
}

/// Everything rendering needs to know about appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub theme: Theme,
    pub icons: Icons,
    pub status_bar: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            icons: NERD_ICONS,
            status_bar: true,
        }
    }
}

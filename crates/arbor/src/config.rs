//! Configuration file support for arbor
//!
//! Config file location: `~/.config/arbor/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [tree]
//! show_hidden = false
//!
//! [vcs]
//! backend = "auto"   # auto, git or jj
//!
//! [ui]
//! icons = "nerd"     # nerd or ascii
//! status_bar = true
//!
//! [theme.defs]
//! nord11 = "#BF616A"
//!
//! [theme]
//! modified = "yellow"
//! deleted = "nord11"
//! marker_added = "#A3BE8C"
//! ```

use crate::theme::{self, Theme};
use arbor_core::VcsKind;
use ratatui::style::Color;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Tree configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Show dotfiles
    pub show_hidden: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    pub backend: VcsKind,
}

/// Icon glyph family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconMode {
    /// Nerd Font glyphs
    #[default]
    Nerd,
    Ascii,
}

/// UI configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub icons: IconMode,
    /// Show the bottom status bar
    pub status_bar: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: IconMode::Nerd,
            status_bar: true,
        }
    }
}

/// Color tokens. Values are `#rrggbb`, an ANSI name, or a key of `defs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub defs: HashMap<String, String>,
    pub text: Option<String>,
    pub directory: Option<String>,
    pub modified: Option<String>,
    pub added: Option<String>,
    pub deleted: Option<String>,
    pub renamed: Option<String>,
    pub untracked: Option<String>,
    pub ignored: Option<String>,
    pub conflict: Option<String>,
    pub ghost: Option<String>,
    pub selection: Option<String>,
    pub status_bar: Option<String>,
    pub line_number: Option<String>,
    pub marker_added: Option<String>,
    pub marker_modified: Option<String>,
    pub marker_deleted: Option<String>,
}

impl ThemeConfig {
    /// Resolve tokens to concrete colors; unset or invalid tokens keep the default
    pub fn resolve(&self) -> Theme {
        let base = Theme::default();
        let pick = |token: &Option<String>, fallback: Color| -> Color {
            token
                .as_deref()
                .map(|value| theme::resolve_color_or(value, &self.defs, fallback))
                .unwrap_or(fallback)
        };

        Theme {
            text: pick(&self.text, base.text),
            directory: pick(&self.directory, base.directory),
            modified: pick(&self.modified, base.modified),
            added: pick(&self.added, base.added),
            deleted: pick(&self.deleted, base.deleted),
            renamed: pick(&self.renamed, base.renamed),
            untracked: pick(&self.untracked, base.untracked),
            ignored: pick(&self.ignored, base.ignored),
            conflict: pick(&self.conflict, base.conflict),
            ghost: pick(&self.ghost, base.ghost),
            selection: pick(&self.selection, base.selection),
            status_bar: pick(&self.status_bar, base.status_bar),
            line_number: pick(&self.line_number, base.line_number),
            marker_added: pick(&self.marker_added, base.marker_added),
            marker_modified: pick(&self.marker_modified, base.marker_modified),
            marker_deleted: pick(&self.marker_deleted, base.marker_deleted),
        }
    }
}

/// Root configuration
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tree: TreeConfig,
    pub vcs: VcsConfig,
    pub ui: UiConfig,
    pub theme: ThemeConfig,
}

impl Config {
    /// Get all possible config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("arbor").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("arbor").join("config.toml"));
        }

        // ~/Library/Application Support on macOS
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("arbor").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load the config file, falling back to defaults when it is missing or
    /// cannot be parsed
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .map(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Self {
        toml::from_str(content)
            .map_err(|e| warn!(error = %e, "failed to parse config, using defaults"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("");
        assert!(!config.tree.show_hidden);
        assert_eq!(config.vcs.backend, VcsKind::Auto);
        assert_eq!(config.ui.icons, IconMode::Nerd);
        assert!(config.ui.status_bar);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r##"
[tree]
show_hidden = true

[vcs]
backend = "jj"

[ui]
icons = "ascii"
status_bar = false

[theme]
modified = "magenta"
deleted = "brick"
added = "#00ff00"

[theme.defs]
brick = "#aa3322"
"##,
        );
        assert!(config.tree.show_hidden);
        assert_eq!(config.vcs.backend, VcsKind::Jj);
        assert_eq!(config.ui.icons, IconMode::Ascii);
        assert!(!config.ui.status_bar);

        let theme = config.theme.resolve();
        assert_eq!(theme.modified, Color::Magenta);
        assert_eq!(theme.deleted, Color::Rgb(0xaa, 0x33, 0x22));
        assert_eq!(theme.added, Color::Rgb(0, 0xff, 0));
        assert_eq!(theme.renamed, Theme::default().renamed);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let config = Config::parse("[vcs]\nbackend = \"svn\"\n");
        assert_eq!(config.vcs.backend, VcsKind::Auto);
        assert!(config.ui.status_bar);
    }

    #[test]
    fn test_invalid_color_keeps_default() {
        let config = Config::parse("[theme]\nadded = \"not-a-color\"\n");
        assert_eq!(config.theme.resolve().added, Theme::default().added);
    }
}

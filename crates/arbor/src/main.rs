//! Arbor CLI - file tree viewer with VCS status

mod app;
mod config;
mod logging;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use arbor_core::{FlatEntry, Session, VcsKind};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;
use theme::{Icons, Style};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about = "A file tree viewer with git and jj status")]
struct Args {
    /// Directory to show (defaults to the current directory)
    path: Option<PathBuf>,

    /// Show hidden files
    #[arg(short = 'a', long)]
    hidden: bool,

    /// Version control backend
    #[arg(long, value_enum)]
    vcs: Option<CliVcs>,

    /// Print the tree and exit instead of starting the viewer
    #[arg(short, long)]
    print: bool,

    /// With --print, emit JSON records
    #[arg(long, requires = "print")]
    json: bool,

    /// Expand every directory before showing the tree
    #[arg(short, long)]
    expand_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliVcs {
    Auto,
    Git,
    #[value(alias = "jujutsu")]
    Jj,
}

impl From<CliVcs> for VcsKind {
    fn from(vcs: CliVcs) -> Self {
        match vcs {
            CliVcs::Auto => VcsKind::Auto,
            CliVcs::Git => VcsKind::Git,
            CliVcs::Jj => VcsKind::Jj,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let target = if args.print {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File
    };
    logging::init(target)?;

    let config = config::Config::load();

    let path = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    // CLI overrides config
    let show_hidden = args.hidden || config.tree.show_hidden;
    let kind = args.vcs.map(VcsKind::from).unwrap_or(config.vcs.backend);

    let mut session = Session::open(&path, show_hidden, kind)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    info!(
        root = %session.tree().root_path().display(),
        backend = %session.repo().kind(),
        "session opened"
    );

    if args.expand_all {
        session
            .expand_all()
            .context("Failed to expand directories")?;
    }

    if args.print {
        let entries = session.flat_entries();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if args.json {
            serde_json::to_writer_pretty(&mut out, &entries).context("Failed to write JSON")?;
            writeln!(out)?;
        } else {
            print_tree(&mut out, &entries)?;
        }
        return Ok(());
    }

    let style = Style {
        theme: config.theme.resolve(),
        icons: Icons::for_mode(config.ui.icons),
        status_bar: config.ui.status_bar,
    };
    let mut app = App::new(session, style);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        return Err(err);
    }

    Ok(())
}

/// Plain listing: status letter, indentation, name
fn print_tree(out: &mut impl Write, entries: &[FlatEntry]) -> Result<()> {
    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let ghost = if entry.is_ghost { " (deleted)" } else { "" };
        writeln!(
            out,
            "{} {}{}{}{}",
            entry.status.letter(),
            "  ".repeat(entry.depth),
            entry.name,
            suffix,
            ghost
        )?;
    }
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::VcsStatus;

    fn entry(name: &str, depth: usize, is_dir: bool, status: VcsStatus) -> FlatEntry {
        FlatEntry {
            path: PathBuf::from("/r").join(name),
            name: name.to_string(),
            depth,
            is_dir,
            expanded: is_dir,
            is_ghost: false,
            status,
        }
    }

    #[test]
    fn test_print_tree() {
        let mut gone = entry("gone.rs", 2, false, VcsStatus::Deleted);
        gone.is_ghost = true;
        let entries = vec![
            entry("r", 0, true, VcsStatus::Modified),
            entry("src", 1, true, VcsStatus::Modified),
            gone,
            entry("README.md", 1, false, VcsStatus::None),
        ];
        let mut out = Vec::new();
        print_tree(&mut out, &entries).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "M r/\nM   src/\nD     gone.rs (deleted)\n    README.md\n"
        );
    }

    #[test]
    fn test_cli_flags() {
        let args =
            Args::parse_from(["arbor", "--print", "--json", "--vcs", "jj", "-a", "some/dir"]);
        assert!(args.print && args.json && args.hidden);
        assert_eq!(args.vcs.map(VcsKind::from), Some(VcsKind::Jj));
        assert_eq!(args.path, Some(PathBuf::from("some/dir")));
        assert!(Args::try_parse_from(["arbor", "--json"]).is_err());
    }
}

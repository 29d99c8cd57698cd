mod html;
mod loader;
mod menu;
mod parse;
mod render;
mod serve;
mod web_assets;
mod zoom;

use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::mpsc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Paragraph},
    DefaultTerminal, Frame,
};

use loader::{LoadOutcome, Loader};
use menu::{Chapter, Menu, PanelState};
use render::RenderedLesson;
use zoom::ZoomState;

/// Width of the chapter panel when expanded.
const MENU_WIDTH: u16 = 32;

/// How long to wait for a key event before draining loader outcomes.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Explicit subcommands.
#[derive(Subcommand)]
enum Commands {
    /// View a course directory in the terminal
    View {
        /// Path to the course root (containing a `cours/` directory)
        course: String,
    },
    /// Serve a course directory over HTTP
    Serve {
        /// Path to the course root (containing a `cours/` directory)
        course: String,
        /// Interface address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Starting port number for the HTTP server (0 picks one)
        #[arg(long, default_value = "3333")]
        port: u16,
    },
}

/// Full CLI with explicit subcommands.
#[derive(Parser)]
#[command(
    name = "coursmd",
    version,
    about = "A terminal course viewer for markdown lessons",
    after_help = "INVOCATION FORMS:\n  coursmd <dir>                    View course in TUI mode (legacy)\n  coursmd view <dir>               View course in TUI mode\n  coursmd serve [OPTIONS] <dir>    Serve course over HTTP"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Legacy positional form: coursmd <dir>
#[derive(Parser)]
#[command(
    name = "coursmd",
    version,
    about = "A terminal course viewer for markdown lessons"
)]
struct LegacyCli {
    /// Path to a course root to view
    course: String,
}

/// Resolved dispatch mode after CLI argument parsing.
enum DispatchMode {
    Legacy {
        course: String,
    },
    View {
        course: String,
    },
    Serve {
        course: String,
        bind: String,
        port: u16,
    },
}

fn resolve_dispatch_mode() -> DispatchMode {
    match Cli::try_parse() {
        Ok(cli) => match cli.command {
            Commands::View { course } => DispatchMode::View { course },
            Commands::Serve { course, bind, port } => DispatchMode::Serve { course, bind, port },
        },
        Err(clap_err) => {
            // Pass --help and --version through to the full Cli handler.
            use clap::error::ErrorKind;
            if matches!(
                clap_err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                clap_err.exit();
            }
            // Fall back to legacy positional parse: coursmd <dir>
            match LegacyCli::try_parse() {
                Ok(legacy) => DispatchMode::Legacy {
                    course: legacy.course,
                },
                Err(legacy_err) => legacy_err.exit(),
            }
        }
    }
}

fn main() -> io::Result<()> {
    match resolve_dispatch_mode() {
        DispatchMode::Legacy { course } | DispatchMode::View { course } => run_tui(&course),
        DispatchMode::Serve { course, bind, port } => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(io::Error::other)?;
            rt.block_on(serve::run_serve(PathBuf::from(course), bind, port))
        }
    }
}

fn run_tui(course_arg: &str) -> io::Result<()> {
    let root = Path::new(course_arg);
    let chapters = menu::load_catalog(root).unwrap_or_else(|e| {
        eprintln!("Error: could not read course catalog in '{course_arg}': {e}");
        eprintln!("Expected a course root containing a `{}/` directory.", loader::LESSON_DIR);
        process::exit(1);
    });

    let root = root.to_path_buf();
    ratatui::run(|terminal| run(terminal, root, chapters))
}

/// What the content pane currently displays.
enum Pane {
    Welcome,
    Lesson {
        id: String,
        lesson: parse::ParsedLesson,
    },
    Failed {
        id: String,
    },
}

/// The viewer controller: all state lives here, constructed once at
/// startup and threaded through the event loop.
struct App {
    menu: Menu,
    panel: PanelState,
    zoom: ZoomState,
    pane: Pane,
    scroll: usize,
    loader: Loader,
    outcomes: mpsc::Receiver<LoadOutcome>,
    /// Content pane text rendered at `cache_width`; rebuilt when the
    /// pane, the zoom, or the layout width changes.
    rendered: RenderedLesson,
    cache_width: u16,
    dirty: bool,
    /// Content viewport height from the last draw, for paging keys.
    viewport_height: usize,
}

impl App {
    fn new(root: PathBuf, chapters: Vec<Chapter>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            menu: Menu::new(chapters),
            panel: PanelState::Expanded,
            zoom: ZoomState::new(),
            pane: Pane::Welcome,
            scroll: 0,
            loader: Loader::new(root, tx),
            outcomes: rx,
            rendered: RenderedLesson {
                text: render::welcome_text(),
                headings: Vec::new(),
            },
            cache_width: 0,
            dirty: false,
            viewport_height: 0,
        }
    }

    /// Drain settled loads. An outcome older than the latest issued
    /// request is discarded — last-request-wins, not last-to-resolve.
    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            if outcome.is_stale(self.loader.latest_seq()) {
                continue;
            }
            self.pane = match outcome.result {
                Ok(source) => Pane::Lesson {
                    id: outcome.id,
                    lesson: parse::parse(&source),
                },
                Err(_) => Pane::Failed { id: outcome.id },
            };
            self.scroll = 0;
            self.dirty = true;
        }
    }

    /// Rebuild the cached pane text at the given wrap width if needed.
    fn refresh_rendered(&mut self, wrap_width: u16) {
        if !self.dirty && wrap_width == self.cache_width {
            return;
        }
        self.rendered = match &self.pane {
            Pane::Welcome => RenderedLesson {
                text: render::welcome_text(),
                headings: Vec::new(),
            },
            Pane::Failed { id } => RenderedLesson {
                text: render::error_text(id),
                headings: Vec::new(),
            },
            Pane::Lesson { lesson, .. } => render::render_lesson(lesson, wrap_width),
        };
        self.cache_width = wrap_width;
        self.dirty = false;
    }

    fn max_scroll(&self) -> usize {
        self.rendered
            .text
            .lines
            .len()
            .saturating_sub(self.viewport_height)
    }

    fn status_title(&self) -> &str {
        match &self.pane {
            Pane::Welcome => "accueil",
            Pane::Lesson { id, .. } | Pane::Failed { id } => id,
        }
    }
}

fn run(terminal: &mut DefaultTerminal, root: PathBuf, chapters: Vec<Chapter>) -> io::Result<()> {
    let mut app = App::new(root, chapters);

    loop {
        app.drain_outcomes();

        terminal.draw(|frame| ui(frame, &mut app))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(&mut app, key) {
                    return Ok(());
                }
            }
            // Resize is handled implicitly: the next draw re-derives the
            // wrap width and clamps the scroll offset.
            _ => {}
        }
    }
}

/// Handle one key press; returns `true` to quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,

        // Panel toggle: one state flip, everything else is projection.
        KeyCode::Char('s') => app.panel.toggle(),

        // Menu cursor, only while the panel is visible.
        KeyCode::Up => {
            if app.panel.is_expanded() {
                app.menu.move_up();
            }
        }
        KeyCode::Down => {
            if app.panel.is_expanded() {
                app.menu.move_down();
            }
        }

        // Activate: leaf items dispatch to the loader, section items
        // toggle their sublist.
        KeyCode::Enter => {
            if app.panel.is_expanded() {
                if let Some(id) = app.menu.activate() {
                    app.loader.request(&id);
                }
            }
        }

        // Content scrolling.
        KeyCode::Char('j') => app.scroll = (app.scroll + 1).min(app.max_scroll()),
        KeyCode::Char('k') => app.scroll = app.scroll.saturating_sub(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll = (app.scroll + app.viewport_height / 2).min(app.max_scroll());
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll = app.scroll.saturating_sub(app.viewport_height / 2);
        }
        KeyCode::Char('g') | KeyCode::Home => app.scroll = 0,
        KeyCode::Char('G') | KeyCode::End => app.scroll = app.max_scroll(),

        // Zoom: multiplicative, unclamped; reset returns exactly to 1.0.
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom.zoom_in(),
        KeyCode::Char('-') => app.zoom.zoom_out(),
        KeyCode::Char('0') => app.zoom.reset(),

        _ => {}
    }
    false
}

fn ui(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    const MIN_WIDTH: u16 = 20;
    const MIN_HEIGHT: u16 = 5;
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = "Terminal too small";
        let w = (msg.len() as u16).min(area.width);
        if w > 0 && area.height > 0 {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    msg,
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Rect::new(area.x, area.y + area.height / 2, w, 1),
            );
        }
        return;
    }

    let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);

    // The content pane expands to the panel's width when it is hidden —
    // a projection of PanelState, nothing is measured back from the UI.
    let (menu_area, content_area) = if app.panel.is_expanded() {
        let cols =
            Layout::horizontal([Constraint::Length(MENU_WIDTH), Constraint::Min(1)]).split(rows[0]);
        (Some(cols[0]), cols[1])
    } else {
        (None, rows[0])
    };

    app.viewport_height = content_area.height as usize;
    let wrap_width = app.zoom.content_width(content_area.width.saturating_sub(1));
    app.refresh_rendered(wrap_width);
    app.scroll = app.scroll.min(app.max_scroll());

    if let Some(panel_area) = menu_area {
        let inner_height = panel_area.height.saturating_sub(2) as usize;
        let menu_scroll = if inner_height == 0 {
            0
        } else {
            app.menu.cursor().saturating_sub(inner_height - 1)
        };
        let panel = Paragraph::new(menu::menu_lines(&app.menu))
            .block(Block::bordered().title(" Sommaire "))
            .scroll((menu_scroll as u16, 0));
        frame.render_widget(panel, panel_area);
    }

    let content = Paragraph::new(app.rendered.text.clone()).scroll((app.scroll as u16, 0));
    frame.render_widget(content, content_area);

    // Status bar.
    let total = app.rendered.text.lines.len();
    let position = if total == 0 {
        "Empty".to_owned()
    } else if total <= app.viewport_height {
        "All".to_owned()
    } else if app.scroll == 0 {
        "Top".to_owned()
    } else if app.scroll >= app.max_scroll() {
        "Bot".to_owned()
    } else {
        format!("{}%", (app.scroll * 100) / total)
    };

    let heading_ctx = app
        .rendered
        .headings
        .iter()
        .rev()
        .find(|h| h.line <= app.scroll)
        .map(|h| format!("  \u{00a7} {}", h.text))
        .unwrap_or_default();

    let zoom_ctx = if app.zoom.is_zoomed() {
        format!("  zoom {}%", app.zoom.percent())
    } else {
        String::new()
    };

    let status = format!(
        " {}  {}{}{}  [s] {}  [q] quit",
        app.status_title(),
        position,
        heading_ctx,
        zoom_ctx,
        app.panel.hint(),
    );
    let status_bar = Paragraph::new(Span::styled(
        status,
        Style::default().fg(Color::Black).bg(Color::White),
    ))
    .style(Style::default().bg(Color::White));
    frame.render_widget(status_bar, rows[1]);
}

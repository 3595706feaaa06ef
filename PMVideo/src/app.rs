//! Flat browsing UI over the view model.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use pmvconfig::Config;
use pmvconnect::Connection;
use pmvcovers::CoverCache;
use pmvmodel::{FlatProxy, NodeId, TreeModel};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::warn;

use crate::playback;

const TICK_RATE: Duration = Duration::from_millis(200);

struct Row {
    node: NodeId,
    label: String,
    is_leaf: bool,
    unfinished: bool,
}

pub struct App {
    model: TreeModel,
    proxy: FlatProxy,
    conn: Arc<Connection>,
    covers: CoverCache,
    config: Arc<Config>,
    rows: Vec<Row>,
    selected: usize,
    breadcrumb: Vec<String>,
    status: String,
    force_transcode: bool,
}

impl App {
    pub fn new(
        model: TreeModel,
        conn: Arc<Connection>,
        covers: CoverCache,
        config: Arc<Config>,
    ) -> Result<Self> {
        let force_transcode = config.get_always_transcode();
        let mut app = Self {
            model,
            proxy: FlatProxy::new(),
            conn,
            covers,
            config,
            rows: Vec::new(),
            selected: 0,
            breadcrumb: Vec::new(),
            status: "Up/Down select, Enter open/play, Backspace up, q quit".to_owned(),
            force_transcode,
        };
        app.reload()?;
        Ok(app)
    }

    /// Rebuilds the flat rows for the current anchor.
    ///
    /// A declared child count can overshoot the actual listing; rows stop
    /// at the first absent index.
    fn reload(&mut self) -> Result<()> {
        self.rows.clear();
        let announced = self.proxy.row_count(&mut self.model)?;
        for row in 0..announced as usize {
            let Some(node) = self.proxy.source_node(&mut self.model, row)? else {
                break;
            };
            let unfinished = self.model.unfinished(node).unwrap_or(false);
            let marker = if unfinished { "*" } else { "" };
            self.rows.push(Row {
                node,
                label: format!("{}{}", marker, self.model.label(node)),
                is_leaf: self.model.is_leaf(node),
                unfinished,
            });
        }
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
        Ok(())
    }

    fn location(&self) -> String {
        let mut parts = vec![self.conn.name().to_owned()];
        parts.extend(self.breadcrumb.iter().cloned());
        parts.join(" > ")
    }

    fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    fn activate(&mut self) -> Result<()> {
        let Some(row) = self.selected_row() else {
            return Ok(());
        };
        let node = row.node;

        if row.is_leaf {
            self.status = playback::play(
                &mut self.model,
                node,
                &self.conn,
                &self.config.get_player_command(),
                self.force_transcode,
            )?;
            self.reload()?;
        } else {
            let label = self.model.label(node);
            self.proxy.descend(node);
            self.breadcrumb.push(label);
            self.selected = 0;
            self.reload()?;
        }
        Ok(())
    }

    fn go_up(&mut self) -> Result<()> {
        if self.proxy.anchor().is_none() {
            // Already at the sections; nothing above.
            return Ok(());
        }
        self.proxy.go_up(&self.model);
        self.breadcrumb.pop();
        self.selected = 0;
        self.reload()
    }

    fn toggle_transcode(&mut self) {
        self.force_transcode = !self.force_transcode;
        if let Err(err) = self.config.set_always_transcode(self.force_transcode) {
            warn!(error = %err, "cannot persist transcode setting");
        }
        self.status = format!(
            "Always Request Transcode is now {}",
            if self.force_transcode { "ON" } else { "OFF" }
        );
    }

    fn mark_selected(&mut self, watched: bool) -> Result<()> {
        let Some(row) = self.selected_row() else {
            return Ok(());
        };
        let node = row.node;
        let Some(video) = self.model.video_mut(node) else {
            self.status = "Not a video".to_owned();
            return Ok(());
        };
        let result = if watched {
            video.mark_watched()
        } else {
            video.mark_unwatched()
        };
        match result {
            Ok(()) => {
                self.status = format!("Marked {}", if watched { "watched" } else { "unwatched" });
                self.reload()?;
            }
            Err(err) => self.status = format!("Server refused: {err}"),
        }
        Ok(())
    }

    fn cache_selected_cover(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        match self.model.thumbnail(row.node, &self.covers) {
            Ok(Some(path)) => self.status = format!("Cover at {}", path.display()),
            Ok(None) => self.status = "No cover for this item".to_owned(),
            Err(err) => self.status = format!("Cover fetch failed: {err}"),
        }
    }

    fn refresh_selected_section(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        match self.model.section(row.node) {
            Some(section) => match section.refresh() {
                Ok(()) => self.status = "Section rescan requested".to_owned(),
                Err(err) => self.status = format!("Rescan failed: {err}"),
            },
            None => self.status = "Select a section to rescan".to_owned(),
        }
    }

    /// Returns true when the application should exit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Right => self.activate()?,
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('u') => self.go_up()?,
            KeyCode::Char('t') => self.toggle_transcode(),
            KeyCode::Char('w') => self.mark_selected(true)?,
            KeyCode::Char('x') => self.mark_selected(false)?,
            KeyCode::Char('c') => self.cache_selected_cover(),
            KeyCode::Char('r') => self.refresh_selected_section(),
            _ => {}
        }
        Ok(false)
    }

    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(3),
            ])
            .split(f.size());

        let location = Paragraph::new(Line::from(self.location()))
            .block(Block::default().borders(Borders::ALL).title("Location"));
        f.render_widget(location, chunks[0]);

        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|row| {
                let icon = if row.is_leaf { "▷" } else { "▣" };
                let mut item = ListItem::new(format!("{icon} {}", row.label));
                if row.unfinished {
                    item = item.style(Style::default().add_modifier(Modifier::BOLD));
                }
                item
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Library"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.selected.min(self.rows.len() - 1)));
        }
        f.render_stateful_widget(list, chunks[1], &mut state);

        let status = Paragraph::new(Line::from(self.status.clone()))
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[2]);
    }
}

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

pub fn run(mut app: App) -> Result<()> {
    let terminal = setup_terminal()?;
    let mut guard = TerminalGuard { terminal };

    loop {
        guard.terminal.draw(|f| app.draw(f))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key)? {
                    break;
                }
            }
        }
    }

    // Terminal restored by the guard's Drop.
    Ok(())
}

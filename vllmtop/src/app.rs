//! App state and main loop: input handling, dispatching session actions, and drawing.

use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::time::sleep;
use tracing::warn;
use vllmtop::session::{normalize_url, Session, SessionState, DEFAULT_SERVICE_LINES, MAX_SERVICE_LINES};

use crate::ui::dialogs::{
    draw_confirm_shutdown, draw_service_log, draw_url_prompt, service_log_body, service_log_lines,
};
use crate::ui::models::{draw_models, follow_selection, models_viewport_rows};
use crate::ui::scroll::handle_scroll_key;
use crate::ui::{controls::draw_controls, gpu::draw_gpu, header::draw_header, status::{draw_status, draw_unreachable}};

const LOG_LINES_STEP: u32 = 50;
// Upper bound on redraw latency; keeps the elapsed timer ticking.
const FRAME: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Dashboard,
    UrlPrompt { input: String, error: Option<String> },
    ConfirmShutdown,
    ServiceLog { lines: u32, scroll: usize },
}

/// Work a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Configure(String),
    Start,
    Stop,
    Restart,
    Shutdown,
    Switch(String),
    FetchServiceStatus(u32),
    ConsumeError,
}

pub struct App {
    session: Session,
    pub mode: Mode,
    pub selected: usize,
    models_scroll: usize,
    last_area: Rect,
    last_models_area: Option<Rect>,
    should_quit: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mode = if session.snapshot().is_configured() {
            Mode::Dashboard
        } else {
            Mode::UrlPrompt {
                input: String::new(),
                error: None,
            }
        };
        Self {
            session,
            mode,
            selected: 0,
            models_scroll: 0,
            last_area: Rect::default(),
            last_models_area: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self, initial_url: Option<String>) -> anyhow::Result<()> {
        if let Some(url) = initial_url {
            self.mode = Mode::Dashboard;
            self.dispatch(Command::Configure(url));
        }
        self.session.start_polling();

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        self.session.dispose();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        let mut changes = self.session.subscribe();
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    let snap = self.session.snapshot();
                    if let Some(cmd) = self.handle_key(k, &snap) {
                        self.dispatch(cmd);
                    }
                }
            }
            if self.should_quit {
                break;
            }

            let snap = changes.borrow_and_update().clone();
            let now = self.session.now();
            terminal.draw(|f| self.draw(f, &snap, now))?;

            tokio::select! {
                _ = changes.changed() => {}
                _ = sleep(FRAME) => {}
            }
        }
        Ok(())
    }

    fn dispatch(&self, cmd: Command) {
        let session = self.session.clone();
        if cmd == Command::ConsumeError {
            session.consume_error();
            return;
        }
        tokio::spawn(async move {
            match cmd {
                Command::Configure(url) => {
                    if let Err(e) = session.configure(&url).await {
                        warn!(error = %e, "rejected server URL");
                    }
                }
                Command::Start => session.start().await,
                Command::Stop => session.stop().await,
                Command::Restart => session.restart().await,
                Command::Shutdown => session.shutdown().await,
                Command::Switch(id) => session.switch_model(&id).await,
                Command::FetchServiceStatus(n) => session.fetch_service_status(n).await,
                Command::ConsumeError => {}
            }
        });
    }

    /// Map a key to a mode change and/or a session command.
    pub fn handle_key(&mut self, k: KeyEvent, s: &SessionState) -> Option<Command> {
        let cmd = match &mut self.mode {
            Mode::UrlPrompt { input, error } => match k.code {
                KeyCode::Enter => match normalize_url(input) {
                    Ok(url) => {
                        self.mode = Mode::Dashboard;
                        Some(Command::Configure(url))
                    }
                    Err(e) => {
                        *error = Some(e.to_string());
                        None
                    }
                },
                KeyCode::Esc => {
                    if s.is_configured() {
                        self.mode = Mode::Dashboard;
                    } else {
                        self.should_quit = true;
                    }
                    None
                }
                KeyCode::Backspace => {
                    input.pop();
                    None
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    *error = None;
                    None
                }
                _ => None,
            },
            Mode::ConfirmShutdown => {
                self.mode = Mode::Dashboard;
                matches!(k.code, KeyCode::Char('y') | KeyCode::Char('Y')).then_some(Command::Shutdown)
            }
            Mode::ServiceLog { lines, scroll } => match k.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.mode = Mode::Dashboard;
                    None
                }
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    *lines = (*lines + LOG_LINES_STEP).min(MAX_SERVICE_LINES);
                    Some(Command::FetchServiceStatus(*lines))
                }
                KeyCode::Char('-') => {
                    *lines = lines.saturating_sub(LOG_LINES_STEP).max(1);
                    Some(Command::FetchServiceStatus(*lines))
                }
                KeyCode::Char('R') => Some(Command::FetchServiceStatus(*lines)),
                _ => {
                    let page = service_log_body(self.last_area).height as usize;
                    let total = s.service_status.as_ref().map_or(0, |d| service_log_lines(d).len());
                    handle_scroll_key(scroll, k, page, total);
                    None
                }
            },
            Mode::Dashboard => {
                if s.last_error.is_some() {
                    return Some(Command::ConsumeError);
                }
                self.dashboard_key(k, s)
            }
        };
        self.follow_selection(s);
        cmd
    }

    fn dashboard_key(&mut self, k: KeyEvent, s: &SessionState) -> Option<Command> {
        match k.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('s') if !s.busy => Some(Command::Start),
            KeyCode::Char('x') if !s.busy => Some(Command::Stop),
            KeyCode::Char('r') if !s.busy => Some(Command::Restart),
            KeyCode::Char('S') if !s.busy => {
                self.mode = Mode::ConfirmShutdown;
                None
            }
            KeyCode::Char('l') => {
                self.mode = Mode::ServiceLog {
                    lines: DEFAULT_SERVICE_LINES,
                    scroll: 0,
                };
                Some(Command::FetchServiceStatus(DEFAULT_SERVICE_LINES))
            }
            KeyCode::Char('u') => {
                self.mode = Mode::UrlPrompt {
                    input: s.server_url.clone().unwrap_or_default(),
                    error: None,
                };
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = self.selected.saturating_add(1);
                None
            }
            KeyCode::Enter if !s.busy => {
                let m = s.models.get(self.selected)?;
                if m.active {
                    return None;
                }
                let id = m.id.clone();
                // a successful switch moves the model to the top
                self.selected = 0;
                Some(Command::Switch(id))
            }
            _ => None,
        }
    }

    fn follow_selection(&mut self, s: &SessionState) {
        self.selected = self.selected.min(s.models.len().saturating_sub(1));
        if let Some(area) = self.last_models_area {
            self.models_scroll =
                follow_selection(self.models_scroll, self.selected, models_viewport_rows(area));
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>, s: &SessionState, now_ms: i64) {
        let area = f.area();
        self.last_area = area;

        // Root rows: header, banner, status + gpu, models, controls
        let banner_h = if s.reachable { 0 } else { 3 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(banner_h),
                Constraint::Length(7),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        draw_header(f, rows[0], s, now_ms);
        if !s.reachable {
            draw_unreachable(f, rows[1]);
        }

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        draw_status(f, top[0], s);
        draw_gpu(f, top[1], s.status.as_ref().and_then(|st| st.gpu.as_ref()));

        // Cache for input handlers
        self.last_models_area = Some(rows[3]);
        draw_models(f, rows[3], s, self.selected, self.models_scroll);
        draw_controls(f, rows[4], s);

        match &self.mode {
            Mode::Dashboard => {}
            Mode::UrlPrompt { input, error } => {
                draw_url_prompt(f, input, error.as_deref(), s.is_configured())
            }
            Mode::ConfirmShutdown => draw_confirm_shutdown(f),
            Mode::ServiceLog { lines, scroll } => draw_service_log(f, s, *lines, *scroll),
        }
    }
}

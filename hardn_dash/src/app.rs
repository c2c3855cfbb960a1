//! App state and main loop: input handling, snapshot refresh, service actions and drawing.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hardn_agent::control::{ActionOutcome, Caller, ServiceAction};
use hardn_agent::shutdown::ShutdownSignal;
use hardn_agent::AppState;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Color,
    Terminal,
};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::sleep;
use tracing::info;

use crate::poller::Snapshot;
use crate::ui::{
    charts::draw_charts,
    header::draw_header,
    logs::draw_logs,
    services::{draw_controls, draw_services},
    status::draw_status,
    sysctl::draw_sysctl,
};

/// Result of one dispatched service action.
#[derive(Debug)]
pub struct ActionReport {
    pub service: String,
    pub action: ServiceAction,
    pub result: Result<ActionOutcome, String>,
}

/// What the loop needs from the outside world.
pub struct DashContext {
    pub state: AppState,
    pub snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    pub refresh: Arc<Notify>,
    pub caller: Caller,
    pub stop: ShutdownSignal,
}

pub struct App {
    snapshot: Option<Arc<Snapshot>>,
    controllable: Vec<String>,
    selected: usize,
    status: Option<(String, Color)>,
    should_quit: bool,
}

impl App {
    pub fn new(controllable: Vec<String>) -> Self {
        Self {
            snapshot: None,
            controllable,
            selected: 0,
            status: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn selected_service(&self) -> Option<&str> {
        self.controllable.get(self.selected).map(String::as_str)
    }

    /// Apply a key press. Returns an action to dispatch for the selected service, if any.
    pub fn handle_key(&mut self, k: KeyEvent) -> Option<ServiceAction> {
        if k.kind == KeyEventKind::Release {
            return None;
        }
        match k.code {
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                if self.selected + 1 < self.controllable.len() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Char('e') => self.action_for_selection(ServiceAction::Enable),
            KeyCode::Char('d') => self.action_for_selection(ServiceAction::Disable),
            KeyCode::Char('s') => self.action_for_selection(ServiceAction::Start),
            KeyCode::Char('x') => self.action_for_selection(ServiceAction::Stop),
            KeyCode::Char('r') => self.action_for_selection(ServiceAction::Restart),
            _ => None,
        }
    }

    fn action_for_selection(&self, a: ServiceAction) -> Option<ServiceAction> {
        self.selected_service().map(|_| a)
    }

    pub fn on_snapshot(&mut self, s: Arc<Snapshot>) {
        self.snapshot = Some(s);
    }

    pub fn on_report(&mut self, r: ActionReport) {
        self.status = Some(match r.result {
            Ok(o) if o.success => (format!("{} {}: ok", r.action, r.service), Color::Green),
            Ok(o) => {
                let detail = o.error.lines().next().unwrap_or("").trim().to_string();
                (
                    format!("{} {}: failed {detail}", r.action, r.service),
                    Color::Red,
                )
            }
            Err(e) => (format!("{} {}: {e}", r.action, r.service), Color::Red),
        });
    }

    pub async fn run(&mut self, ctx: DashContext) -> anyhow::Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal, ctx).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut ctx: DashContext,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ActionReport>();
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if let Some(action) = self.handle_key(k) {
                        self.dispatch(&ctx, &tx, action);
                    }
                }
            }
            if self.should_quit() || ctx.stop.is_triggered() {
                break;
            }

            if ctx.snapshots.has_changed().unwrap_or(false) {
                if let Some(s) = ctx.snapshots.borrow_and_update().clone() {
                    self.on_snapshot(s);
                }
            }
            while let Ok(report) = rx.try_recv() {
                self.on_report(report);
            }

            terminal.draw(|f| self.draw(f))?;

            // Tick rate
            sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }

    fn dispatch(&mut self, ctx: &DashContext, tx: &mpsc::UnboundedSender<ActionReport>, action: ServiceAction) {
        let Some(service) = self.selected_service().map(str::to_string) else {
            return;
        };
        info!(%service, %action, "dashboard action");
        self.status = Some((format!("{action} {service}..."), Color::Yellow));

        let executor = ctx.state.executor.clone();
        let caller = ctx.caller.clone();
        let refresh = ctx.refresh.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = executor
                .submit(&caller, &service, action.as_str())
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(ActionReport {
                service,
                action,
                result,
            });
            refresh.notify_one();
        });
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let snap = self.snapshot.as_deref();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(9),    // services | controls | sysctl
                Constraint::Length(6), // sparklines
                Constraint::Min(6),    // logs
                Constraint::Length(1), // status line
            ])
            .split(area);

        draw_header(f, rows[0], snap);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(30),
                Constraint::Percentage(35),
            ])
            .split(rows[1]);
        draw_services(f, top[0], snap);
        draw_controls(f, top[1], &self.controllable, self.selected, snap);
        draw_sysctl(f, top[2], snap);

        draw_charts(f, rows[2], snap.map(|s| s.samples.as_slice()).unwrap_or(&[]));
        draw_logs(f, rows[3], snap);

        draw_status(f, rows[4], self.status.as_ref());
    }
}

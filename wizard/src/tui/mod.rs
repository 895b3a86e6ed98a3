//! Terminal front-end for the analytics wizard.
//!
//! Layout:
//! - Centered window titled "Customer Analytics Wizard"
//! - Left panel listing the three steps (current one highlighted, finished ones ticked)
//! - Page content on the right, key hints on the bottom row
//! - Confirm-quit modal on Esc
//!
//! Requests run on a tokio runtime owned by the UI; their outcomes come back over an mpsc channel
//! and are applied on the UI thread only, so the wizard state is never shared.
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{debug, info};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

use crate::api::{BackendClient, ReqwestTransport};
use crate::config::WizardConfig;
use crate::error::WizardResult;
use crate::models::requests::ConnectForm;
use crate::models::responses::AnalyticsRow;
use crate::render::{
    loading_message, no_data_message, AnalyticsReport, Renderer, StatusKind, RESULT_COLUMNS,
};
use crate::wizard::{
    AnalyticsTicket, CollectionsTicket, Completion, ConnectTicket, Dispatch, Step, Wizard,
    WizardEvent,
};

const WINDOW_TITLE: &str = " Customer Analytics Wizard ";

const HOST: usize = 0;
const PORT: usize = 1;
const USERNAME: usize = 2;
const PASSWORD: usize = 3;
const SCHEMA: usize = 4;
const FIELD_COUNT: usize = 5;
/// Focus index of the Connect button (after the five fields).
const CONNECT_BUTTON: usize = FIELD_COUNT;

const FIELD_LABELS: [&str; FIELD_COUNT] = ["Host", "Port", "Username", "Password", "Database"];

#[derive(Debug, Clone, Default, PartialEq)]
enum AnalyticsPanel {
    #[default]
    Empty,
    Loading(String),
    Failed(String),
    Report(AnalyticsReport),
}

/// Screen model painted by `draw`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TuiRenderer {
    step: Step,
    status: Option<(String, StatusKind)>,
    busy: bool,
    picker: Vec<String>,
    selected: Option<usize>,
    panel: AnalyticsPanel,
}

impl Renderer for TuiRenderer {
    fn show_step(&mut self, step: Step) {
        self.step = step;
    }

    fn render_status(&mut self, message: &str, kind: StatusKind) {
        self.status = Some((message.to_string(), kind));
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn render_collection_picker(&mut self, names: &[String]) {
        self.picker = names.to_vec();
        self.selected = None;
    }

    fn mark_selected(&mut self, index: Option<usize>) {
        self.selected = index.filter(|i| *i < self.picker.len());
    }

    fn render_analytics_loading(&mut self, collection: &str) {
        self.panel = AnalyticsPanel::Loading(collection.to_string());
    }

    fn render_analytics_error(&mut self, message: &str) {
        self.panel = AnalyticsPanel::Failed(message.to_string());
    }

    fn render_results(&mut self, report: &AnalyticsReport) {
        self.panel = AnalyticsPanel::Report(report.clone());
    }
}

/// Single-line editor; the cursor counts characters, not bytes.
#[derive(Debug, Clone)]
struct TextInput {
    value: String,
    cursor: usize,
    masked: bool,
}

impl TextInput {
    fn new(value: impl Into<String>, masked: bool) -> Self {
        let v = value.into();
        Self {
            cursor: v.chars().count(),
            value: v,
            masked,
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.len())
        } else {
            self.value.clone()
        }
    }

    fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.len();
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                let at = self.byte_index();
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let at = self.byte_index();
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.len();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuitChoice {
    Quit,
    Stay,
}

#[derive(Debug)]
enum UiMsg {
    ConnectFinished {
        ticket: ConnectTicket,
        result: WizardResult<String>,
    },
    /// The post-connect delay elapsed; time to list tables for connect `connect_seq`.
    CollectionsDue { connect_seq: u64 },
    CollectionsLoaded {
        ticket: CollectionsTicket,
        result: WizardResult<Vec<String>>,
    },
    AnalyticsLoaded {
        ticket: AnalyticsTicket,
        result: WizardResult<Vec<AnalyticsRow>>,
    },
}

/// Runs requests off the UI thread. Every call returns immediately.
trait RequestRunner {
    fn connect(&self, ticket: ConnectTicket);
    fn schedule_collections(&self, connect_seq: u64);
    fn list_collections(&self, ticket: CollectionsTicket);
    fn analytics(&self, ticket: AnalyticsTicket);
}

struct Worker {
    runtime: Runtime,
    client: Arc<BackendClient<ReqwestTransport>>,
    tx: mpsc::Sender<UiMsg>,
    collections_delay: Duration,
}

impl RequestRunner for Worker {
    fn connect(&self, ticket: ConnectTicket) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = client.connect(ticket.params()).await;
            let _ = tx.send(UiMsg::ConnectFinished { ticket, result });
        });
    }

    fn schedule_collections(&self, connect_seq: u64) {
        let delay = self.collections_delay;
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(UiMsg::CollectionsDue { connect_seq });
        });
    }

    fn list_collections(&self, ticket: CollectionsTicket) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = client.list_tables().await;
            let _ = tx.send(UiMsg::CollectionsLoaded { ticket, result });
        });
    }

    fn analytics(&self, ticket: AnalyticsTicket) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = client.analytics(ticket.collection()).await;
            let _ = tx.send(UiMsg::AnalyticsLoaded { ticket, result });
        });
    }
}

struct TuiState {
    wizard: Wizard<TuiRenderer>,
    fields: [TextInput; FIELD_COUNT],
    focus: usize,
    picker_cursor: usize,
    results_scroll: usize,
    modal: Option<QuitChoice>,
    quit: bool,
}

impl TuiState {
    fn new(default_port: u16) -> Self {
        let form = ConnectForm::with_default_port(default_port);
        Self {
            wizard: Wizard::new(TuiRenderer::default()),
            fields: [
                TextInput::new(form.host, false),
                TextInput::new(form.port, false),
                TextInput::new(form.username, false),
                TextInput::new(form.password, true),
                TextInput::new(form.schema, false),
            ],
            focus: HOST,
            picker_cursor: 0,
            results_scroll: 0,
            modal: None,
            quit: false,
        }
    }

    fn form(&self) -> ConnectForm {
        ConnectForm {
            host: self.fields[HOST].value.clone(),
            port: self.fields[PORT].value.clone(),
            username: self.fields[USERNAME].value.clone(),
            password: self.fields[PASSWORD].value.clone(),
            schema: self.fields[SCHEMA].value.clone(),
        }
    }

    fn screen(&self) -> &TuiRenderer {
        self.wizard.renderer()
    }
}

pub fn run(config: &WizardConfig) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: start] Starting TUI wizard backend={}",
        config.backend_url
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let transport = {
        let _guard = runtime.enter();
        ReqwestTransport::new(&config.backend_url, config.request_timeout())?
    };
    let (tx, rx) = mpsc::channel::<UiMsg>();
    let worker = Worker {
        runtime,
        client: Arc::new(BackendClient::new(transport)),
        tx,
        collections_delay: config.collections_delay(),
    };

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, TuiState::new(config.default_port), &rx, &worker);
    restore_terminal(&mut terminal)?;

    info!("[PHASE: tui] [STEP: exit] TUI wizard closed");
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokeTarget {
    Connect,
    Collections,
    Analytics,
}

impl SmokeTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "connect" => Ok(SmokeTarget::Connect),
            "collections" | "tables" => Ok(SmokeTarget::Collections),
            "analytics" | "results" => Ok(SmokeTarget::Analytics),
            other => bail!(
                "Unknown smoke target '{}' (expected connect|collections|analytics)",
                other
            ),
        }
    }
}

fn sample_rows() -> Vec<AnalyticsRow> {
    let row = |id: &str, orders: i64, gap: Option<f64>, next: Option<&str>, class: &str| {
        AnalyticsRow {
            customer_id: id.to_string(),
            customer_name: None,
            total_orders: orders,
            avg_order_gap: gap,
            last_order_date: Some("2024-03-01".to_string()),
            predicted_next_order_date: next.map(str::to_string),
            customer_classification: class.to_string(),
        }
    };
    vec![
        row("C-1001", 12, Some(14.5), Some("2024-03-15"), "ACTIVE"),
        row("C-1002", 1, None, None, "NEW"),
        row("C-1003", 4, Some(61.0), Some("2024-05-01"), "AT RISK"),
        row("C-1004", 7, Some(30.0), Some("2023-11-20"), "CHURNED"),
    ]
}

// Smoke-only: seeded through the same begin/finish calls a live session makes, without network.
fn new_smoke_state(target: SmokeTarget, default_port: u16) -> TuiState {
    let mut state = TuiState::new(default_port);
    state.fields[HOST].set("localhost");
    state.fields[USERNAME].set("analyst");
    state.fields[PASSWORD].set("secret");
    state.fields[SCHEMA].set("shop");
    if target == SmokeTarget::Connect {
        return state;
    }

    let form = state.form();
    if let Ok(ticket) = state.wizard.begin_connect(&form) {
        let _ = state.wizard.finish_connect(ticket, Ok(String::new()));
    }
    let names = vec![
        "customers".to_string(),
        "orders".to_string(),
        "payments".to_string(),
    ];
    let ticket = state.wizard.begin_list_collections();
    let _ = state.wizard.finish_list_collections(ticket, Ok(names));
    if target == SmokeTarget::Collections {
        return state;
    }

    state.picker_cursor = 1;
    let ticket = state.wizard.begin_fetch_analytics("orders");
    let _ = state.wizard.finish_fetch_analytics(ticket, Ok(sample_rows()));
    state
}

fn render_to_buffer(state: &TuiState, width: u16, height: u16) -> Result<Buffer> {
    // In-memory backend: no raw mode, no alternate screen.
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, state))?;
    Ok(terminal.backend().buffer().clone())
}

/// Non-interactive smoke mode: render a single frame of `target` and exit.
pub fn smoke(config: &WizardConfig, target: SmokeTarget) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={:?}",
        target
    );
    let state = new_smoke_state(target, config.default_port);
    render_to_buffer(&state, 100, 30)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut state: TuiState,
    rx: &mpsc::Receiver<UiMsg>,
    runner: &dyn RequestRunner,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    while !state.quit {
        drain_messages(&mut state, rx, runner);
        terminal.draw(|f| draw(f.size(), f, &state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut state, key.code, runner);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn drain_messages(state: &mut TuiState, rx: &mpsc::Receiver<UiMsg>, runner: &dyn RequestRunner) {
    while let Ok(msg) = rx.try_recv() {
        apply_message(state, msg, runner);
    }
}

// Failures are already painted by the wizard; only the follow-up work is decided here.
fn apply_message(state: &mut TuiState, msg: UiMsg, runner: &dyn RequestRunner) {
    match msg {
        UiMsg::ConnectFinished { ticket, result } => {
            let seq = ticket.seq();
            match state.wizard.finish_connect(ticket, result) {
                Ok(Completion::Applied(())) => runner.schedule_collections(seq),
                Ok(Completion::Stale) => {}
                Err(e) => debug!("[PHASE: tui] [STEP: connect] {}", e),
            }
        }
        UiMsg::CollectionsDue { connect_seq } => {
            if !state.wizard.is_current_connect(connect_seq) {
                debug!("[PHASE: tui] [STEP: collections] superseded by a newer connect");
                return;
            }
            let ticket = state.wizard.begin_list_collections();
            runner.list_collections(ticket);
        }
        UiMsg::CollectionsLoaded { ticket, result } => {
            if let Ok(Completion::Applied(_)) = state.wizard.finish_list_collections(ticket, result)
            {
                state.picker_cursor = 0;
            }
        }
        UiMsg::AnalyticsLoaded { ticket, result } => {
            if let Ok(Completion::Applied(_)) = state.wizard.finish_fetch_analytics(ticket, result)
            {
                state.results_scroll = 0;
            }
        }
    }
}

fn dispatch(runner: &dyn RequestRunner, work: Option<Dispatch>) {
    match work {
        Some(Dispatch::Connect(ticket)) => runner.connect(ticket),
        Some(Dispatch::FetchAnalytics(ticket)) => runner.analytics(ticket),
        None => {}
    }
}

fn handle_key(state: &mut TuiState, code: KeyCode, runner: &dyn RequestRunner) {
    if let Some(choice) = state.modal {
        match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                state.modal = Some(match choice {
                    QuitChoice::Quit => QuitChoice::Stay,
                    QuitChoice::Stay => QuitChoice::Quit,
                });
            }
            KeyCode::Enter => {
                state.modal = None;
                state.quit = choice == QuitChoice::Quit;
            }
            KeyCode::Esc => state.modal = None,
            _ => {}
        }
        return;
    }

    if code == KeyCode::Esc {
        state.modal = Some(QuitChoice::Stay);
        return;
    }

    match state.wizard.step() {
        Step::Connect => match code {
            KeyCode::Tab | KeyCode::Down => {
                state.focus = (state.focus + 1) % (FIELD_COUNT + 1);
            }
            KeyCode::BackTab | KeyCode::Up => {
                state.focus = (state.focus + FIELD_COUNT) % (FIELD_COUNT + 1);
            }
            KeyCode::Enter => {
                let form = state.form();
                let work = state.wizard.handle(WizardEvent::Connect(form));
                dispatch(runner, work);
            }
            other => {
                if state.focus < FIELD_COUNT {
                    state.fields[state.focus].handle_key(other);
                }
            }
        },
        Step::SelectCollection => {
            let count = state.wizard.collections().len();
            match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    state.picker_cursor = state.picker_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if state.picker_cursor + 1 < count {
                        state.picker_cursor += 1;
                    }
                }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    let work = state
                        .wizard
                        .handle(WizardEvent::SelectCollection(state.picker_cursor));
                    dispatch(runner, work);
                }
                KeyCode::Backspace | KeyCode::Left | KeyCode::Char('b') => {
                    state.wizard.handle(WizardEvent::Back);
                }
                _ => {}
            }
        }
        Step::ViewAnalytics => {
            let rows = match &state.screen().panel {
                AnalyticsPanel::Report(r) => r.rows.len(),
                _ => 0,
            };
            match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    state.results_scroll = state.results_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if state.results_scroll + 1 < rows {
                        state.results_scroll += 1;
                    }
                }
                KeyCode::Char('n') => {
                    state.wizard.handle(WizardEvent::NewAnalysis);
                    state.focus = HOST;
                }
                KeyCode::Backspace | KeyCode::Left | KeyCode::Char('b') => {
                    state.wizard.handle(WizardEvent::Back);
                    state.focus = HOST;
                }
                _ => {}
            }
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, state: &TuiState) {
    let window_area = centered_window(area, 100, 30);
    f.render_widget(
        Block::default().borders(Borders::ALL).title(WINDOW_TITLE),
        window_area,
    );

    let inner = window_area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(inner);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)].as_ref())
        .split(rows[0]);

    draw_steps_panel(f, cols[0], state);

    let step = state.screen().step;
    let content_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Step {}: {} ", step.number(), step.title()));
    let content = content_block.inner(cols[1]);
    f.render_widget(content_block, cols[1]);

    match step {
        Step::Connect => draw_connect_page(f, content, state),
        Step::SelectCollection => draw_picker_page(f, content, state),
        Step::ViewAnalytics => draw_analytics_page(f, content, state),
    }

    let hints = Paragraph::new(key_hints(step)).style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, rows[1]);

    if let Some(choice) = state.modal {
        draw_quit_modal(f, window_area, choice);
    }
}

fn key_hints(step: Step) -> &'static str {
    match step {
        Step::Connect => "Tab/Up/Down: move   Enter: connect   Esc: quit",
        Step::SelectCollection => "Up/Down: choose   Enter: analyze   b: back   Esc: quit",
        Step::ViewAnalytics => "Up/Down: scroll   n: new analysis   b: back   Esc: quit",
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn draw_steps_panel(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let current = state.screen().step;
    let mut lines = vec![Line::from(""), Line::from("  Customer Analytics"), Line::from("")];
    for step in Step::ALL {
        let (marker, style) = if step == current {
            (
                "\u{25b6}",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else if step.number() < current.number() {
            ("\u{2713}", Style::default().fg(Color::Green))
        } else {
            (" ", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(Span::styled(
            format!(" {} {}. {}", marker, step.number(), step.title()),
            style,
        )));
    }
    if let Some(details) = state.wizard.session().connection_details() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("  DB: {}", details.schema)));
        lines.push(Line::from(format!("  {}:{}", details.host, details.port)));
    }

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn status_style(kind: StatusKind) -> Style {
    match kind {
        StatusKind::Success => Style::default().fg(Color::Green),
        StatusKind::Error => Style::default().fg(Color::Red),
        StatusKind::Loading => Style::default().fg(Color::Yellow),
    }
}

fn draw_connect_page(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let screen = state.screen();
    let mut lines = vec![
        Line::from("Enter the connection details of the database to analyze."),
        Line::from(""),
    ];

    for (i, label) in FIELD_LABELS.iter().enumerate() {
        let focused = state.focus == i;
        let mut value = state.fields[i].display();
        if focused {
            value.push('_');
        }
        let style = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<10}", format!("{}:", label))),
            Span::styled(format!(" {:<40}", value), style),
        ]));
    }

    lines.push(Line::from(""));
    let label = if screen.busy {
        "Connecting..."
    } else {
        "Connect"
    };
    lines.push(Line::from(vec![
        Span::raw("  "),
        button_text(label, state.focus == CONNECT_BUTTON, !screen.busy),
    ]));

    lines.push(Line::from(""));
    if let Some((message, kind)) = &screen.status {
        lines.push(Line::from(Span::styled(
            format!("  {}", message),
            status_style(*kind),
        )));
    }

    let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_picker_page(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let screen = state.screen();
    let mut lines = vec![
        Line::from("Choose a table to analyze:"),
        Line::from(""),
    ];

    for (i, name) in screen.picker.iter().enumerate() {
        let cursor = if i == state.picker_cursor { ">" } else { " " };
        let selected = screen.selected == Some(i);
        let mut style = Style::default();
        if selected {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if i == state.picker_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let mark = if selected { "(x)" } else { "( )" };
        lines.push(Line::from(vec![
            Span::raw(format!(" {} ", cursor)),
            Span::styled(format!("{} {}", mark, name), style),
        ]));
    }

    let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

/// Foreground colour for a classification tag.
fn classification_color(tag: &str) -> Color {
    match tag {
        "active" => Color::Green,
        "new" => Color::Cyan,
        "at-risk" => Color::Yellow,
        "churned" => Color::Red,
        _ => Color::Reset,
    }
}

fn draw_analytics_page(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let report = match &state.screen().panel {
        AnalyticsPanel::Empty => return,
        AnalyticsPanel::Loading(collection) => {
            let p = Paragraph::new(Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("  {}", loading_message(collection)),
                    status_style(StatusKind::Loading),
                )),
            ]));
            f.render_widget(p, area);
            return;
        }
        AnalyticsPanel::Failed(message) => {
            let p = Paragraph::new(Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("  \u{2717} Error: {}", message),
                    status_style(StatusKind::Error),
                )),
            ]))
            .wrap(Wrap { trim: false });
            f.render_widget(p, area);
            return;
        }
        AnalyticsPanel::Report(report) => report,
    };

    if report.rows.is_empty() {
        let p = Paragraph::new(format!("  {}", no_data_message(&report.collection)));
        f.render_widget(p, area);
        return;
    }

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)].as_ref())
        .split(area);

    let summary = Paragraph::new(Text::from(vec![
        Line::from(format!("Table: {}", report.collection)),
        Line::from(format!("Total Customers Analyzed: {}", report.rows.len())),
        Line::from(format!("Analysis Date: {}", report.rendered_at_display())),
    ]));
    f.render_widget(summary, parts[0]);

    let header = Row::new(RESULT_COLUMNS.iter().map(|c| Cell::from(*c))).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = report
        .table_rows()
        .into_iter()
        .skip(state.results_scroll)
        .map(|r| {
            let id = match &r.customer_name {
                Some(name) => format!("{} ({})", r.customer_id, name),
                None => r.customer_id.clone(),
            };
            let class_style = Style::default().fg(classification_color(&r.classification_tag));
            Row::new(vec![
                Cell::from(id),
                Cell::from(r.total_orders),
                Cell::from(r.avg_order_gap),
                Cell::from(r.last_order_date),
                Cell::from(r.predicted_next_order_date),
                Cell::from(r.classification).style(class_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Percentage(18),
        Constraint::Percentage(12),
        Constraint::Percentage(16),
        Constraint::Percentage(17),
        Constraint::Percentage(17),
        Constraint::Percentage(20),
    ];
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    f.render_widget(table, parts[1]);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn draw_quit_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, choice: QuitChoice) {
    let modal_w = 48u16
        .min(window_area.width.saturating_sub(4))
        .max(30)
        .min(window_area.width);
    let modal_h = 6u16.min(window_area.height);
    let area = Rect {
        x: window_area.x + (window_area.width.saturating_sub(modal_w)) / 2,
        y: window_area.y + (window_area.height.saturating_sub(modal_h)) / 2,
        width: modal_w,
        height: modal_h,
    }
    .intersection(f.size());
    // Borders plus one button row need at least 3x3.
    if area.width < 3 || area.height < 3 {
        return;
    }

    f.render_widget(Clear, area);
    let body = Paragraph::new(Text::from(vec![
        Line::from("Leave the analytics wizard?"),
        Line::from(""),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Quit? "))
    .wrap(Wrap { trim: false });
    f.render_widget(body, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(2),
        width: area.width.saturating_sub(2),
        height: 1,
    };
    let line = Line::from(vec![
        button_text("Quit", choice == QuitChoice::Quit, true),
        Span::raw(" "),
        button_text("Stay", choice == QuitChoice::Stay, true),
    ]);
    f.render_widget(
        Paragraph::new(Text::from(line)).alignment(Alignment::Right),
        buttons_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WizardError;
    use std::cell::RefCell;

    #[derive(Debug)]
    enum Call {
        Connect(ConnectTicket),
        ScheduleCollections(u64),
        ListCollections(CollectionsTicket),
        Analytics(AnalyticsTicket),
    }

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Call>>,
    }

    impl RecordingRunner {
        fn take(&self) -> Vec<Call> {
            self.calls.borrow_mut().drain(..).collect()
        }
    }

    impl RequestRunner for RecordingRunner {
        fn connect(&self, ticket: ConnectTicket) {
            self.calls.borrow_mut().push(Call::Connect(ticket));
        }
        fn schedule_collections(&self, connect_seq: u64) {
            self.calls
                .borrow_mut()
                .push(Call::ScheduleCollections(connect_seq));
        }
        fn list_collections(&self, ticket: CollectionsTicket) {
            self.calls.borrow_mut().push(Call::ListCollections(ticket));
        }
        fn analytics(&self, ticket: AnalyticsTicket) {
            self.calls.borrow_mut().push(Call::Analytics(ticket));
        }
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn filled_state() -> TuiState {
        let mut state = TuiState::new(3306);
        state.fields[HOST].set("localhost");
        state.fields[USERNAME].set("root");
        state.fields[PASSWORD].set("pw");
        state.fields[SCHEMA].set("shop");
        state
    }

    #[test]
    fn text_input_edits_multibyte_text() {
        let mut input = TextInput::new("héllo", false);
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "hélo");
        input.handle_key(KeyCode::Home);
        input.handle_key(KeyCode::Delete);
        assert_eq!(input.value, "élo");
        input.handle_key(KeyCode::Char('ü'));
        assert_eq!(input.value, "üélo");
        assert_eq!(input.cursor, 1);
    }

    #[test]
    fn password_is_masked_on_screen() {
        let input = TextInput::new("s3cr3t", true);
        assert_eq!(input.display(), "******");
    }

    #[test]
    fn port_is_prefilled_from_config() {
        let state = TuiState::new(3307);
        assert_eq!(state.fields[PORT].value, "3307");
        assert!(state.fields[HOST].value.is_empty());
    }

    #[test]
    fn enter_with_missing_fields_dispatches_nothing() {
        let runner = RecordingRunner::default();
        let mut state = TuiState::new(3306);
        handle_key(&mut state, KeyCode::Enter, &runner);

        assert!(runner.take().is_empty());
        let (message, kind) = state.screen().status.clone().unwrap();
        assert_eq!(message, "Please fill in all fields");
        assert_eq!(kind, StatusKind::Error);
    }

    #[test]
    fn full_flow_through_messages() {
        let runner = RecordingRunner::default();
        let mut state = filled_state();

        handle_key(&mut state, KeyCode::Enter, &runner);
        let ticket = match runner.take().pop() {
            Some(Call::Connect(t)) => t,
            other => panic!("expected connect, got {:?}", other),
        };
        assert!(state.screen().busy);
        // A second Enter while busy is ignored.
        handle_key(&mut state, KeyCode::Enter, &runner);
        assert!(runner.take().is_empty());

        apply_message(
            &mut state,
            UiMsg::ConnectFinished {
                ticket,
                result: Ok(String::new()),
            },
            &runner,
        );
        let connect_seq = match runner.take().as_slice() {
            [Call::ScheduleCollections(seq)] => *seq,
            other => panic!("expected schedule, got {:?}", other),
        };

        apply_message(&mut state, UiMsg::CollectionsDue { connect_seq }, &runner);
        let ticket = match runner.take().pop() {
            Some(Call::ListCollections(t)) => t,
            other => panic!("expected listing, got {:?}", other),
        };
        apply_message(
            &mut state,
            UiMsg::CollectionsLoaded {
                ticket,
                result: Ok(vec!["orders".to_string(), "customers".to_string()]),
            },
            &runner,
        );
        assert_eq!(state.wizard.step(), Step::SelectCollection);

        handle_key(&mut state, KeyCode::Down, &runner);
        handle_key(&mut state, KeyCode::Enter, &runner);
        let ticket = match runner.take().pop() {
            Some(Call::Analytics(t)) => t,
            other => panic!("expected analytics, got {:?}", other),
        };
        assert_eq!(ticket.collection(), "customers");
        assert_eq!(state.screen().selected, Some(1));
        assert_eq!(
            state.screen().panel,
            AnalyticsPanel::Loading("customers".to_string())
        );

        apply_message(
            &mut state,
            UiMsg::AnalyticsLoaded {
                ticket,
                result: Ok(sample_rows()),
            },
            &runner,
        );
        assert!(matches!(state.screen().panel, AnalyticsPanel::Report(_)));
        assert_eq!(
            state.wizard.session().selected_collection(),
            Some("customers")
        );
    }

    #[test]
    fn failed_connect_schedules_no_listing() {
        let runner = RecordingRunner::default();
        let mut state = filled_state();
        handle_key(&mut state, KeyCode::Enter, &runner);
        let ticket = match runner.take().pop() {
            Some(Call::Connect(t)) => t,
            other => panic!("expected connect, got {:?}", other),
        };

        apply_message(
            &mut state,
            UiMsg::ConnectFinished {
                ticket,
                result: Err(WizardError::Transport("Request timed out".to_string())),
            },
            &runner,
        );
        assert!(runner.take().is_empty());
        assert!(!state.screen().busy);
        let (message, _) = state.screen().status.clone().unwrap();
        assert_eq!(message, "\u{2717} Request timed out");
    }

    #[test]
    fn listing_from_superseded_connect_is_dropped() {
        let runner = RecordingRunner::default();
        let mut state = filled_state();
        handle_key(&mut state, KeyCode::Enter, &runner);
        let first = match runner.take().pop() {
            Some(Call::Connect(t)) => t,
            other => panic!("expected connect, got {:?}", other),
        };
        apply_message(
            &mut state,
            UiMsg::ConnectFinished {
                ticket: first,
                result: Ok(String::new()),
            },
            &runner,
        );
        let connect_seq = match runner.take().as_slice() {
            [Call::ScheduleCollections(seq)] => *seq,
            other => panic!("expected schedule, got {:?}", other),
        };

        // Reconnect before the listing delay runs out; this attempt fails.
        handle_key(&mut state, KeyCode::Enter, &runner);
        let second = match runner.take().pop() {
            Some(Call::Connect(t)) => t,
            other => panic!("expected connect, got {:?}", other),
        };
        apply_message(
            &mut state,
            UiMsg::ConnectFinished {
                ticket: second,
                result: Err(WizardError::Http {
                    status: 400,
                    message: "Failed".to_string(),
                }),
            },
            &runner,
        );

        apply_message(&mut state, UiMsg::CollectionsDue { connect_seq }, &runner);
        assert!(runner.take().is_empty());
        assert_eq!(state.wizard.step(), Step::Connect);
        let (message, kind) = state.screen().status.clone().unwrap();
        assert_eq!(message, "\u{2717} Failed");
        assert_eq!(kind, StatusKind::Error);
    }

    #[test]
    fn back_from_analytics_clears_picker_mark() {
        let runner = RecordingRunner::default();
        let mut state = new_smoke_state(SmokeTarget::Analytics, 3306);
        assert_eq!(state.screen().selected, Some(1));

        handle_key(&mut state, KeyCode::Char('b'), &runner);
        assert_eq!(state.wizard.step(), Step::Connect);
        assert_eq!(state.screen().selected, None);
        assert!(state.wizard.session().selected_collection().is_none());
    }

    #[test]
    fn escape_opens_quit_modal() {
        let runner = RecordingRunner::default();
        let mut state = TuiState::new(3306);

        handle_key(&mut state, KeyCode::Esc, &runner);
        assert_eq!(state.modal, Some(QuitChoice::Stay));
        handle_key(&mut state, KeyCode::Enter, &runner);
        assert!(!state.quit);

        handle_key(&mut state, KeyCode::Esc, &runner);
        handle_key(&mut state, KeyCode::Tab, &runner);
        handle_key(&mut state, KeyCode::Enter, &runner);
        assert!(state.quit);
    }

    #[test]
    fn smoke_targets_parse() {
        assert_eq!(SmokeTarget::parse("").unwrap(), SmokeTarget::Connect);
        assert_eq!(
            SmokeTarget::parse(" Collections ").unwrap(),
            SmokeTarget::Collections
        );
        assert_eq!(SmokeTarget::parse("results").unwrap(), SmokeTarget::Analytics);
        assert!(SmokeTarget::parse("install").is_err());
    }

    #[test]
    fn smoke_frames_show_each_page() {
        let text = buffer_text(&render_to_buffer(&new_smoke_state(SmokeTarget::Connect, 3306), 100, 30).unwrap());
        assert!(text.contains("Connect to Database"));
        assert!(text.contains("******"));
        assert!(!text.contains("secret"));

        let text = buffer_text(
            &render_to_buffer(&new_smoke_state(SmokeTarget::Collections, 3306), 100, 30).unwrap(),
        );
        assert!(text.contains("payments"));

        let text = buffer_text(
            &render_to_buffer(&new_smoke_state(SmokeTarget::Analytics, 3306), 100, 30).unwrap(),
        );
        assert!(text.contains("C-1003"));
        assert!(text.contains("N/A"));
        assert!(text.contains("Total Customers Analyzed: 4"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut state = new_smoke_state(SmokeTarget::Analytics, 3306);
        render_to_buffer(&state, 40, 10).unwrap();

        state.modal = Some(QuitChoice::Stay);
        for (width, height) in [(24, 10), (80, 4)] {
            render_to_buffer(&state, width, height).unwrap();
        }
        let text = buffer_text(&render_to_buffer(&state, 100, 30).unwrap());
        assert!(text.contains("Leave the analytics wizard?"));
    }
}

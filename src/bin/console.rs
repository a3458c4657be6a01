//! Themis Console - Interactive Evaluation Form
//!
//! Terminal UI over the shared evaluation pipeline:
//! - Paste or load a conversation and submit it for evaluation
//! - Browse the evaluation log
//! - Audit flagged conversations over an IST window and export them
//!
//! Requires GROQ_API_KEY in the environment; evaluations are appended to the
//! same CSV log the HTTP server uses.
//!
//! Usage:
//!   themis-console [OPTIONS]
//!
//! Examples:
//!   themis-console                       # chat_summary_log.csv in the cwd
//!   themis-console --log support.csv     # explicit log file

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use themis_core::{
    audit::{self, AuditWindow},
    config::ThemisConfig,
    pipeline::Evaluator,
    storage::EvaluationStore,
    tokens::estimate_tokens,
    types::EvaluationRecord,
};
use tokio::sync::mpsc;
use tracing::{debug, error, Level};
use tracing_subscriber::EnvFilter;

/// Seeded audit bounds are rendered with this format, which the bound
/// parser accepts back unchanged.
const SEED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Console CLI arguments
#[derive(Parser)]
#[command(name = "themis-console")]
#[command(about = "Interactive evaluation console for support chats")]
#[command(version)]
struct Args {
    /// Evaluation log path (overrides THEMIS_STORE__PATH env var and config)
    #[arg(long)]
    log: Option<String>,

    /// Configuration file (defaults to themis.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Which screen is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Form,
    Records,
    Audit,
}

impl View {
    fn next(self) -> Self {
        match self {
            View::Form => View::Records,
            View::Records => View::Audit,
            View::Audit => View::Form,
        }
    }

    fn prev(self) -> Self {
        match self {
            View::Form => View::Audit,
            View::Records => View::Form,
            View::Audit => View::Records,
        }
    }
}

fn char_count(line: &str) -> usize {
    line.chars().count()
}

/// Byte offset of the `col`-th character of `line`.
fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
}

fn truncate(s: &str, max_len: usize) -> String {
    if char_count(s) > max_len {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Multi-line input buffer for the conversation form.
///
/// Cursor positions are char offsets into the current line.
struct FormBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl FormBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn set_text(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.row = self.lines.len() - 1;
        self.col = char_count(&self.lines[self.row]);
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.row = 0;
        self.col = 0;
    }

    fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    fn insert_char(&mut self, c: char) {
        let at = byte_index(&self.lines[self.row], self.col);
        self.lines[self.row].insert(at, c);
        self.col += 1;
    }

    fn insert_newline(&mut self) {
        let at = byte_index(&self.lines[self.row], self.col);
        let rest = self.lines[self.row].split_off(at);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            let at = byte_index(&self.lines[self.row], self.col - 1);
            self.lines[self.row].remove(at);
            self.col -= 1;
        } else if self.row > 0 {
            let tail = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_count(&self.lines[self.row]);
            self.lines[self.row].push_str(&tail);
        }
    }

    fn delete(&mut self) {
        if self.col < char_count(&self.lines[self.row]) {
            let at = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(at);
        } else if self.row + 1 < self.lines.len() {
            let tail = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&tail);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return;
        }
        match key.code {
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Enter => self.insert_newline(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = char_count(&self.lines[self.row]);
                }
            }
            KeyCode::Right => {
                if self.col < char_count(&self.lines[self.row]) {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
            }
            KeyCode::Up => {
                if self.row > 0 {
                    self.row -= 1;
                    self.col = self.col.min(char_count(&self.lines[self.row]));
                }
            }
            KeyCode::Down => {
                if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = self.col.min(char_count(&self.lines[self.row]));
                }
            }
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = char_count(&self.lines[self.row]),
            _ => {}
        }
    }
}

/// Where a confirmed prompt value goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    LoadFile,
    WindowStart,
    WindowEnd,
}

/// Single-line modal input
struct Prompt {
    kind: PromptKind,
    title: &'static str,
    input: String,
    cursor: usize,
    submitted: bool,
}

impl Prompt {
    fn new(kind: PromptKind, title: &'static str) -> Self {
        Self {
            kind,
            title,
            input: String::new(),
            cursor: 0,
            submitted: false,
        }
    }

    fn with_default(mut self, default: impl Into<String>) -> Self {
        self.input = default.into();
        self.cursor = char_count(&self.input);
        self
    }

    /// Handle keyboard input.
    /// Returns true if the prompt should close.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = byte_index(&self.input, self.cursor);
                self.input.insert(at, c);
                self.cursor += 1;
                false
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = byte_index(&self.input, self.cursor - 1);
                    self.input.remove(at);
                    self.cursor -= 1;
                }
                false
            }
            KeyCode::Delete => {
                if self.cursor < char_count(&self.input) {
                    let at = byte_index(&self.input, self.cursor);
                    self.input.remove(at);
                }
                false
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(char_count(&self.input));
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = char_count(&self.input);
                false
            }
            KeyCode::Enter => {
                self.submitted = true;
                true
            }
            KeyCode::Esc => true,
            _ => false,
        }
    }

    fn render(&self, f: &mut Frame, area: Rect) {
        let width = area.width.min(64);
        let height = area.height.min(7);

        // Center dialog
        let dialog = Rect {
            x: (area.width.saturating_sub(width)) / 2,
            y: (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };

        f.render_widget(Clear, dialog);

        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(dialog);
        f.render_widget(block, dialog);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Input
                Constraint::Length(1), // Hint
            ])
            .split(inner);

        let input_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        let input_inner = input_block.inner(chunks[0]);
        f.render_widget(input_block, chunks[0]);
        f.render_widget(Paragraph::new(self.input.as_str()), input_inner);

        let cursor_x = input_inner.x + self.cursor as u16;
        if cursor_x < input_inner.x + input_inner.width {
            f.set_cursor_position((cursor_x, input_inner.y));
        }

        let hint = Paragraph::new("Enter: Confirm | Esc: Cancel")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[1]);
    }
}

/// One evaluation outcome coming back from a submit task
type SubmitOutcome = std::result::Result<EvaluationRecord, String>;

/// Application state
struct App {
    view: View,
    form: FormBuffer,
    /// A submission is in flight
    busy: bool,
    /// Most recent successful evaluation
    last: Option<EvaluationRecord>,
    /// Most recent submission failure
    error: Option<String>,
    /// Transient message shown in the footer until the next key
    status: Option<String>,
    records: Vec<EvaluationRecord>,
    records_scroll: usize,
    audit_scroll: usize,
    start_text: String,
    end_text: String,
    window: AuditWindow,
    window_error: Option<String>,
    prompt: Option<Prompt>,
    evaluator: Arc<Evaluator>,
    store: Arc<dyn EvaluationStore>,
    result_tx: mpsc::UnboundedSender<SubmitOutcome>,
    result_rx: mpsc::UnboundedReceiver<SubmitOutcome>,
}

impl App {
    fn new(evaluator: Arc<Evaluator>) -> Self {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let store = evaluator.store();
        Self {
            view: View::Form,
            form: FormBuffer::new(),
            busy: false,
            last: None,
            error: None,
            status: None,
            records: Vec::new(),
            records_scroll: 0,
            audit_scroll: 0,
            start_text: String::new(),
            end_text: String::new(),
            window: AuditWindow::unbounded(),
            window_error: None,
            prompt: None,
            evaluator,
            store,
            result_tx,
            result_rx,
        }
    }

    /// Submit the form contents on a background task. An empty form is
    /// reported inline without spawning anything.
    fn submit(&mut self) {
        if self.busy {
            return;
        }
        if self.form.is_empty() {
            self.error = Some("Conversation is required".to_string());
            return;
        }
        self.busy = true;
        self.error = None;

        let conversation = self.form.text();
        let evaluator = Arc::clone(&self.evaluator);
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let outcome = evaluator
                .evaluate(&conversation)
                .await
                .map_err(|e| e.to_string());
            // Receiver lives as long as the app
            let _ = tx.send(outcome);
        });
    }

    /// Drain finished submissions from the channel
    fn process_results(&mut self) {
        while let Ok(outcome) = self.result_rx.try_recv() {
            self.busy = false;
            match outcome {
                Ok(record) => {
                    self.records.push(record.clone());
                    self.last = Some(record);
                    self.error = None;
                    self.status = Some("Evaluation logged".to_string());
                }
                Err(message) => self.error = Some(message),
            }
        }
    }

    async fn refresh_records(&mut self) {
        match self.store.read_all().await {
            Ok(records) => {
                self.records = records;
                self.records_scroll = self
                    .records_scroll
                    .min(self.records.len().saturating_sub(1));
                self.status = Some(format!("Loaded {} evaluation(s)", self.records.len()));
            }
            Err(e) => self.status = Some(format!("Reload failed: {}", e)),
        }
    }

    async fn switch_view(&mut self, view: View) {
        self.view = view;
        if self.view != View::Form {
            self.refresh_records().await;
        }
        if self.view == View::Audit {
            self.seed_bounds_if_empty();
        }
    }

    /// Default the audit window to the span of flagged records
    fn seed_bounds_if_empty(&mut self) {
        if !self.start_text.is_empty() || !self.end_text.is_empty() {
            return;
        }
        let flagged = audit::flagged(&self.records);
        if let Some((first, last)) = audit::seed_window(&flagged) {
            self.start_text = first.format(SEED_FORMAT).to_string();
            self.end_text = last.format(SEED_FORMAT).to_string();
            self.rebuild_window();
        }
    }

    fn rebuild_window(&mut self) {
        let start = (!self.start_text.is_empty()).then_some(self.start_text.as_str());
        let end = (!self.end_text.is_empty()).then_some(self.end_text.as_str());
        match AuditWindow::from_bounds(start, end) {
            Ok(window) => {
                self.window = window;
                self.window_error = None;
            }
            Err(e) => self.window_error = Some(e.to_string()),
        }
    }

    fn export(&mut self) {
        let rows = self.window.filter(&self.records);
        match audit::export_report(&rows, Path::new(audit::EXPORT_FILE_NAME)) {
            Ok(()) => {
                self.status = Some(format!(
                    "Exported {} row(s) to {}",
                    rows.len(),
                    audit::EXPORT_FILE_NAME
                ));
            }
            Err(e) => self.status = Some(format!("Export failed: {}", e)),
        }
    }

    fn apply_prompt(&mut self, prompt: Prompt) {
        if !prompt.submitted {
            return;
        }
        let value = prompt.input.trim().to_string();
        match prompt.kind {
            PromptKind::LoadFile => match std::fs::read_to_string(&value) {
                Ok(text) => {
                    self.form.set_text(&text);
                    self.status = Some(format!("Loaded {}", value));
                }
                Err(e) => self.status = Some(format!("Cannot read {}: {}", value, e)),
            },
            PromptKind::WindowStart => {
                self.start_text = value;
                self.rebuild_window();
            }
            PromptKind::WindowEnd => {
                self.end_text = value;
                self.rebuild_window();
            }
        }
    }

    /// Handle keyboard input.
    /// Returns true if the console should exit.
    async fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.status = None;

        // An open prompt swallows every key
        if self.prompt.is_some() {
            let closed = self
                .prompt
                .as_mut()
                .map(|prompt| prompt.handle_key(key))
                .unwrap_or(false);
            if closed {
                if let Some(prompt) = self.prompt.take() {
                    self.apply_prompt(prompt);
                }
            }
            return false;
        }

        // View switching and quit work everywhere
        match key.code {
            KeyCode::Tab => {
                self.switch_view(self.view.next()).await;
                return false;
            }
            KeyCode::BackTab => {
                self.switch_view(self.view.prev()).await;
                return false;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return true;
            }
            _ => {}
        }

        match self.view {
            View::Form => match key.code {
                KeyCode::Esc => return true,
                KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.submit();
                }
                KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.prompt = Some(Prompt::new(PromptKind::LoadFile, "Load conversation file"));
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.form.clear();
                }
                _ => self.form.handle_key(key),
            },
            View::Records => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Char('r') => self.refresh_records().await,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.records_scroll = self.records_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.records_scroll =
                        (self.records_scroll + 1).min(self.records.len().saturating_sub(1));
                }
                KeyCode::PageUp => {
                    self.records_scroll = self.records_scroll.saturating_sub(10);
                }
                KeyCode::PageDown => {
                    self.records_scroll =
                        (self.records_scroll + 10).min(self.records.len().saturating_sub(1));
                }
                KeyCode::Home => self.records_scroll = 0,
                _ => {}
            },
            View::Audit => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Char('r') => self.refresh_records().await,
                KeyCode::Char('s') => {
                    self.prompt = Some(
                        Prompt::new(PromptKind::WindowStart, "Audit window start (IST)")
                            .with_default(self.start_text.clone()),
                    );
                }
                KeyCode::Char('e') => {
                    self.prompt = Some(
                        Prompt::new(PromptKind::WindowEnd, "Audit window end (IST)")
                            .with_default(self.end_text.clone()),
                    );
                }
                KeyCode::Char('c') => {
                    self.start_text.clear();
                    self.end_text.clear();
                    self.rebuild_window();
                }
                KeyCode::Char('x') => self.export(),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.audit_scroll = self.audit_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let len = self.window.filter(&self.records).len();
                    self.audit_scroll = (self.audit_scroll + 1).min(len.saturating_sub(1));
                }
                KeyCode::Home => self.audit_scroll = 0,
                _ => {}
            },
        }
        false
    }
}

fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::Form => draw_form(f, app),
        View::Records => draw_records(f, app),
        View::Audit => draw_audit(f, app),
    }

    if let Some(prompt) = &app.prompt {
        prompt.render(f, f.area());
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let tab = |view: View, label: &'static str| {
        if app.view == view {
            Span::styled(
                label,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(label, Style::default().fg(Color::Gray))
        }
    };
    let line = Line::from(vec![
        Span::styled(
            "⚖ Themis Console",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        tab(View::Form, "Evaluate"),
        Span::raw(" | "),
        tab(View::Records, "Records"),
        Span::raw(" | "),
        tab(View::Audit, "Audit"),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let footer_text = match (&app.status, app.view) {
        (Some(status), _) => status.clone(),
        (None, View::Form) => {
            "Ctrl+S: Submit | Ctrl+O: Load file | Ctrl+U: Clear | Tab: Views | Esc: Quit"
                .to_string()
        }
        (None, View::Records) => "r: Reload | ↑↓: Scroll | Tab: Views | q: Quit".to_string(),
        (None, View::Audit) => {
            "s/e: Bounds | c: Clear bounds | x: Export | r: Reload | Tab: Views | q: Quit"
                .to_string()
        }
    };
    let footer = Paragraph::new(footer_text).style(Style::default().fg(Color::Gray));
    f.render_widget(footer, area);
}

fn draw_form(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Editor
            Constraint::Length(9), // Last result
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    let text = app.form.text();
    let editor_title = format!(
        "Conversation ({} chars, ~{} tokens)",
        char_count(&text),
        estimate_tokens(&text)
    );
    let editor_block = Block::default().title(editor_title).borders(Borders::ALL);
    let inner = editor_block.inner(chunks[1]);

    // Keep the cursor row in view
    let scroll = app
        .form
        .row
        .saturating_sub(inner.height.saturating_sub(1) as usize) as u16;
    let editor = Paragraph::new(text).block(editor_block).scroll((scroll, 0));
    f.render_widget(editor, chunks[1]);

    let cursor_x = inner.x + app.form.col as u16;
    let cursor_y = inner.y + (app.form.row as u16).saturating_sub(scroll);
    if cursor_x < inner.x + inner.width && cursor_y < inner.y + inner.height {
        f.set_cursor_position((cursor_x, cursor_y));
    }

    draw_result_panel(f, chunks[2], app);
    draw_footer(f, chunks[3], app);
}

fn draw_result_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = if app.busy {
        vec![Line::from(Span::styled(
            "Evaluating...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))]
    } else if let Some(error) = &app.error {
        vec![Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ))]
    } else if let Some(record) = &app.last {
        let flag_line = if record.agent_reported {
            Line::from(Span::styled(
                "⚠ Agent asked for sensitive information",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
        } else {
            Line::from(Span::styled(
                "No policy violations",
                Style::default().fg(Color::Green),
            ))
        };
        vec![
            Line::from(format!("Summary: {}", truncate(&record.summary, 110))),
            Line::from(format!(
                "Behavior:     {}/5  {}",
                record.behavior_score,
                truncate(&record.behavior_text, 90)
            )),
            Line::from(format!(
                "Conversation: {}/5  {}",
                record.conversation_score,
                truncate(&record.conversation_text, 90)
            )),
            Line::from(format!(
                "Know-how:     {}/5  {}",
                record.knowhow_score,
                truncate(&record.knowhow_text, 90)
            )),
            flag_line,
            Line::from(Span::styled(
                format!("Logged {} {} IST", record.date_ist, record.time_ist),
                Style::default().fg(Color::Gray),
            )),
        ]
    } else {
        vec![Line::from(Span::styled(
            "Paste a conversation and press Ctrl+S to evaluate",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))]
    };

    let panel = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Last Evaluation")
            .borders(Borders::ALL),
    );
    f.render_widget(panel, area);
}

fn render_record_table(
    f: &mut Frame,
    area: Rect,
    records: &[EvaluationRecord],
    scroll: usize,
    title: String,
) {
    let visible = area.height.saturating_sub(3) as usize;

    // Newest first
    let rows: Vec<Row> = records
        .iter()
        .rev()
        .skip(scroll)
        .take(visible)
        .map(|record| {
            let flag = if record.agent_reported {
                Cell::from("YES").style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            } else {
                Cell::from("")
            };
            Row::new(vec![
                Cell::from(record.date_ist.to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(record.time_ist.to_string()),
                Cell::from(record.behavior_score.to_string()),
                Cell::from(record.conversation_score.to_string()),
                Cell::from(record.knowhow_score.to_string()),
                flag,
                Cell::from(truncate(&record.summary, 80)),
            ])
        })
        .collect();

    let header = Row::new(vec!["Date (IST)", "Time", "B", "C", "K", "Flag", "Summary"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let widths = [
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .column_spacing(1);

    f.render_widget(table, area);
}

fn draw_records(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Log table
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    let title = if app.records_scroll > 0 {
        format!(
            "Evaluation Log (↑ {} hidden, {} total)",
            app.records_scroll,
            app.records.len()
        )
    } else {
        format!("Evaluation Log ({} total)", app.records.len())
    };
    render_record_table(f, chunks[1], &app.records, app.records_scroll, title);

    draw_footer(f, chunks[2], app);
}

fn draw_audit(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Window bounds
            Constraint::Min(5),    // Flagged table
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    let start = if app.start_text.is_empty() {
        "(open)"
    } else {
        app.start_text.as_str()
    };
    let end = if app.end_text.is_empty() {
        "(open)"
    } else {
        app.end_text.as_str()
    };
    let bounds_line = match &app.window_error {
        Some(error) => Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(format!("From {} to {}", start, end)),
    };
    let bounds = Paragraph::new(bounds_line).block(
        Block::default()
            .title("Audit Window (IST)")
            .borders(Borders::ALL),
    );
    f.render_widget(bounds, chunks[1]);

    let flagged = app.window.filter(&app.records);
    let title = format!("Flagged Conversations ({} in window)", flagged.len());
    render_record_table(f, chunks[2], &flagged, app.audit_scroll, title);

    draw_footer(f, chunks[3], app);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (to file, not the terminal we are drawing on)
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "themis_console={}",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open("/tmp/themis-console.log")
                .unwrap()
        })
        .init();

    debug!("Console v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = ThemisConfig::load(args.config.as_deref())?;
    if let Some(ref log) = args.log {
        config.store.path = PathBuf::from(log);
    }
    debug!("Evaluation log: {}", config.store.path.display());

    let evaluator = Arc::new(Evaluator::from_config(&config)?);
    let mut app = App::new(evaluator);
    app.store.initialize().await?;
    app.refresh_records().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("Error: {:?}", err);
        return Err(err);
    }

    debug!("Console exiting cleanly");
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key).await {
                    return Ok(());
                }
            }
        }

        // Collect finished submissions
        app.process_results();
    }
}

//! Ratatui-based terminal UI.
//!
//! The TUI is a small form (rent, start date, index, periodicity, deflation
//! lock). Enter runs the same pipeline as `readjust calc` and renders the
//! result, the month-by-month breakdown and a chart of the cumulative factor.

use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{DEBUG_DIR, open_source, parse_rent, parse_start_date, pipeline, settings_from_args};
use crate::cli::{SourceArgs, TuiArgs};
use crate::config::Settings;
use crate::data::SeriesSource;
use crate::domain::{IndexKey, Periodicity, Readjustment, ReadjustmentRequest};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::report::{fmt_brl, fmt_date, fmt_factor, fmt_month, fmt_percent, fmt_value};

mod plotters_chart;

use plotters_chart::FactorChart;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    let settings = settings_from_args(&args.source)?;
    let mut app = App::new(Form::from_args(&args), settings, args.source)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(EXIT_RUNTIME, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

const FIELD_RENT: usize = 0;
const FIELD_START: usize = 1;
const FIELD_INDEX: usize = 2;
const FIELD_PERIODICITY: usize = 3;
const FIELD_LOCK: usize = 4;
const FIELD_COUNT: usize = 5;

/// Form state, exactly as typed.
#[derive(Debug, Clone, PartialEq)]
struct Form {
    rent: String,
    start: String,
    index: IndexKey,
    periodicity: Periodicity,
    lock_deflation: bool,
}

impl Form {
    fn from_args(args: &TuiArgs) -> Self {
        Self {
            rent: args.rent.clone().unwrap_or_default(),
            start: args.start.clone().unwrap_or_default(),
            index: args.index,
            periodicity: args.periodicity,
            lock_deflation: args.lock_deflation,
        }
    }

    fn request(&self) -> Result<ReadjustmentRequest, AppError> {
        Ok(ReadjustmentRequest {
            principal: parse_rent(&self.rent)?,
            start_date: parse_start_date(&self.start)?,
            periodicity: self.periodicity,
            series: self.index.descriptor(),
            lock_deflation: self.lock_deflation,
        })
    }
}

/// What the result panel shows.
#[derive(Debug, Clone)]
enum Outcome {
    Empty,
    Done {
        request: ReadjustmentRequest,
        readjustment: Readjustment,
    },
    Failed(String),
}

struct App {
    form: Form,
    selected_field: usize,
    settings: Settings,
    source_args: SourceArgs,
    /// Network source, kept across calculations so its cache survives.
    network: Option<Box<dyn SeriesSource>>,
    busy: bool,
    status: String,
    outcome: Outcome,
}

impl App {
    fn new(form: Form, settings: Settings, source_args: SourceArgs) -> Result<Self, AppError> {
        let network = match source_args.offline_file {
            Some(_) => None,
            None => Some(pipeline::build_source(&settings, None)?),
        };
        Ok(Self::with_parts(form, settings, source_args, network))
    }

    fn with_parts(
        form: Form,
        settings: Settings,
        source_args: SourceArgs,
        network: Option<Box<dyn SeriesSource>>,
    ) -> Self {
        Self {
            form,
            selected_field: FIELD_RENT,
            settings,
            source_args,
            network,
            busy: false,
            status: "Fill in rent and start date, then press Enter.".to_string(),
            outcome: Outcome::Empty,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            // The "Calculating..." frame is on screen; now do the blocking work.
            if self.busy {
                self.calculate();
                discard_pending_events()?;
                needs_redraw = true;
                continue;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.busy {
            return false;
        }

        match code {
            KeyCode::Esc => return true,
            KeyCode::Char(c) if self.accepts_char(c) => {
                if let Some(s) = self.text_field_mut() {
                    s.push(c);
                }
            }
            KeyCode::Char('q') => return true,
            KeyCode::Char('d') => self.write_debug(),
            KeyCode::Char(' ') if self.selected_field == FIELD_LOCK => self.adjust_field(1),
            KeyCode::Backspace => {
                if let Some(s) = self.text_field_mut() {
                    s.pop();
                }
            }
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down | KeyCode::Tab => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => self.begin_calculation(),
            _ => {}
        }
        false
    }

    fn accepts_char(&self, c: char) -> bool {
        match self.selected_field {
            FIELD_RENT => c.is_ascii_digit() || matches!(c, '.' | ',' | 'R' | '$' | ' '),
            FIELD_START => c.is_ascii_digit() || matches!(c, '/' | '-'),
            _ => false,
        }
    }

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.selected_field {
            FIELD_RENT => Some(&mut self.form.rent),
            FIELD_START => Some(&mut self.form.start),
            _ => None,
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            FIELD_INDEX => {
                self.form.index = if delta >= 0 {
                    self.form.index.next()
                } else {
                    self.form.index.prev()
                };
                self.status = format!("index: {}", self.form.index.display_name());
            }
            FIELD_PERIODICITY => {
                self.form.periodicity = self.form.periodicity.toggle();
                self.status = format!("periodicity: {}", self.form.periodicity.display_name());
            }
            FIELD_LOCK => {
                self.form.lock_deflation = !self.form.lock_deflation;
                self.status = format!("deflation lock: {}", on_off(self.form.lock_deflation));
            }
            _ => {}
        }
    }

    /// Clear the previous result and mark the app busy; the loop draws once before calculating.
    fn begin_calculation(&mut self) {
        self.outcome = Outcome::Empty;
        self.busy = true;
        self.status = "Calculating...".to_string();
    }

    fn calculate(&mut self) {
        self.outcome = match self.run_form() {
            Ok((request, readjustment)) => {
                self.status = format!(
                    "Done: {} ({} month(s), {} observation(s)).",
                    fmt_brl(readjustment.result.new_principal),
                    readjustment.diagnostics.period.month_count(),
                    readjustment.result.observations_used.len()
                );
                Outcome::Done { request, readjustment }
            }
            Err(err) => {
                self.status = "Calculation failed.".to_string();
                Outcome::Failed(err.to_string())
            }
        };
        self.busy = false;
    }

    fn run_form(&self) -> Result<(ReadjustmentRequest, Readjustment), AppError> {
        let request = self.form.request()?;
        let readjustment = match &self.network {
            Some(source) => pipeline::run_readjustment(&request, source.as_ref())?,
            None => {
                let source = open_source(&self.settings, &self.source_args, &request.series)?;
                pipeline::run_readjustment(&request, source.as_ref())?
            }
        };
        Ok((request, readjustment))
    }

    fn write_debug(&mut self) {
        let Outcome::Done { request, readjustment } = &self.outcome else {
            self.status = "Nothing to write yet: run a calculation first.".to_string();
            return;
        };
        match crate::debug::write_debug_bundle(Path::new(DEBUG_DIR), request, readjustment, &self.source_label()) {
            Ok(path) => self.status = format!("Wrote debug bundle: {}", path.display()),
            Err(err) => self.status = format!("Debug write failed: {err}"),
        }
    }

    fn source_label(&self) -> String {
        match (&self.network, &self.source_args.offline_file) {
            (Some(source), _) => source.describe(),
            (None, Some(path)) => format!("offline file {}", path.display()),
            (None, None) => "-".to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled("readjust", Style::default().fg(Color::Cyan)),
            Span::raw(" - rent readjustment by price index | source: "),
            Span::styled(self.source_label(), Style::default().fg(Color::Gray)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(0)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(columns[0]);
        self.draw_form(frame, left[0]);
        self.draw_result(frame, left[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);
        self.draw_chart(frame, right[0]);
        self.draw_breakdown(frame, right[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items = vec![
            ListItem::new(format!("Rent:        {}", placeholder(&self.form.rent, "R$ 0,00"))),
            ListItem::new(format!("Start date:  {}", placeholder(&self.form.start, "dd/mm/yyyy"))),
            ListItem::new(format!("Index:       ◀ {} ▶", self.form.index.display_name())),
            ListItem::new(format!("Periodicity: ◀ {} ▶", self.form.periodicity.display_name())),
            ListItem::new(format!("Lock deflation: [{}]", if self.form.lock_deflation { "x" } else { " " })),
        ];

        let list = List::new(items)
            .block(Block::default().title("Contract").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_result(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Result").borders(Borders::ALL);

        let text = match &self.outcome {
            Outcome::Empty if self.busy => Text::from(Span::styled(
                "Calculating...",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Outcome::Empty => Text::from(Span::styled("No result yet.", Style::default().fg(Color::Gray))),
            Outcome::Failed(message) => Text::from(Span::styled(message.clone(), Style::default().fg(Color::Red))),
            Outcome::Done { request, readjustment } => result_lines(request, readjustment),
        };

        let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Cumulative factor").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Outcome::Done { readjustment, .. } = &self.outcome else {
            let msg = Paragraph::new("Waiting for a calculation...").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let series = chart_series(readjustment);
        let widget = FactorChart {
            points: &series.points,
            months: &series.months,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "month",
            y_label: "factor".to_string(),
        };
        frame.render_widget(widget, inner);
    }

    fn draw_breakdown(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = match &self.outcome {
            Outcome::Done { readjustment, .. } => readjustment
                .breakdown
                .iter()
                .map(|line| {
                    ListItem::new(format!(
                        "{}: {:>12}   x{}",
                        fmt_month(line.month),
                        fmt_value(line.value, line.kind),
                        fmt_factor(line.cumulative_factor)
                    ))
                })
                .collect(),
            _ => Vec::new(),
        };
        let list = List::new(items).block(Block::default().title("Breakdown").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ field  type to edit  ←/→ change  Enter calculate  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Drop key presses that arrived while a calculation was blocking the loop.
fn discard_pending_events() -> Result<(), AppError> {
    while event::poll(Duration::ZERO).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))? {
        event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))?;
    }
    Ok(())
}

fn result_lines(request: &ReadjustmentRequest, readjustment: &Readjustment) -> Text<'static> {
    let r = &readjustment.result;
    let d = &readjustment.diagnostics;
    let mut lines = vec![
        Line::from(format!("Current rent:  {}", fmt_brl(request.principal))),
        Line::from(Span::styled(
            format!("New rent:      {}", fmt_brl(r.new_principal)),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Variation:     {}", fmt_percent(r.variation_percent))),
        Line::from(format!("Factor:        {}", fmt_factor(r.factor))),
        Line::from(format!("Effective on:  {}", fmt_date(r.effective_date))),
        Line::from(format!(
            "Period:        {} to {}",
            fmt_month(d.period.start_month),
            fmt_month(d.period.end_month)
        )),
        Line::from(format!("Index:         {}", d.series_label)),
    ];
    if d.lock_deflation && d.raw_factor < d.applied_factor {
        lines.push(Line::from(Span::styled(
            format!("Deflation lock applied (raw {})", fmt_factor(d.raw_factor)),
            Style::default().fg(Color::Yellow),
        )));
    }
    if !d.dropped.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} row(s) discarded", d.dropped.len()),
            Style::default().fg(Color::Gray),
        )));
    }
    Text::from(lines)
}

fn placeholder<'a>(value: &'a str, hint: &'a str) -> &'a str {
    if value.is_empty() { hint } else { value }
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

/// Chart data for one calculation.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    points: Vec<(f64, f64)>,
    months: Vec<String>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Cumulative factor per breakdown month, x = month position.
fn chart_series(readjustment: &Readjustment) -> ChartSeries {
    let points: Vec<(f64, f64)> = readjustment
        .breakdown
        .iter()
        .enumerate()
        .map(|(i, line)| (i as f64, line.cumulative_factor))
        .collect();
    let months = readjustment.breakdown.iter().map(|line| fmt_month(line.month)).collect();

    let x_max = (points.len().saturating_sub(1) as f64).max(1.0);

    // Always show the 1.0 baseline.
    let (mut y_min, mut y_max) = (1.0_f64, 1.0_f64);
    for &(_, y) in &points {
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    let pad = ((y_max - y_min) * 0.05).max(1e-4);

    ChartSeries {
        points,
        months,
        x_bounds: [0.0, x_max],
        y_bounds: [y_min - pad, y_max + pad],
    }
}

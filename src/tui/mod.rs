//! Ratatui-based terminal UI.
//!
//! The TUI lists the workbook's conditions and renders, for the selected one,
//! the replicate fits, the averaged fits of all conditions, or the initial-rate
//! lines. The initial-rate window can be adjusted live; fits are recomputed from
//! the already parsed data.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{run_analysis, run_analysis_on};
use crate::cli::AnalysisArgs;
use crate::domain::{AnalysisConfig, RunOutput, TIME_COLUMN};
use crate::error::AppError;
use crate::models::{decay_curve, line_curve};
use crate::plot::Palette;

mod plotters_chart;

use plotters_chart::{ChartSeries, KineticsChart};

/// Points per fitted curve in the terminal chart.
const CHART_CURVE_POINTS: usize = 200;

/// Step for the initial-rate window keys (seconds).
const WINDOW_STEP: f64 = 60.0;

/// Start the TUI.
///
/// The workbook is resolved and analysed before the terminal switches to raw
/// mode so the picker and any parse error print normally.
pub fn run(args: AnalysisArgs) -> Result<(), AppError> {
    let workbook = crate::app::resolve_workbook(&args)?;
    let config = crate::app::analysis_config_from_args(&args, workbook)?;
    let output = run_analysis(&config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::numeric(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, output);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::numeric(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::numeric(format!("Failed to enter alternate screen: {e}")));
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Replicates,
    Averaged,
    InitRates,
}

impl ViewMode {
    fn next(self) -> Self {
        match self {
            ViewMode::Replicates => ViewMode::Averaged,
            ViewMode::Averaged => ViewMode::InitRates,
            ViewMode::InitRates => ViewMode::Replicates,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ViewMode::Replicates => "Replicate fits",
            ViewMode::Averaged => "Averaged fits (all conditions)",
            ViewMode::InitRates => "Initial rates",
        }
    }
}

struct App {
    config: AnalysisConfig,
    run: RunOutput,
    selected: usize,
    mode: ViewMode,
    status: String,
    palette: Palette,
}

impl App {
    fn new(config: AnalysisConfig, run: RunOutput) -> Self {
        let status = format!("control: {}", run.normalized.control);
        Self {
            config,
            run,
            selected: 0,
            mode: ViewMode::Replicates,
            status,
            palette: Palette::Tab10,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::numeric(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::numeric(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::numeric(format!("Event read error: {e}")))? {
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

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let n = self.run.data.conditions.len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < n {
                    self.selected += 1;
                }
            }
            KeyCode::Tab | KeyCode::Char('m') => {
                self.mode = self.mode.next();
                self.status = self.mode.title().to_string();
            }
            KeyCode::Char('+') | KeyCode::Right => self.adjust_window(WINDOW_STEP),
            KeyCode::Char('-') | KeyCode::Left => self.adjust_window(-WINDOW_STEP),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn adjust_window(&mut self, delta: f64) {
        let mut config = self.config.clone();
        config.init_window.max = (config.init_window.max + delta).max(config.init_window.min + WINDOW_STEP);
        match run_analysis_on(self.run.data.clone(), &config) {
            Ok(run) => {
                self.run = run;
                self.config = config;
                self.status = format!(
                    "initial-rate window: [{:.0}, {:.0}] s",
                    self.config.init_window.min, self.config.init_window.max
                );
            }
            Err(err) => self.status = format!("Refit failed: {err}"),
        }
    }

    fn reload(&mut self) {
        match run_analysis(&self.config) {
            Ok(run) => {
                self.run = run;
                self.selected = self.selected.min(self.run.data.conditions.len().saturating_sub(1));
                self.status = format!("Reloaded {}", self.config.workbook.display());
            }
            Err(err) => self.status = format!("Reload failed: {err}"),
        }
    }

    fn selected_condition(&self) -> Option<&str> {
        self.run.data.conditions.get(self.selected).map(|c| c.name.as_str())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("gkfit", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" {}", self.config.workbook.display())),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "window: [{:.0}, {:.0}] s | init window: [{:.0}, {:.0}] s | conditions: {} | reactions: {} | control: {}",
                self.config.time_range.min,
                self.config.time_range.max,
                self.config.init_window.min,
                self.config.init_window.max,
                self.run.data.conditions.len(),
                self.run.data.reaction_count(),
                self.run.normalized.control,
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(0)])
            .split(area);

        self.draw_conditions(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
    }

    fn draw_conditions(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .run
            .data
            .conditions
            .iter()
            .map(|c| {
                let percent: Vec<f64> = self
                    .run
                    .normalized
                    .conditions
                    .iter()
                    .find(|n| n.condition == c.name)
                    .map(|n| n.reactions.iter().map(|r| r.percent).collect())
                    .unwrap_or_default();
                let label = match crate::math::mean(&percent) {
                    Some(p) => format!("{} ({} rep, {p:.0}%)", c.name, c.reactions.len()),
                    None => format!("{} ({} rep)", c.name, c.reactions.len()),
                };
                ListItem::new(label)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Conditions").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match (self.mode, self.selected_condition()) {
            (ViewMode::Averaged, _) | (_, None) => self.mode.title().to_string(),
            (mode, Some(name)) => format!("{}: {name}", mode.title()),
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = match (self.mode, self.selected_condition()) {
            (ViewMode::Averaged, _) => averaged_series(&self.run, &self.palette),
            (ViewMode::Replicates, Some(name)) => replicate_series(&self.run, name, &self.palette),
            (ViewMode::InitRates, Some(name)) => rate_series(&self.run, name, &self.palette),
            (_, None) => Vec::new(),
        };
        if series.is_empty() {
            let msg = Paragraph::new("No data for this view.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        frame.render_widget(Paragraph::new(legend_line(&series)), rows[0]);
        let inner = rows[1];

        let (x_bounds, y_bounds) = chart_bounds(&series);
        let (chart_rect, insets) = chart_layout(inner);
        let widget = KineticsChart {
            series: &series,
            x_bounds,
            y_bounds,
            x_label: TIME_COLUMN,
            y_label: "fraction folded",
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ condition  Tab view  ←/→ init window  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Raw points and decay fit of every reaction in one condition.
fn replicate_series(run: &RunOutput, condition: &str, palette: &Palette) -> Vec<ChartSeries> {
    let Some(data) = run.data.condition(condition) else {
        return Vec::new();
    };
    data.reactions
        .iter()
        .filter_map(|reaction| {
            let fit = run.fits.get(condition, &reaction.name)?;
            let points = reaction.points();
            let [t0, t1] = finite_span(points.iter().map(|p| p.0))?;
            Some((reaction.name.clone(), points, decay_curve(&fit.params, t0, t1, CHART_CURVE_POINTS)))
        })
        .enumerate()
        .map(|(i, (label, points, curve))| ChartSeries {
            label,
            points,
            curve,
            color: palette.color(i),
        })
        .collect()
}

/// Mean points and averaged fit of every condition.
fn averaged_series(run: &RunOutput, palette: &Palette) -> Vec<ChartSeries> {
    run.averaged
        .conditions
        .iter()
        .filter_map(|table| {
            let fit = run.averaged_fits.condition(&table.condition)?;
            let points = table.points();
            let [t0, t1] = finite_span(points.iter().map(|p| p.0))?;
            Some((table.condition.clone(), points, decay_curve(&fit.params, t0, t1, CHART_CURVE_POINTS)))
        })
        .enumerate()
        .map(|(i, (label, points, curve))| ChartSeries {
            label,
            points,
            curve,
            color: palette.color(i),
        })
        .collect()
}

/// Initial-rate points and fitted line of every reaction in one condition.
fn rate_series(run: &RunOutput, condition: &str, palette: &Palette) -> Vec<ChartSeries> {
    let Some(rates) = run.init_rates.condition(condition) else {
        return Vec::new();
    };
    rates
        .reactions
        .iter()
        .filter_map(|r| {
            let points: Vec<(f64, f64)> = r.rate.x.iter().copied().zip(r.rate.y.iter().copied()).collect();
            let [x0, x1] = finite_span(points.iter().map(|p| p.0))?;
            Some((r.reaction.clone(), points, line_curve(&r.rate.fit, x0, x1, CHART_CURVE_POINTS)))
        })
        .enumerate()
        .map(|(i, (label, points, curve))| ChartSeries {
            label,
            points,
            curve,
            color: palette.color(i),
        })
        .collect()
}

/// One coloured marker and label per series.
fn legend_line(series: &[ChartSeries]) -> Line<'_> {
    let spans = series.iter().flat_map(|s| {
        let c = s.color;
        [
            Span::styled("■ ", Style::default().fg(Color::Rgb(c.0, c.1, c.2))),
            Span::raw(format!("{}  ", s.label)),
        ]
    });
    Line::from(spans.collect::<Vec<_>>())
}

fn chart_bounds(series: &[ChartSeries]) -> ([f64; 2], [f64; 2]) {
    let all = || series.iter().flat_map(|s| s.points.iter().chain(s.curve.iter()));
    let x = finite_span(all().map(|p| p.0)).unwrap_or([0.0, 1.0]);
    let [y0, y1] = finite_span(all().map(|p| p.1)).unwrap_or([0.0, 1.0]);
    let pad = ((y1 - y0) * 0.05).max(1e-12);
    (x, [y0 - pad, y1 + pad])
}

/// `[min, max]` of the finite values, `None` when empty or flat.
fn finite_span(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (hi > lo).then_some([lo, hi])
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.2}")
}

/// Cells reserved around the plot for the hand-drawn tick labels.
#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

const AXIS_INSETS: AxisInsets = AxisInsets {
    left: 8,
    right: 2,
    top: 1,
    bottom: 2,
};

const TICK_COUNT: usize = 5;

/// Shrink `inner` to leave room for tick labels, or keep it whole when too small.
fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let i = AXIS_INSETS;
    let fits = inner.width > i.left + i.right + 10 && inner.height > i.top + i.bottom + 5;
    if !fits {
        return (inner, None);
    }
    let rect = Rect {
        x: inner.x + i.left,
        y: inner.y + i.top,
        width: inner.width - i.left - i.right,
        height: inner.height - i.top - i.bottom,
    };
    (rect, Some(i))
}

/// Evenly spaced ticks over `bounds`: `(cell offset along an axis of `len` cells, value)`.
fn tick_positions(bounds: [f64; 2], len: u16, count: usize) -> Vec<(u16, f64)> {
    let last = len.saturating_sub(1) as f64;
    let steps = count.max(2) - 1;
    (0..=steps)
        .map(|i| {
            let u = i as f64 / steps as f64;
            ((last * u).round() as u16, bounds[0] + u * (bounds[1] - bounds[0]))
        })
        .collect()
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let tick_style = Style::default().fg(Color::Gray);
    let mut put = |label: String, x: u16, y: u16| {
        let width = label.len() as u16;
        frame.render_widget(Paragraph::new(label).style(tick_style), Rect { x, y, width, height: 1 });
    };

    let below = chart.y + chart.height;
    if below + 1 < inner.y + inner.height {
        for (dx, v) in tick_positions(x_bounds, chart.width, TICK_COUNT) {
            let label = fmt_axis_x(v);
            let x = (chart.x + dx).saturating_sub(label.len() as u16 / 2);
            put(label, x, below);
        }
    }

    let right_edge = inner.x + insets.left.saturating_sub(1);
    for (dy, v) in tick_positions(y_bounds, chart.height, TICK_COUNT) {
        let label = fmt_axis_y(v);
        let x = right_edge.saturating_sub(label.len() as u16);
        if x >= inner.x {
            put(label, x, chart.y + chart.height.saturating_sub(1) - dy);
        }
    }

    let x_title = Rect {
        x: chart.x,
        y: below + 1,
        width: chart.width,
        height: 1,
    };
    if x_title.y < inner.y + inner.height {
        let p = Paragraph::new(TIME_COLUMN).alignment(Alignment::Center).style(tick_style);
        frame.render_widget(p, x_title);
    }

    let y_title = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(Paragraph::new("folded").style(tick_style.add_modifier(Modifier::BOLD)), y_title);
}

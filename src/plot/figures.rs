//! Publication figures rendered to SVG.
//!
//! Every routine takes read-only results plus a per-call options value and
//! returns the SVG text, the path it was saved to (if any), and the warnings
//! raised while matching fits to data. Sizes are given in inches and points and
//! scaled by the figure's dpi, so a 5 × 6 in figure at 600 dpi is a
//! 3000 × 3600 px canvas.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{AveragedSet, AveragedFits, ConditionData, ConditionFits, ConditionRates, NormalizedRates, TIME_COLUMN};
use crate::error::AppError;
use crate::math::mean;
use crate::models::{decay_curve, line_curve};
use crate::plot::palette::Palette;

/// Points per resampled fit curve.
pub const CURVE_POINTS: usize = 100;

/// Printed (and returned) when the averaged plot cannot draw error bars.
pub const MISSING_ERROR_BARS_WARNING: &str =
    "error_bars either not specified or not a column in the averaged data; plotting without error bars";

const FRACTION_FOLDED_LABEL: &str = "Fraction folded";

/// Approximate glyph advance as a fraction of the font size.
const GLYPH_WIDTH: f64 = 0.6;

type DrawResult<E> = Result<(), DrawingAreaErrorKind<E>>;

/// Canvas and typography shared by all figures.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font_family: String,
    pub font_pt: f64,
    /// Fill the background white; transparent otherwise.
    pub opaque: bool,
    pub palette: Palette,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width_in: 6.4,
            height_in: 4.8,
            dpi: 600,
            font_family: "sans-serif".to_string(),
            font_pt: 10.0,
            opaque: false,
            palette: Palette::Tab10,
        }
    }
}

impl FigureStyle {
    /// Points to pixels at this figure's dpi.
    pub fn pt(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }

    fn pt_u32(&self, points: f64) -> u32 {
        self.pt(points).round().max(1.0) as u32
    }

    fn inches(&self, inches: f64) -> u32 {
        (inches * f64::from(self.dpi)).round().max(1.0) as u32
    }

    fn font(&self) -> FontDesc<'_> {
        (self.font_family.as_str(), self.pt(self.font_pt)).into_font()
    }

    fn validate(&self) -> Result<(), AppError> {
        let ok = self.width_in.is_finite()
            && self.width_in > 0.0
            && self.height_in.is_finite()
            && self.height_in > 0.0
            && self.dpi > 0
            && self.font_pt.is_finite()
            && self.font_pt > 0.0;
        if ok {
            Ok(())
        } else {
            Err(AppError::input(format!(
                "Invalid figure size {}x{} in at {} dpi (font {} pt).",
                self.width_in, self.height_in, self.dpi, self.font_pt
            )))
        }
    }
}

/// Where the averaged plot's legend goes relative to the requested figure size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPlacement {
    /// The legend panel is carved out of the figure box.
    Inside,
    /// The legend panel is added to the right of the figure box.
    #[default]
    Outside,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFitPlotOptions {
    pub style: FigureStyle,
    pub title: Option<String>,
    pub save: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AveragedPlotOptions {
    pub style: FigureStyle,
    /// Averaged-table column giving the full error-bar length (e.g. `Range`, `SD`).
    pub error_bars: Option<String>,
    pub y_limits: (f64, f64),
    pub legend: LegendPlacement,
    pub save: Option<PathBuf>,
}

impl Default for AveragedPlotOptions {
    fn default() -> Self {
        Self {
            style: FigureStyle {
                width_in: 5.0,
                height_in: 6.0,
                palette: Palette::Tab20,
                ..FigureStyle::default()
            },
            error_bars: None,
            y_limits: (0.0, 1.0),
            legend: LegendPlacement::Outside,
            save: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormRatePlotOptions {
    pub style: FigureStyle,
    pub y_limits: (f64, f64),
    pub y_label: String,
    /// Half-width of the horizontal jitter, in category units.
    pub jitter: f64,
    pub seed: u64,
    pub save: Option<PathBuf>,
}

impl Default for NormRatePlotOptions {
    fn default() -> Self {
        Self {
            style: FigureStyle {
                width_in: 5.0,
                height_in: 6.0,
                font_family: "Arial".to_string(),
                font_pt: 7.56,
                palette: Palette::Tab20,
                ..FigureStyle::default()
            },
            y_limits: (0.0, 200.0),
            y_label: "Normalised initial folding rate (% of control mean)".to_string(),
            jitter: 0.15,
            seed: 0,
            save: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InitRatePlotOptions {
    pub style: FigureStyle,
    pub title: Option<String>,
    pub save: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFigure {
    pub svg: String,
    pub saved: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// One scatter series with its fitted curve.
struct XySeries {
    label: String,
    color: RGBColor,
    points: Vec<(f64, f64)>,
    /// Symmetric half-widths, one per point.
    errors: Option<Vec<f64>>,
    curve: Vec<(f64, f64)>,
}

struct XyFigure<'a> {
    series: &'a [XySeries],
    x_desc: &'a str,
    y_desc: &'a str,
    title: Option<&'a str>,
    y_limits: Option<(f64, f64)>,
    marker_pt: f64,
}

/// Raw replicate points of one condition with each replicate's decay fit.
pub fn plot_fraction_folded_and_fits(
    condition: &ConditionData,
    fits: &ConditionFits,
    options: &RawFitPlotOptions,
) -> Result<RenderedFigure, AppError> {
    options.style.validate()?;
    let mut warnings = Vec::new();
    let mut series = Vec::new();

    for reaction in &condition.reactions {
        let Some(fit) = fits.reaction(&reaction.name) else {
            warnings.push(format!(
                "no fit for reaction '{}' in condition '{}'; skipped",
                reaction.name, condition.name
            ));
            continue;
        };
        let points = reaction.points();
        let Some((t0, t1)) = x_extent(&points) else {
            warnings.push(format!(
                "reaction '{}' in condition '{}' has no plottable points; skipped",
                reaction.name, condition.name
            ));
            continue;
        };
        series.push(XySeries {
            label: reaction.name.clone(),
            color: options.style.palette.color(series.len()),
            curve: decay_curve(&fit.params, t0, t1, CURVE_POINTS),
            points,
            errors: None,
        });
    }
    for fit in &fits.reactions {
        if condition.reaction(&fit.reaction).is_none() {
            warnings.push(format!(
                "fit for reaction '{}' has no data in condition '{}'; skipped",
                fit.reaction, condition.name
            ));
        }
    }

    let title = options.title.clone().unwrap_or_else(|| condition.name.clone());
    let figure = XyFigure {
        series: &series,
        x_desc: TIME_COLUMN,
        y_desc: FRACTION_FOLDED_LABEL,
        title: Some(title.as_str()),
        y_limits: None,
        marker_pt: 3.0,
    };
    let svg = render_xy(&figure, &options.style, LegendPlacement::Outside)?;
    finish(svg, options.save.as_deref(), warnings)
}

/// Cross-replicate means per condition with the fit of each mean curve.
pub fn plot_averaged_with_fits(
    averaged: &AveragedSet,
    fits: &AveragedFits,
    options: &AveragedPlotOptions,
) -> Result<RenderedFigure, AppError> {
    options.style.validate()?;
    let (lo, hi) = options.y_limits;
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(AppError::input(format!("Invalid y limits [{lo}, {hi}].")));
    }

    let mut warnings = Vec::new();
    let error_column = options
        .error_bars
        .as_deref()
        .filter(|name| averaged.conditions.iter().all(|t| t.column(name).is_some()));
    if error_column.is_none() {
        log::warn!("{MISSING_ERROR_BARS_WARNING}");
        warnings.push(MISSING_ERROR_BARS_WARNING.to_string());
    }

    let mut series = Vec::new();
    for table in &averaged.conditions {
        let Some(fit) = fits.condition(&table.condition) else {
            warnings.push(format!("no fit for condition '{}'; skipped", table.condition));
            continue;
        };

        let mut points = Vec::new();
        let mut errors = Vec::new();
        let widths = error_column.and_then(|name| table.column(name));
        for (i, (&t, &y)) in table.time.iter().zip(table.mean.iter()).enumerate() {
            if !(t.is_finite() && y.is_finite()) {
                continue;
            }
            points.push((t, y));
            let half = widths.as_ref().and_then(|w| w.get(i)).map_or(0.0, |w| w / 2.0);
            errors.push(if half.is_finite() { half } else { 0.0 });
        }
        let Some((t0, t1)) = x_extent(&points) else {
            warnings.push(format!("condition '{}' has no plottable points; skipped", table.condition));
            continue;
        };
        series.push(XySeries {
            label: table.condition.clone(),
            color: options.style.palette.color(series.len()),
            curve: decay_curve(&fit.params, t0, t1, CURVE_POINTS),
            points,
            errors: error_column.map(|_| errors),
        });
    }
    for fit in &fits.conditions {
        if averaged.condition(&fit.condition).is_none() {
            warnings.push(format!("fit for condition '{}' has no averaged data; skipped", fit.condition));
        }
    }

    let figure = XyFigure {
        series: &series,
        x_desc: TIME_COLUMN,
        y_desc: FRACTION_FOLDED_LABEL,
        title: None,
        y_limits: Some(options.y_limits),
        marker_pt: 3.0,
    };
    let svg = render_xy(&figure, &options.style, options.legend)?;
    finish(svg, options.save.as_deref(), warnings)
}

/// Points used by each initial-rate fit with the fitted line.
pub fn plot_init_rate_fits(
    rates: &ConditionRates,
    options: &InitRatePlotOptions,
) -> Result<RenderedFigure, AppError> {
    options.style.validate()?;
    let mut warnings = Vec::new();
    let mut series = Vec::new();

    for reaction in &rates.reactions {
        let rate = &reaction.rate;
        let points: Vec<(f64, f64)> = rate.x.iter().copied().zip(rate.y.iter().copied()).collect();
        let Some((x0, x1)) = x_extent(&points) else {
            warnings.push(format!(
                "initial rate for '{}' in condition '{}' has no points; skipped",
                reaction.reaction, rates.condition
            ));
            continue;
        };
        series.push(XySeries {
            label: reaction.reaction.clone(),
            color: options.style.palette.color(series.len()),
            curve: line_curve(&rate.fit, x0, x1, CURVE_POINTS),
            points,
            errors: None,
        });
    }

    let title = options.title.clone().unwrap_or_else(|| format!("{} initial rates", rates.condition));
    let figure = XyFigure {
        series: &series,
        x_desc: TIME_COLUMN,
        y_desc: FRACTION_FOLDED_LABEL,
        title: Some(title.as_str()),
        y_limits: None,
        marker_pt: 1.5,
    };
    let svg = render_xy(&figure, &options.style, LegendPlacement::Outside)?;
    finish(svg, options.save.as_deref(), warnings)
}

/// Normalized rates per condition, in condition order, dropping the reaction level.
pub fn flatten_rates(rates: &NormalizedRates) -> Vec<(String, Vec<f64>)> {
    rates
        .conditions
        .iter()
        .map(|c| (c.condition.clone(), c.reactions.iter().map(|r| r.percent).collect()))
        .collect()
}

/// Bar chart of mean normalized rate per condition with the replicates as a swarm.
pub fn plot_norm_init_rates(
    rates: &NormalizedRates,
    options: &NormRatePlotOptions,
) -> Result<RenderedFigure, AppError> {
    options.style.validate()?;
    let (lo, hi) = options.y_limits;
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(AppError::input(format!("Invalid y limits [{lo}, {hi}].")));
    }

    let groups = flatten_rates(rates);
    if groups.is_empty() {
        return Err(AppError::no_data("No normalized rates to plot."));
    }

    let mut warnings = Vec::new();
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut bars = Vec::with_capacity(groups.len());
    let mut swarm = Vec::new();
    for (i, (condition, values)) in groups.iter().enumerate() {
        let x = i as f64;
        match mean(values) {
            Some(m) => bars.push((x, m)),
            None => warnings.push(format!("condition '{condition}' has no finite normalized rates")),
        }
        for &v in values.iter().filter(|v| v.is_finite()) {
            let dx = if options.jitter > 0.0 {
                rng.gen_range(-options.jitter..=options.jitter)
            } else {
                0.0
            };
            swarm.push((x + dx, v));
        }
    }

    let labels: Vec<&str> = groups.iter().map(|(c, _)| c.as_str()).collect();
    let style = &options.style;
    let size = (style.inches(style.width_in), style.inches(style.height_in));
    let svg = render_svg(size, style.opaque, |root| {
        draw_bars(root, &labels, &bars, &swarm, options)
    })?;
    finish(svg, options.save.as_deref(), warnings)
}

fn finish(svg: String, save: Option<&Path>, warnings: Vec<String>) -> Result<RenderedFigure, AppError> {
    for w in &warnings {
        if w != MISSING_ERROR_BARS_WARNING {
            log::warn!("{w}");
        }
    }
    let saved = match save {
        Some(path) => {
            log::info!("saving figure to {}", path.display());
            std::fs::write(path, &svg)
                .map_err(|e| AppError::input(format!("Failed to write figure '{}': {e}", path.display())))?;
            Some(path.to_path_buf())
        }
        None => None,
    };
    Ok(RenderedFigure { svg, saved, warnings })
}

fn render_svg<F>(size: (u32, u32), opaque: bool, draw: F) -> Result<String, AppError>
where
    F: for<'b> FnOnce(&DrawingArea<SVGBackend<'b>, Shift>) -> DrawResult<std::io::Error>,
{
    let render_err = |e: DrawingAreaErrorKind<std::io::Error>| AppError::numeric(format!("Failed to render figure: {e}"));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        if opaque {
            root.fill(&WHITE).map_err(render_err)?;
        }
        draw(&root).map_err(render_err)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

fn render_xy(figure: &XyFigure<'_>, style: &FigureStyle, legend: LegendPlacement) -> Result<String, AppError> {
    let plot_w = style.inches(style.width_in);
    let height = style.inches(style.height_in);
    let legend_w = legend_width(figure.series, style);

    let (canvas_w, split) = match legend {
        LegendPlacement::Outside => (plot_w + legend_w, plot_w),
        LegendPlacement::Inside => (plot_w, plot_w.saturating_sub(legend_w).max(plot_w / 2)),
    };

    render_svg((canvas_w, height), style.opaque, |root| {
        let (plot_area, legend_area) = root.split_horizontally(split);
        draw_xy(&plot_area, figure, style)?;
        draw_legend(&legend_area, figure.series, figure.marker_pt, style)
    })
}

fn draw_xy<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &XyFigure<'_>,
    style: &FigureStyle,
) -> DrawResult<DB::ErrorType> {
    let font = style.font();
    let (x0, x1) = xy_x_range(figure.series);
    let (y0, y1) = figure.y_limits.unwrap_or_else(|| xy_y_range(figure.series));
    let line_w = style.pt_u32(1.5);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(style.pt_u32(6.0))
        .x_label_area_size(style.pt_u32(3.2 * style.font_pt))
        .y_label_area_size(style.pt_u32(4.5 * style.font_pt));
    if let Some(title) = figure.title {
        builder.caption(title, font.clone());
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(figure.x_desc)
        .y_desc(figure.y_desc)
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.1}"))
        .label_style(font.clone())
        .axis_desc_style(font.clone())
        .axis_style(BLACK.stroke_width(style.pt_u32(0.8)))
        .draw()?;

    chart.plotting_area().draw(&Rectangle::new(
        [(x0, y0), (x1, y1)],
        BLACK.stroke_width(style.pt_u32(0.8)),
    ))?;

    let radius = style.pt_u32(figure.marker_pt);
    for s in figure.series {
        if let Some(errors) = &s.errors {
            let cap = style.pt_u32(6.0);
            chart.draw_series(s.points.iter().zip(errors.iter()).filter(|(_, e)| **e > 0.0).map(|(&(x, y), &e)| {
                ErrorBar::new_vertical(x, y - e, y, y + e, s.color.stroke_width(line_w), cap)
            }))?;
        }
        chart.draw_series(s.points.iter().map(|&p| Circle::new(p, radius, s.color.filled())))?;
        chart.draw_series(LineSeries::new(s.curve.iter().copied(), s.color.stroke_width(line_w)))?;
    }

    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &[XySeries],
    marker_pt: f64,
    style: &FigureStyle,
) -> DrawResult<DB::ErrorType> {
    let font_px = style.pt(style.font_pt);
    let pad = style.pt(6.0) as i32;
    let radius = style.pt_u32(marker_pt);
    let swatch = (2.0 * font_px) as i32;
    let row_h = (1.6 * font_px) as i32;
    let text = style
        .font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));

    for (i, s) in series.iter().enumerate() {
        let y = pad + row_h / 2 + i as i32 * row_h;
        let x = pad;
        area.draw(&PathElement::new(
            vec![(x, y), (x + swatch, y)],
            s.color.stroke_width(style.pt_u32(1.5)),
        ))?;
        area.draw(&Circle::new((x + swatch / 2, y), radius, s.color.filled()))?;
        area.draw(&Text::new(s.label.clone(), (x + swatch + pad, y), text.clone()))?;
    }
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &[&str],
    bars: &[(f64, f64)],
    swarm: &[(f64, f64)],
    options: &NormRatePlotOptions,
) -> DrawResult<DB::ErrorType> {
    let style = &options.style;
    let font = style.font();
    let (y0, y1) = options.y_limits;
    let n = labels.len();
    let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(1) as f64;
    let font_px = style.pt(style.font_pt);
    let bar_half = 0.4;

    let mut chart = ChartBuilder::on(root)
        .margin(style.pt_u32(6.0))
        .x_label_area_size((longest * GLYPH_WIDTH * font_px + style.pt(10.0)).round() as u32)
        .y_label_area_size(style.pt_u32(5.0 * style.font_pt))
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y0..y1)?;

    let category = |v: &f64| {
        let i = v.round();
        if (v - i).abs() < 1e-6 && i >= 0.0 {
            labels.get(i as usize).map(|s| s.to_string()).unwrap_or_default()
        } else {
            String::new()
        }
    };

    // Only the bottom and left axes are drawn; there is no top/right frame.
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(5)
        .x_label_formatter(&category)
        .y_label_formatter(&|v| format!("{v:.0}"))
        .x_label_style(font.clone().transform(FontTransform::Rotate270))
        .y_label_style(font.clone())
        .y_desc(options.y_label.as_str())
        .axis_desc_style(font.clone())
        .axis_style(BLACK.stroke_width(style.pt_u32(0.8)))
        .draw()?;

    let edge = style.pt_u32(0.8);
    for (i, &(x, m)) in bars.iter().enumerate() {
        let (base, top) = bar_span(m, options.y_limits);
        let corners = [(x - bar_half, base), (x + bar_half, top)];
        chart.draw_series(std::iter::once(Rectangle::new(corners, style.palette.color(i).filled())))?;
        chart.draw_series(std::iter::once(Rectangle::new(corners, BLACK.stroke_width(edge))))?;
    }

    let grey = RGBColor(128, 128, 128);
    let radius = style.pt_u32(1.0);
    chart.draw_series(swarm.iter().map(|&p| Circle::new(p, radius, grey.filled())))?;

    Ok(())
}

/// Vertical extent of a bar: from zero (or the nearest y limit) to the mean,
/// either upwards or downwards, clipped to the limits.
fn bar_span(mean: f64, (y0, y1): (f64, f64)) -> (f64, f64) {
    (0.0_f64.clamp(y0, y1), mean.clamp(y0, y1))
}

fn legend_width(series: &[XySeries], style: &FigureStyle) -> u32 {
    let font_px = style.pt(style.font_pt);
    let longest = series.iter().map(|s| s.label.chars().count()).max().unwrap_or(0) as f64;
    let pad = style.pt(6.0);
    (3.0 * pad + 2.0 * font_px + longest * GLYPH_WIDTH * font_px).round() as u32
}

fn x_extent(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(x, _) in points {
        lo = lo.min(x);
        hi = hi.max(x);
    }
    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}

fn xy_x_range(series: &[XySeries]) -> (f64, f64) {
    let all: Vec<(f64, f64)> = series.iter().flat_map(|s| s.points.iter().copied()).collect();
    let (lo, hi) = x_extent(&all).unwrap_or((0.0, 1.0));
    pad_range(lo, hi, 0.03)
}

fn xy_y_range(series: &[XySeries]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in series {
        for &(_, y) in s.points.iter().chain(s.curve.iter()) {
            if y.is_finite() {
                lo = lo.min(y);
                hi = hi.max(y);
            }
        }
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    pad_range(lo, hi, 0.05)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    if max <= min {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * frac;
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::condition;
    use crate::analysis::{average_by_condition, fit_averaged, fit_data_set, init_rates_as_percent_control, initial_rates};
    use crate::domain::{ConditionNormalized, DataSet, FitOptions, NormalizedRate, NormalizedRates, TimeRange};

    fn data() -> DataSet {
        DataSet {
            conditions: vec![
                condition("WT", &[("Rep1", 1e-3), ("Rep2", 1.1e-3)]),
                condition("Mut", &[("Rep1", 4e-4), ("Rep2", 5e-4)]),
            ],
        }
    }

    fn small_style() -> FigureStyle {
        FigureStyle {
            dpi: 72,
            ..FigureStyle::default()
        }
    }

    #[test]
    fn raw_plot_skips_unmatched_reactions_with_warning() {
        let data = data();
        let fits = fit_data_set(&data, &FitOptions::default()).unwrap();
        let mut wt_fits = fits.condition("WT").unwrap().clone();
        wt_fits.reactions.retain(|r| r.reaction == "Rep1");

        let options = RawFitPlotOptions {
            style: small_style(),
            ..RawFitPlotOptions::default()
        };
        let fig = plot_fraction_folded_and_fits(data.condition("WT").unwrap(), &wt_fits, &options).unwrap();
        assert!(fig.svg.starts_with("<svg"));
        assert!(fig.svg.contains("Rep1"));
        assert_eq!(fig.warnings.len(), 1);
        assert!(fig.warnings[0].contains("Rep2"));
        assert!(fig.saved.is_none());
    }

    #[test]
    fn averaged_plot_without_error_column_warns_and_completes() {
        let data = data();
        let averaged = average_by_condition(&data).unwrap();
        let fits = fit_averaged(&averaged, &FitOptions::default()).unwrap();

        let options = AveragedPlotOptions {
            style: FigureStyle {
                dpi: 72,
                ..AveragedPlotOptions::default().style
            },
            error_bars: Some("Stdev".to_string()),
            ..AveragedPlotOptions::default()
        };
        let fig = plot_averaged_with_fits(&averaged, &fits, &options).unwrap();
        assert_eq!(fig.warnings, vec![MISSING_ERROR_BARS_WARNING.to_string()]);
        assert!(fig.svg.contains("WT") && fig.svg.contains("Mut"));
    }

    #[test]
    fn averaged_plot_with_error_bars_has_no_warning() {
        let data = data();
        let averaged = average_by_condition(&data).unwrap();
        let fits = fit_averaged(&averaged, &FitOptions::default()).unwrap();
        let base = AveragedPlotOptions::default();

        let outside = AveragedPlotOptions {
            style: FigureStyle { dpi: 72, ..base.style.clone() },
            error_bars: Some("Range".to_string()),
            ..base.clone()
        };
        let inside = AveragedPlotOptions {
            legend: LegendPlacement::Inside,
            ..outside.clone()
        };
        let a = plot_averaged_with_fits(&averaged, &fits, &outside).unwrap();
        let b = plot_averaged_with_fits(&averaged, &fits, &inside).unwrap();
        assert!(a.warnings.is_empty());
        // 5 in at 72 dpi; the outside legend widens the canvas.
        assert!(b.svg.contains("<svg width=\"360\""));
        assert!(a.svg.contains("<svg width=\"416\""));
    }

    #[test]
    fn norm_rate_plot_saves_svg() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 600.0)).unwrap();
        let normalized = init_rates_as_percent_control(&rates, "WT").unwrap();

        let flat = flatten_rates(&normalized);
        assert_eq!(flat[0].0, "WT");
        assert_eq!(flat[0].1.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.svg");
        let options = NormRatePlotOptions {
            style: FigureStyle {
                dpi: 72,
                ..NormRatePlotOptions::default().style
            },
            save: Some(path.clone()),
            ..NormRatePlotOptions::default()
        };
        let fig = plot_norm_init_rates(&normalized, &options).unwrap();
        assert_eq!(fig.saved.as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), fig.svg);
        assert!(fig.svg.contains("Arial"));

        // Seeded jitter: identical output for identical input.
        assert_eq!(plot_norm_init_rates(&normalized, &options).unwrap().svg, fig.svg);
    }

    #[test]
    fn init_rate_plot_renders_each_reaction() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 600.0)).unwrap();
        let options = InitRatePlotOptions {
            style: small_style(),
            ..InitRatePlotOptions::default()
        };
        let fig = plot_init_rate_fits(rates.condition("Mut").unwrap(), &options).unwrap();
        assert!(fig.svg.contains("Mut initial rates"));
        assert!(fig.warnings.is_empty());
    }

    #[test]
    fn bars_extend_below_zero_for_negative_means() {
        assert_eq!(bar_span(80.0, (0.0, 200.0)), (0.0, 80.0));
        assert_eq!(bar_span(-20.0, (-50.0, 150.0)), (0.0, -20.0));
        // Zero outside the limits: the bar starts at the nearest limit.
        assert_eq!(bar_span(30.0, (10.0, 200.0)), (10.0, 30.0));
        assert_eq!(bar_span(250.0, (0.0, 200.0)), (0.0, 200.0));

        let normalized = NormalizedRates {
            control: "WT".to_string(),
            control_mean_slope: 1e-3,
            conditions: vec![
                ConditionNormalized {
                    condition: "WT".to_string(),
                    reactions: vec![NormalizedRate { reaction: "Rep1".to_string(), percent: 100.0 }],
                },
                ConditionNormalized {
                    condition: "Neg".to_string(),
                    reactions: vec![NormalizedRate { reaction: "Rep1".to_string(), percent: -20.0 }],
                },
            ],
        };
        let options = NormRatePlotOptions {
            style: FigureStyle {
                dpi: 72,
                ..NormRatePlotOptions::default().style
            },
            y_limits: (-50.0, 150.0),
            ..NormRatePlotOptions::default()
        };
        let fig = plot_norm_init_rates(&normalized, &options).unwrap();
        assert!(!fig.svg.contains("height=\"0\""));
    }

    #[test]
    fn rejects_bad_limits() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 600.0)).unwrap();
        let normalized = init_rates_as_percent_control(&rates, "WT").unwrap();
        let options = NormRatePlotOptions {
            y_limits: (10.0, 10.0),
            ..NormRatePlotOptions::default()
        };
        assert_eq!(plot_norm_init_rates(&normalized, &options).unwrap_err().exit_code(), 2);
    }
}

use std::f64::consts::PI;
use std::fmt::Display;
use std::io::Cursor;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, warn};

use crate::errors::FactsheetError;
use crate::models::{ChartAsset, ChartOptions, PerformanceSeries, SectorAllocation};
use crate::services::fonts::{chart_fonts_available, CHART_FONT_FAMILY};

/// Same order as the default matplotlib cycle.
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Share of the pie chart's width kept for the legend.
const LEGEND_SHARE: f64 = 0.35;

fn render_err<E: Display>(e: E) -> FactsheetError {
    FactsheetError::Render(format!("chart drawing failed: {}", e))
}

/// Pixel sizes are tuned for 100 dpi and scaled with the configured dpi.
fn scale(options: &ChartOptions, px: f64) -> f64 {
    px * options.dpi as f64 / 100.0
}

fn scale_px(options: &ChartOptions, px: f64) -> u32 {
    scale(options, px).round().max(1.0) as u32
}

/// Draws every series as a line with a marker per point. All series must
/// share the first series' month labels, in the same order.
pub fn render_performance_chart(
    series: &[PerformanceSeries],
    options: &ChartOptions,
) -> Result<ChartAsset, FactsheetError> {
    let first = series
        .first()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FactsheetError::Render("performance chart needs at least one data point".to_string()))?;
    let labels: Vec<String> = first.labels().into_iter().map(String::from).collect();

    if let Some(other) = series.iter().find(|s| s.labels() != first.labels()) {
        return Err(FactsheetError::Render(format!(
            "series '{}' does not use the same months as '{}'",
            other.name, first.name
        )));
    }

    let (y_min, y_max) = value_range(series)?;
    let (width, height) = options.pixel_size();
    let with_text = chart_fonts_available();
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let n = labels.len() as f64;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(scale_px(options, 16.0));
        if with_text {
            builder
                .caption(
                    "Performance Comparison",
                    (CHART_FONT_FAMILY, scale(options, 22.0)).into_font(),
                )
                .x_label_area_size(scale_px(options, 44.0))
                .y_label_area_size(scale_px(options, 60.0));
        }
        let mut chart = builder
            .build_cartesian_2d(-0.5f64..(n - 0.5), y_min..y_max)
            .map_err(render_err)?;

        if with_text {
            chart
                .configure_mesh()
                .x_labels(labels.len())
                .x_label_formatter(&|x| category_label(&labels, *x))
                .y_label_formatter(&|y| format!("{:.1}", y))
                .x_desc("Month")
                .y_desc("Performance (%)")
                .label_style((CHART_FONT_FAMILY, scale(options, 13.0)).into_font())
                .axis_desc_style((CHART_FONT_FAMILY, scale(options, 15.0)).into_font())
                .draw()
                .map_err(render_err)?;
        }

        if y_min < 0.0 && y_max > 0.0 {
            chart
                .draw_series(LineSeries::new(
                    vec![(-0.5, 0.0), (n - 0.5, 0.0)],
                    BLACK.mix(0.4).stroke_width(1),
                ))
                .map_err(render_err)?;
        }

        for (idx, s) in series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            let points: Vec<(f64, f64)> = s
                .values()
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i as f64, v))
                .collect();

            let line_width = scale_px(options, 2.0);
            let anno = chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(line_width)))
                .map_err(render_err)?;
            if with_text {
                let legend_len = scale(options, 20.0) as i32;
                anno.label(s.name.clone()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + legend_len, y)], color.stroke_width(line_width))
                });
            }

            let marker = scale_px(options, 4.0);
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, marker, color.filled())))
                .map_err(render_err)?;
        }

        if with_text {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(&WHITE.mix(0.85))
                .border_style(&BLACK)
                .label_font((CHART_FONT_FAMILY, scale(options, 13.0)).into_font())
                .draw()
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    debug!("Rendered performance chart {}x{} with {} series", width, height, series.len());
    encode_png(buffer, width, height)
}

/// Draws a pie with one slice per sector and percentage labels inside the
/// slices, next to a legend of sector names. Slice sizes are shares of the
/// uploaded total, which does not need to be 100.
pub fn render_sector_chart(
    allocation: &SectorAllocation,
    options: &ChartOptions,
) -> Result<ChartAsset, FactsheetError> {
    if allocation.is_empty() {
        return Err(FactsheetError::Render("sector chart needs at least one sector".to_string()));
    }
    if let Some((sector, value)) = allocation.sectors.iter().find(|(_, v)| *v < 0.0) {
        return Err(FactsheetError::Render(format!(
            "sector '{}' has a negative allocation ({})",
            sector, value
        )));
    }
    let total = allocation.total();
    if total <= 0.0 {
        return Err(FactsheetError::Render("sector allocations add up to zero".to_string()));
    }
    if (total - 100.0).abs() > 0.5 {
        warn!("Sector allocations add up to {:.2}%, showing them as uploaded", total);
    }

    let (width, height) = options.pixel_size();
    let with_text = chart_fonts_available();
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let w = width as f64;
        let h = height as f64;
        let title_space = if with_text { scale(options, 40.0) } else { 0.0 };
        let pie_width = w * (1.0 - LEGEND_SHARE);
        let center = (pie_width / 2.0, title_space + (h - title_space) / 2.0);
        let radius = (pie_width.min(h - title_space) / 2.0) * 0.85;

        if with_text {
            let style = (CHART_FONT_FAMILY, scale(options, 22.0))
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center));
            root.draw(&Text::new(
                "Sector Allocation",
                ((w / 2.0) as i32, (title_space / 2.0) as i32),
                style,
            ))
            .map_err(render_err)?;
        }

        let mut start = -PI / 2.0;
        for (idx, (sector, value)) in allocation.sectors.iter().enumerate() {
            let share = value / total;
            let sweep = share * 2.0 * PI;
            let color = PALETTE[idx % PALETTE.len()];

            if sweep > 0.0 {
                let slice = slice_points(center, radius, start, sweep);
                root.draw(&Polygon::new(slice.clone(), color.filled()))
                    .map_err(render_err)?;
                let mut outline = slice;
                outline.push(outline[0]);
                root.draw(&PathElement::new(outline, WHITE.stroke_width(scale_px(options, 2.0))))
                    .map_err(render_err)?;
            }

            let (top_left, bottom_right) = legend_swatch(options, (width, height), title_space, idx);
            root.draw(&Rectangle::new([top_left, bottom_right], color.filled()))
                .map_err(render_err)?;

            if with_text {
                let mid = start + sweep / 2.0;
                let inner = polar(center, radius * 0.62, mid);
                let pct_style = (CHART_FONT_FAMILY, scale(options, 14.0))
                    .into_font()
                    .color(&WHITE)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(format!("{:.1}%", share * 100.0), inner, pct_style))
                    .map_err(render_err)?;

                let name_at = (
                    bottom_right.0 + scale_px(options, 6.0) as i32,
                    (top_left.1 + bottom_right.1) / 2,
                );
                let name_style = (CHART_FONT_FAMILY, scale(options, 13.0))
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Left, VPos::Center));
                root.draw(&Text::new(sector.clone(), name_at, name_style))
                    .map_err(render_err)?;
            }

            start += sweep;
        }

        root.present().map_err(render_err)?;
    }

    debug!("Rendered sector chart {}x{} with {} sectors", width, height, allocation.sectors.len());
    encode_png(buffer, width, height)
}

/// Y axis bounds with 10% headroom on both sides. Fails when the padded
/// span does not fit in an `f64`.
fn value_range(series: &[PerformanceSeries]) -> Result<(f64, f64), FactsheetError> {
    let values: Vec<f64> = series.iter().flat_map(|s| s.values()).collect();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // Halved first so extreme values cannot overflow the subtraction.
    let half_span = max / 2.0 - min / 2.0;
    let pad = if half_span < f64::EPSILON {
        max.abs().max(10.0) * 0.1
    } else {
        half_span * 0.2
    };
    let (low, high) = (min - pad, max + pad);

    let span = high - low;
    if !span.is_finite() || span <= 0.0 {
        return Err(FactsheetError::Render(format!(
            "performance values from {:e} to {:e} are too far apart to chart",
            min, max
        )));
    }
    Ok((low, high))
}

/// Month label for an x position; blank between categories.
fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

fn slice_points(center: (f64, f64), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push((center.0.round() as i32, center.1.round() as i32));
    for step in 0..=steps {
        let angle = start + sweep * step as f64 / steps as f64;
        points.push(polar(center, radius, angle));
    }
    points
}

/// Corners of the colour square for legend row `idx`.
fn legend_swatch(
    options: &ChartOptions,
    (width, height): (u32, u32),
    title_space: f64,
    idx: usize,
) -> ((i32, i32), (i32, i32)) {
    let size = scale(options, 14.0);
    let row = scale(options, 24.0);
    let left = width as f64 * (1.0 - LEGEND_SHARE) + scale(options, 8.0);
    let top = title_space + (height as f64 - title_space) * 0.15 + row * idx as f64;
    (
        (left.round() as i32, top.round() as i32),
        ((left + size).round() as i32, (top + size).round() as i32),
    )
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<ChartAsset, FactsheetError> {
    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| FactsheetError::Render("chart buffer does not match its size".to_string()))?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| FactsheetError::Render(format!("could not encode chart as PNG: {}", e)))?;

    Ok(ChartAsset { png, width, height })
}

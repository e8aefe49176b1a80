// Chart rendering for the four summary tables.
//
// Everything here is presentation: the tables arrive already ordered and the
// functions only draw them. Charts are written as SVG.
use crate::error::OutputError;
use crate::regions::{Boundaries, RegionCounts};
use crate::temporal::hour_label;
use crate::types::{FactorCount, RegionCountRow};
use crate::util::{format_int, wrap_label};
use chrono::{Months, NaiveDate};
use geo::BoundingRect;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const FONT: &str = "sans-serif";
const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const NO_DATA_COLOR: RGBColor = RGBColor(220, 220, 220);

fn render_err<E: std::fmt::Display>(e: E) -> OutputError {
    OutputError::Render(e.to_string())
}

/// Sequential light-to-dark blue ramp, `t` in `[0, 1]`.
pub fn blues(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(lerp(222, 8), lerp(235, 48), lerp(247, 107))
}

fn y_ceiling(max: usize) -> f64 {
    (max.max(1) as f64) * 1.1
}

fn no_data(root: &DrawingArea<SVGBackend, Shift>, title: &str) -> Result<(), OutputError> {
    let area = root
        .titled(title, (FONT, 24).into_font())
        .map_err(render_err)?;
    area.draw(&Text::new("No data", (20, 20), (FONT, 16).into_font()))
        .map_err(render_err)?;
    root.present().map_err(render_err)
}

/// Horizontal bars, smallest at the bottom, labels wrapped onto the bars.
pub fn factor_chart(path: &Path, factors: &[FactorCount]) -> Result<(), OutputError> {
    let root = SVGBackend::new(path, (1000, 750)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let title = "Top 10 Crash Contributory Factors";
    if factors.is_empty() {
        return no_data(&root, title);
    }

    let max = factors.iter().map(|f| f.crashes).max().unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 28).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(10)
        .build_cartesian_2d(0f64..y_ceiling(max), 0f64..factors.len() as f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc("Frequency of Factor Contributing to Crash")
        .x_label_formatter(&|v| format_int(*v as u64))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(factors.iter().enumerate().map(|(i, f)| {
            let y = i as f64;
            Rectangle::new(
                [(0.0, y + 0.1), (f.crashes as f64, y + 0.9)],
                LINE_COLOR.mix(0.6).filled(),
            )
        }))
        .map_err(render_err)?;

    for (i, f) in factors.iter().enumerate() {
        let lines: Vec<String> = wrap_label(&f.factor)
            .lines()
            .map(|l| l.trim_start().to_string())
            .collect();
        let top = -8 * lines.len() as i32;
        chart
            .draw_series(lines.into_iter().enumerate().map(|(k, line)| {
                EmptyElement::at((0.0, i as f64 + 0.5))
                    + Text::new(line, (6, top + 16 * k as i32), (FONT, 14).into_font())
            }))
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    log::info!("Factor chart saved as {}", path.display());
    Ok(())
}

/// Choropleth of crash counts per region, drawn in longitude/latitude.
pub fn region_map(
    path: &Path,
    boundaries: &Boundaries,
    counts: &RegionCounts,
    rows: &[RegionCountRow],
) -> Result<(), OutputError> {
    let root = SVGBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let title = "Crash Distribution over Boroughs";

    let shapes = boundaries.lon_lat_polygons();
    let Some((min_x, min_y, max_x, max_y)) = shapes
        .iter()
        .filter_map(|(_, mp)| mp.bounding_rect())
        .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y))
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
    else {
        return no_data(&root, title);
    };
    let pad_x = (max_x - min_x).max(1e-6) * 0.05;
    let pad_y = (max_y - min_y).max(1e-6) * 0.05;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (min_x - pad_x)..(max_x + pad_x),
            (min_y - pad_y)..(max_y + pad_y),
        )
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .x_desc("Longitude (°)")
        .y_desc("Latitude (°)")
        .draw()
        .map_err(render_err)?;

    let low = counts.counts.values().copied().min().unwrap_or(0) as f64;
    let high = counts.counts.values().copied().max().unwrap_or(0) as f64;
    let shade = |count: usize| {
        if high > low {
            blues((count as f64 - low) / (high - low))
        } else {
            blues(1.0)
        }
    };

    for (key, polygon) in &shapes {
        let fill = counts
            .counts
            .get(*key)
            .map_or(NO_DATA_COLOR, |&count| shade(count));
        for part in &polygon.0 {
            let ring: Vec<(f64, f64)> = part.exterior().coords().map(|c| (c.x, c.y)).collect();
            chart
                .draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))
                .map_err(render_err)?;
            chart
                .draw_series(std::iter::once(PathElement::new(ring, &BLACK)))
                .map_err(render_err)?;
        }
    }

    // Legend entries follow the rows, largest first.
    for row in rows {
        let fill = shade(row.crashes);
        chart
            .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
            .map_err(render_err)?
            .label(format!("{} ({})", row.region, format_int(row.crashes)))
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], fill.filled()));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    log::info!("Region map saved as {}", path.display());
    Ok(())
}

/// Line plus point markers of crashes per month.
pub fn monthly_chart(path: &Path, points: &[(NaiveDate, usize)]) -> Result<(), OutputError> {
    let root = SVGBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let title = "Monthly Crash Incidents";
    let (Some(&(first, _)), Some(&(last, _))) = (points.first(), points.last()) else {
        return no_data(&root, title);
    };
    let last = if last > first {
        last
    } else {
        first.checked_add_months(Months::new(1)).unwrap_or(last)
    };
    let max = points.iter().map(|p| p.1).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, 0f64..y_ceiling(max))
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Total Crash Incidents per Month")
        .x_label_formatter(&|d| d.format("%Y").to_string())
        .y_label_formatter(&|v| format_int(*v as u64))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|(d, c)| (*d, *c as f64)),
            &LINE_COLOR,
        ))
        .map_err(render_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|(d, c)| Circle::new((*d, *c as f64), 2, LINE_COLOR.filled())),
        )
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    log::info!("Monthly chart saved as {}", path.display());
    Ok(())
}

/// Line plus point markers of crashes per hour of day.
pub fn hourly_chart(path: &Path, points: &[(u32, usize)]) -> Result<(), OutputError> {
    let root = SVGBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let max = points.iter().map(|p| p.1).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Hourly Crash Incidents", (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0u32..23u32, 0f64..y_ceiling(max))
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .x_labels(8)
        .x_desc("Hour")
        .y_desc("Total Crash Incidents")
        .x_label_formatter(&|h| hour_label(*h))
        .y_label_formatter(&|v| format_int(*v as u64))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|(h, c)| (*h, *c as f64)),
            &LINE_COLOR,
        ))
        .map_err(render_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|(h, c)| Circle::new((*h, *c as f64), 2, LINE_COLOR.filled())),
        )
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    log::info!("Hourly chart saved as {}", path.display());
    Ok(())
}

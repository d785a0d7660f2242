use crate::config::ChartConfig;
use crate::model::OutlierRow;
use crate::outliers::Window;
use crate::weekday::WeekdayReport;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use plotters::prelude::*;
use std::path::Path;

const BAND_COLOR: RGBColor = RGBColor(0, 114, 178);

/// Draw the per-weekday means as a bar chart, Monday first.
pub fn draw_weekday_chart<P: AsRef<Path>>(
    file: P,
    report: &WeekdayReport,
    title: &str,
    cfg: &ChartConfig,
) -> Result<()> {
    let means = report.chart_order();
    if means.is_empty() {
        bail!("no weekday means to draw");
    }
    let n_bars = means.len() as u32;
    let (mut y_min, y_max) = padded_range(means.iter().map(|mean| mean.mean).chain([0.0]))?;
    if means.iter().all(|mean| mean.mean >= 0.0) {
        y_min = 0.0;
    }

    let root = SVGBackend::new(file.as_ref(), (cfg.width, cfg.height)).into_drawing_area();
    root.fill(&WHITE).context("failed to fill background")?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .caption(title, ("sans-serif", 24.0).into_font())
        .build_cartesian_2d((0..n_bars).into_segmented(), y_min..y_max)
        .context("failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(means.len())
        .x_label_formatter(&|x| match x {
            SegmentValue::Exact(i_bar) | SegmentValue::CenterOf(i_bar) => means
                .get(*i_bar as usize)
                .map_or_else(String::new, |mean| mean.name().to_string()),
            SegmentValue::Last => String::new(),
        })
        .x_desc("weekday")
        .draw()
        .context("failed to draw mesh")?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAND_COLOR.filled())
                .margin(20)
                .data(
                    means
                        .iter()
                        .enumerate()
                        .map(|(i_bar, mean)| (i_bar as u32, mean.mean)),
                ),
        )
        .context("failed to draw bars")?;

    root.present().context("failed to write chart")?;

    Ok(())
}

/// Draw the forecast with its prediction band and overlay the outliers.
///
/// `rows` are the rows inside `window`, sorted by timestamp. The x axis
/// spans the window where its bounds are set and the data otherwise.
pub fn draw_outlier_chart<P: AsRef<Path>>(
    file: P,
    rows: &[&OutlierRow],
    window: Window,
    cfg: &ChartConfig,
) -> Result<()> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        bail!("no forecast rows inside the display window");
    };
    let x_min = window.start.unwrap_or(first.timestamp);
    let mut x_max = window.end.unwrap_or(last.timestamp);
    if x_max <= x_min {
        x_max = x_min + Duration::days(1);
    }

    let (y_min, y_max) = padded_range(
        rows.iter()
            .flat_map(|row| [Some(row.lower), Some(row.upper), row.observed])
            .flatten(),
    )?;

    let root = SVGBackend::new(file.as_ref(), (cfg.width, cfg.height)).into_drawing_area();
    root.fill(&WHITE).context("failed to fill background")?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(utc(x_min)..utc(x_max), y_min..y_max)
        .context("failed to build chart")?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_label_formatter(&|x| x.format("%Y-%m-%d").to_string())
        .x_labels(10)
        .x_desc("ds")
        .y_desc("y")
        .draw()
        .context("failed to draw mesh")?;

    // Band: upper bound left to right, then lower bound back.
    let band: Vec<_> = rows
        .iter()
        .map(|row| (utc(row.timestamp), row.upper))
        .chain(rows.iter().rev().map(|row| (utc(row.timestamp), row.lower)))
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(band, BAND_COLOR.mix(0.2).filled())))
        .context("failed to draw prediction band")?;

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (utc(row.timestamp), row.estimate)),
            BAND_COLOR.stroke_width(2),
        ))
        .context("failed to draw estimate")?
        .label("yhat")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BAND_COLOR.stroke_width(2)));

    chart
        .draw_series(rows.iter().filter_map(|row| {
            row.observed
                .map(|val| Circle::new((utc(row.timestamp), val), 2, BLACK.filled()))
        }))
        .context("failed to draw observations")?
        .label("y")
        .legend(|(x, y)| Circle::new((x, y), 2, BLACK.filled()));

    chart
        .draw_series(rows.iter().filter_map(|row| {
            row.outlier
                .map(|val| Circle::new((utc(row.timestamp), val), 4, RED.filled()))
        }))
        .context("failed to draw outliers")?
        .label("outlier")
        .legend(|(x, y)| Circle::new((x, y), 4, RED.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("failed to draw legend")?;

    root.present().context("failed to write chart")?;

    Ok(())
}

fn utc(timestamp: NaiveDateTime) -> DateTime<Utc> {
    timestamp.and_utc()
}

/// Value range with a 5% margin on each side.
fn padded_range(vals: impl Iterator<Item = f64>) -> Result<(f64, f64)> {
    let (min, max) = vals
        .filter(|val| val.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), val| {
            (min.min(val), max.max(val))
        });
    if min > max {
        bail!("no finite values to draw");
    }
    let pad = if max > min { 0.05 * (max - min) } else { 1.0 };
    Ok((min - pad, max + pad))
}

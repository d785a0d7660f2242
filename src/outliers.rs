use crate::model::{ForecastPoint, ForecastRow, Observation, OutlierRow};
use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, io::Write};

/// Display window, both bounds inclusive and optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Window {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Window {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| start <= timestamp)
            && self.end.is_none_or(|end| timestamp <= end)
    }
}

/// Rows inside `window`, in timestamp order.
pub fn window_rows(rows: &[OutlierRow], window: Window) -> Vec<&OutlierRow> {
    let mut rows: Vec<_> = rows
        .iter()
        .filter(|row| window.contains(row.timestamp))
        .collect();
    rows.sort_by_key(|row| row.timestamp);
    rows
}

/// Forecast rows joined with the observed series.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub rows: Vec<ForecastRow>,

    /// Observations with no forecast row at the same timestamp.
    pub n_unmatched: usize,
}

/// Join the observed series onto the forecast by timestamp.
///
/// Every forecast row is kept; those without an observation get `None`.
///
/// # Errors
/// Returns an error if two observations share a timestamp.
pub fn join(forecast: &[ForecastPoint], observed: &[Observation]) -> Result<Joined> {
    let mut obs_map = BTreeMap::new();
    for obs in observed {
        if obs_map.insert(obs.timestamp, obs.value).is_some() {
            bail!("duplicate observed timestamp {}", obs.timestamp);
        }
    }

    let mut n_matched = 0;
    let rows = forecast
        .iter()
        .map(|point| {
            let observed = obs_map.get(&point.timestamp).copied();
            if observed.is_some() {
                n_matched += 1;
            }
            ForecastRow {
                timestamp: point.timestamp,
                estimate: point.estimate,
                lower: point.lower,
                upper: point.upper,
                observed: observed.flatten(),
            }
        })
        .collect();

    // Duplicate forecast timestamps may match the same observation twice.
    let n_unmatched = obs_map.len().saturating_sub(n_matched);

    Ok(Joined { rows, n_unmatched })
}

/// Closed interval membership.
pub fn is_within(val: f64, lower: f64, upper: f64) -> bool {
    lower <= val && val <= upper
}

/// Flag observations outside their prediction interval.
pub fn detect(rows: &[ForecastRow]) -> Vec<OutlierRow> {
    rows.iter()
        .map(|row| OutlierRow {
            timestamp: row.timestamp,
            estimate: row.estimate,
            lower: row.lower,
            upper: row.upper,
            observed: row.observed,
            outlier: row
                .observed
                .filter(|&val| !is_within(val, row.lower, row.upper)),
        })
        .collect()
}

#[derive(Serialize)]
struct OutlierRecord {
    ds: String,
    y_real: Option<f64>,
    yhat: f64,
    yhat_lower: f64,
    yhat_upper: f64,
    outlier: Option<f64>,
}

/// Write flagged rows as CSV. Absent values are left empty.
pub fn write_csv<W: Write>(rows: &[OutlierRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(OutlierRecord {
            ds: row.timestamp.to_string(),
            y_real: row.observed,
            yhat: row.estimate,
            yhat_lower: row.lower,
            yhat_upper: row.upper,
            outlier: row.outlier,
        })
        .context("failed to serialize outlier record")?;
    }
    wtr.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Text table of the first rows.
pub struct Preview<'a>(pub &'a [OutlierRow]);

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn cell(val: Option<f64>) -> String {
            val.map_or_else(|| "NaN".into(), |val| format!("{val:.6}"))
        }

        writeln!(
            f,
            "{:<20} {:>16} {:>16} {:>16} {:>16}",
            "ds", "y_real", "yhat_lower", "yhat_upper", "outlier"
        )?;
        for row in self.0 {
            writeln!(
                f,
                "{:<20} {:>16} {:>16.6} {:>16.6} {:>16}",
                row.timestamp.to_string(),
                cell(row.observed),
                row.lower,
                row.upper,
                cell(row.outlier)
            )?;
        }
        Ok(())
    }
}

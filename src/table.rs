//! CSV table input.
//!
//! Columns are looked up by header name, so input files may carry extra
//! columns in any order.

use crate::model::{ForecastPoint, Observation, Reading};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use std::{fs::File, io::Read, path::Path};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Values treated as missing, besides the empty string.
const MISSING_VALUES: [&str; 4] = ["NaN", "nan", "NA", "null"];

/// Column names of the forecast table.
#[derive(Debug, Clone, Copy)]
pub struct ForecastColumns<'a> {
    pub timestamp: &'a str,
    pub estimate: &'a str,
    pub lower: &'a str,
    pub upper: &'a str,
}

/// Reader configuration shared by all tables.
pub fn builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.trim(Trim::All);
    builder
}

/// Open a CSV file with a header row.
pub fn open<P: AsRef<Path>>(file: P) -> Result<Reader<File>> {
    let file = file.as_ref();
    builder()
        .from_path(file)
        .with_context(|| format!("failed to open {file:?}"))
}

/// Parse a timestamp.
///
/// Accepts plain dates (taken at midnight), naive date-times with a space
/// or `T` separator, and RFC 3339 date-times, which keep their local wall
/// time so that the calendar day is the one the reading was taken on.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(date_time);
        }
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Ok(date_time.naive_local());
    }
    bail!("unrecognized timestamp {text:?}");
}

/// Parse a numeric cell, mapping missing markers and NaN in any spelling
/// to `None`.
pub fn parse_value(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() || MISSING_VALUES.contains(&text) {
        return Ok(None);
    }
    let val: f64 = text
        .parse()
        .with_context(|| format!("invalid number {text:?}"))?;
    Ok(Some(val).filter(|val| !val.is_nan()))
}

/// Read consumption readings.
pub fn read_readings<R: Read>(
    rdr: Reader<R>,
    timestamp_column: &str,
    value_column: &str,
) -> Result<Vec<Reading>> {
    let series = read_series(rdr, timestamp_column, value_column)?;
    Ok(series
        .into_iter()
        .map(|(timestamp, consumption)| Reading {
            timestamp,
            consumption,
        })
        .collect())
}

/// Read the observed series joined against the forecast.
pub fn read_observed<R: Read>(
    rdr: Reader<R>,
    timestamp_column: &str,
    value_column: &str,
) -> Result<Vec<Observation>> {
    let series = read_series(rdr, timestamp_column, value_column)?;
    Ok(series
        .into_iter()
        .map(|(timestamp, value)| Observation { timestamp, value })
        .collect())
}

/// Read the forecast table.
///
/// The estimate and both interval bounds are required on every row.
pub fn read_forecast<R: Read>(
    mut rdr: Reader<R>,
    columns: ForecastColumns,
) -> Result<Vec<ForecastPoint>> {
    let headers = rdr.headers().context("failed to read headers")?.clone();
    let i_timestamp = column_index(&headers, columns.timestamp)?;
    let i_estimate = column_index(&headers, columns.estimate)?;
    let i_lower = column_index(&headers, columns.lower)?;
    let i_upper = column_index(&headers, columns.upper)?;

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record.context("failed to read record")?;
        let line = record_line(&record);

        let point = forecast_point(&record, [i_timestamp, i_estimate, i_lower, i_upper], columns)
            .with_context(|| format!("invalid record at line {line}"))?;
        points.push(point);
    }
    Ok(points)
}

fn forecast_point(
    record: &StringRecord,
    [i_timestamp, i_estimate, i_lower, i_upper]: [usize; 4],
    columns: ForecastColumns,
) -> Result<ForecastPoint> {
    Ok(ForecastPoint {
        timestamp: timestamp_cell(record, i_timestamp, columns.timestamp)?,
        estimate: required_cell(record, i_estimate, columns.estimate)?,
        lower: required_cell(record, i_lower, columns.lower)?,
        upper: required_cell(record, i_upper, columns.upper)?,
    })
}

fn read_series<R: Read>(
    mut rdr: Reader<R>,
    timestamp_column: &str,
    value_column: &str,
) -> Result<Vec<(NaiveDateTime, Option<f64>)>> {
    let headers = rdr.headers().context("failed to read headers")?.clone();
    let i_timestamp = column_index(&headers, timestamp_column)?;
    let i_value = column_index(&headers, value_column)?;

    let mut series = Vec::new();
    for record in rdr.records() {
        let record = record.context("failed to read record")?;
        let line = record_line(&record);

        let timestamp = timestamp_cell(&record, i_timestamp, timestamp_column)
            .with_context(|| format!("invalid record at line {line}"))?;
        let value = cell(&record, i_value, value_column)
            .and_then(parse_value)
            .with_context(|| format!("invalid column {value_column:?}"))
            .with_context(|| format!("invalid record at line {line}"))?;

        series.push((timestamp, value));
    }
    Ok(series)
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .with_context(|| format!("missing column {name:?}"))
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map_or(0, |pos| pos.line())
}

fn cell<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str> {
    record
        .get(idx)
        .with_context(|| format!("missing value for column {name:?}"))
}

fn timestamp_cell(record: &StringRecord, idx: usize, name: &str) -> Result<NaiveDateTime> {
    cell(record, idx, name)
        .and_then(parse_timestamp)
        .with_context(|| format!("invalid column {name:?}"))
}

fn required_cell(record: &StringRecord, idx: usize, name: &str) -> Result<f64> {
    cell(record, idx, name)
        .and_then(parse_value)?
        .with_context(|| format!("missing value for column {name:?}"))
}

use chrono::NaiveDateTime;

/// Single consumption reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,

    /// Missing values are kept as `None` and skipped by the aggregation.
    pub consumption: Option<f64>,
}

/// Observed value of the series the forecast was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,

    pub value: Option<f64>,
}

/// Row of the forecast table, before joining the observed series.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,

    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Forecast row with the observed value at the same timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub timestamp: NaiveDateTime,

    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,

    pub observed: Option<f64>,
}

/// Forecast row flagged by the outlier detector.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierRow {
    pub timestamp: NaiveDateTime,

    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,

    pub observed: Option<f64>,

    /// Observed value if it falls outside `[lower, upper]`.
    pub outlier: Option<f64>,
}

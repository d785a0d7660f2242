use crate::outliers::Window;
use crate::table::parse_timestamp;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Analysis configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Weekday aggregation settings.
    pub weekday: Option<WeekdayConfig>,

    /// Outlier detection settings.
    pub outliers: Option<OutliersConfig>,

    /// Chart output settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekdayConfig {
    /// CSV file with the consumption readings.
    pub readings: String,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Bar chart title.
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutliersConfig {
    /// CSV file with the forecast and its prediction interval.
    pub forecast: String,
    /// CSV file with the observed series.
    pub observed: String,

    #[serde(default = "default_forecast_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_estimate_column")]
    pub estimate_column: String,
    #[serde(default = "default_lower_column")]
    pub lower_column: String,
    #[serde(default = "default_upper_column")]
    pub upper_column: String,
    #[serde(default = "default_observed_column")]
    pub observed_column: String,

    /// Start of the display window (inclusive).
    pub window_start: Option<String>,
    /// End of the display window (inclusive).
    pub window_end: Option<String>,

    /// Number of rows printed in the preview table.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_timestamp_column() -> String {
    "timestamp".into()
}

fn default_value_column() -> String {
    "consumption".into()
}

fn default_title() -> String {
    "total consumption per day of the week".into()
}

fn default_forecast_timestamp_column() -> String {
    "ds".into()
}

fn default_estimate_column() -> String {
    "yhat".into()
}

fn default_lower_column() -> String {
    "yhat_lower".into()
}

fn default_upper_column() -> String {
    "yhat_upper".into()
}

fn default_observed_column() -> String {
    "y".into()
}

fn default_preview_rows() -> usize {
    5
}

fn default_width() -> u32 {
    1800
}

fn default_height() -> u32 {
    800
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded. Performs validation on all
    /// parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        Self::parse(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(weekday) = &self.weekday {
            weekday.validate().context("invalid weekday section")?;
        }
        if let Some(outliers) = &self.outliers {
            outliers.validate().context("invalid outliers section")?;
        }

        check_num(self.chart.width, 100..=10_000).context("invalid chart width")?;
        check_num(self.chart.height, 100..=10_000).context("invalid chart height")?;

        Ok(())
    }
}

impl WeekdayConfig {
    fn validate(&self) -> Result<()> {
        check_name(&self.readings).context("invalid readings file")?;
        check_name(&self.timestamp_column).context("invalid timestamp column")?;
        check_name(&self.value_column).context("invalid value column")?;
        Ok(())
    }
}

impl OutliersConfig {
    fn validate(&self) -> Result<()> {
        check_name(&self.forecast).context("invalid forecast file")?;
        check_name(&self.observed).context("invalid observed file")?;

        check_name(&self.timestamp_column).context("invalid timestamp column")?;
        check_name(&self.estimate_column).context("invalid estimate column")?;
        check_name(&self.lower_column).context("invalid lower bound column")?;
        check_name(&self.upper_column).context("invalid upper bound column")?;
        check_name(&self.observed_column).context("invalid observed column")?;

        let window = self.window()?;
        if let (Some(start), Some(end)) = (window.start, window.end)
            && start >= end
        {
            bail!("window start {start} must be before window end {end}");
        }

        check_num(self.preview_rows, 0..=1000).context("invalid number of preview rows")?;

        Ok(())
    }

    /// Parsed display window.
    pub fn window(&self) -> Result<Window> {
        let start = self
            .window_start
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("invalid window start")?;
        let end = self
            .window_end
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("invalid window end")?;
        Ok(Window { start, end })
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("name must not be empty");
    }
    Ok(())
}

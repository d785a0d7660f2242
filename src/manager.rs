use crate::config::Config;
use crate::outliers::{self, Preview};
use crate::plot::{draw_outlier_chart, draw_weekday_chart};
use crate::table::{self, ForecastColumns};
use crate::weekday;
use anyhow::{Context, Result, bail};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

const OUTPUT_NAMES: [&str; 2] = ["weekday", "outliers"];
const REPORT_SUFFIX: &str = "-report.csv";
const CHART_SUFFIX: &str = "-chart.svg";

pub struct Manager {
    work_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(work_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { work_dir, cfg })
    }

    pub fn run_weekday(&self) -> Result<()> {
        let Some(weekday_cfg) = &self.cfg.weekday else {
            bail!("config has no weekday section");
        };

        let readings_file = self.work_dir.join(&weekday_cfg.readings);
        let readings = table::read_readings(
            table::open(&readings_file)?,
            &weekday_cfg.timestamp_column,
            &weekday_cfg.value_column,
        )
        .with_context(|| format!("failed to read {readings_file:?}"))?;
        log::info!("read {} readings from {readings_file:?}", readings.len());

        let report = weekday::aggregate(&readings);
        if report.n_skipped() > 0 {
            log::warn!("skipped {} readings with missing values", report.n_skipped());
        }
        if report.is_empty() {
            bail!("no readings with values in {readings_file:?}");
        }
        log::info!("aggregated readings over {} weekdays", report.len());

        print!("{report}");

        let report_file = self.report_file(OUTPUT_NAMES[0]);
        report
            .write_csv(BufWriter::new(create(&report_file)?))
            .with_context(|| format!("failed to write {report_file:?}"))?;
        log::info!("wrote {report_file:?}");

        let chart_file = self.chart_file(OUTPUT_NAMES[0]);
        draw_weekday_chart(&chart_file, &report, &weekday_cfg.title, &self.cfg.chart)
            .with_context(|| format!("failed to draw {chart_file:?}"))?;
        log::info!("wrote {chart_file:?}");

        Ok(())
    }

    pub fn run_outliers(&self) -> Result<()> {
        let Some(outliers_cfg) = &self.cfg.outliers else {
            bail!("config has no outliers section");
        };
        let window = outliers_cfg.window()?;

        let forecast_file = self.work_dir.join(&outliers_cfg.forecast);
        let columns = ForecastColumns {
            timestamp: &outliers_cfg.timestamp_column,
            estimate: &outliers_cfg.estimate_column,
            lower: &outliers_cfg.lower_column,
            upper: &outliers_cfg.upper_column,
        };
        let forecast = table::read_forecast(table::open(&forecast_file)?, columns)
            .with_context(|| format!("failed to read {forecast_file:?}"))?;
        log::info!("read {} forecast rows from {forecast_file:?}", forecast.len());

        let observed_file = self.work_dir.join(&outliers_cfg.observed);
        let observed = table::read_observed(
            table::open(&observed_file)?,
            &outliers_cfg.timestamp_column,
            &outliers_cfg.observed_column,
        )
        .with_context(|| format!("failed to read {observed_file:?}"))?;
        log::info!("read {} observations from {observed_file:?}", observed.len());

        let joined = outliers::join(&forecast, &observed).context("failed to join series")?;
        if joined.n_unmatched > 0 {
            log::warn!(
                "dropped {} observations with no forecast row",
                joined.n_unmatched
            );
        }
        let n_inverted = joined.rows.iter().filter(|row| row.lower > row.upper).count();
        if n_inverted > 0 {
            log::warn!("{n_inverted} forecast rows have a lower bound above the upper bound");
        }

        let rows = outliers::detect(&joined.rows);
        let n_outliers = rows.iter().filter(|row| row.outlier.is_some()).count();
        log::info!("found {n_outliers} outliers in {} rows", rows.len());

        let shown = outliers::window_rows(&rows, window);
        if shown.is_empty() {
            bail!("no forecast rows inside the display window {window:?}");
        }

        let n_preview = outliers_cfg.preview_rows.min(rows.len());
        print!("{}", Preview(&rows[..n_preview]));

        let outliers_file = self.report_file(OUTPUT_NAMES[1]);
        outliers::write_csv(&rows, BufWriter::new(create(&outliers_file)?))
            .with_context(|| format!("failed to write {outliers_file:?}"))?;
        log::info!("wrote {outliers_file:?}");

        let chart_file = self.chart_file(OUTPUT_NAMES[1]);
        draw_outlier_chart(&chart_file, &shown, window, &self.cfg.chart)
            .with_context(|| format!("failed to draw {chart_file:?}"))?;
        log::info!("wrote {chart_file:?}");

        Ok(())
    }

    pub fn clean(&self) -> Result<()> {
        let outputs = OUTPUT_NAMES
            .iter()
            .flat_map(|name| [self.report_file(name), self.chart_file(name)]);
        for file in outputs {
            if !file.is_file() {
                continue;
            }
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }

        Ok(())
    }

    fn report_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(format!("{name}{REPORT_SUFFIX}"))
    }

    fn chart_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(format!("{name}{CHART_SUFFIX}"))
    }
}

fn create(file: &Path) -> Result<File> {
    File::create(file).with_context(|| format!("failed to create {file:?}"))
}

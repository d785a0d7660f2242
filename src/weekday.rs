use crate::model::Reading;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use chrono::{Datelike, Weekday};
use serde::Serialize;
use std::{fmt, io::Write};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English name of a weekday.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Mean consumption of one weekday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekdayMean {
    pub weekday: Weekday,
    pub mean: f64,
    pub std_dev: f64,
    pub n_vals: usize,
}

impl WeekdayMean {
    pub fn name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    /// Calendar index, Monday is 0 and Sunday is 6.
    pub fn ordinal(&self) -> u32 {
        self.weekday.num_days_from_monday()
    }
}

#[derive(Serialize)]
struct WeekdayRecord {
    weekday: &'static str,
    weekday_num: u32,
    mean: f64,
    std_dev: f64,
    n_vals: usize,
}

/// Groups readings by weekday and accumulates their mean.
pub struct WeekdayAggregator {
    acc_vec: Vec<Accumulator>,
    n_skipped: usize,
}

impl WeekdayAggregator {
    pub fn new() -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(WEEKDAYS.len(), Accumulator::new);
        Self {
            acc_vec,
            n_skipped: 0,
        }
    }

    /// Add a reading. Missing and non-finite values are skipped.
    pub fn add(&mut self, reading: &Reading) {
        match reading.consumption {
            Some(val) if val.is_finite() => {
                let i_day = reading.timestamp.weekday().num_days_from_monday() as usize;
                self.acc_vec[i_day].add(val);
            }
            _ => self.n_skipped += 1,
        }
    }

    pub fn report(&self) -> WeekdayReport {
        let means = WEEKDAYS
            .iter()
            .zip(&self.acc_vec)
            .map(|(&weekday, acc)| (weekday, acc.report()))
            .filter(|(_, report)| report.n_vals > 0)
            .map(|(weekday, report)| WeekdayMean {
                weekday,
                mean: report.mean,
                std_dev: report.std_dev,
                n_vals: report.n_vals,
            })
            .collect();
        WeekdayReport {
            means,
            n_skipped: self.n_skipped,
        }
    }
}

/// Aggregate readings into per-weekday means.
pub fn aggregate(readings: &[Reading]) -> WeekdayReport {
    let mut aggregator = WeekdayAggregator::new();
    for reading in readings {
        aggregator.add(reading);
    }
    aggregator.report()
}

/// Per-weekday means, one entry per weekday present in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayReport {
    // Stored in calendar order.
    means: Vec<WeekdayMean>,
    n_skipped: usize,
}

impl WeekdayReport {
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Number of readings left out because their value was missing.
    pub fn n_skipped(&self) -> usize {
        self.n_skipped
    }

    /// Entries sorted by descending mean, ties in calendar order.
    pub fn report_order(&self) -> Vec<WeekdayMean> {
        let mut means = self.means.clone();
        means.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        means
    }

    /// Entries in calendar order, Monday first.
    pub fn chart_order(&self) -> &[WeekdayMean] {
        &self.means
    }

    /// Write the report order as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for mean in self.report_order() {
            wtr.serialize(WeekdayRecord {
                weekday: mean.name(),
                weekday_num: mean.ordinal(),
                mean: mean.mean,
                std_dev: mean.std_dev,
                n_vals: mean.n_vals,
            })
            .context("failed to serialize weekday record")?;
        }
        wtr.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

impl fmt::Display for WeekdayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>16}", "weekday", "mean")?;
        for mean in self.report_order() {
            writeln!(f, "{:<10} {:>16.6}", mean.name(), mean.mean)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_timestamp;

    fn reading(date: &str, consumption: f64) -> Reading {
        Reading {
            timestamp: parse_timestamp(date).unwrap(),
            consumption: Some(consumption),
        }
    }

    #[test]
    fn mondays_and_tuesday() {
        // 2016-01-04 and the following Mondays, plus one Tuesday.
        let readings = vec![
            reading("2016-01-04", 10.0),
            reading("2016-01-05", 5.0),
            reading("2016-01-11", 20.0),
            reading("2016-01-18", 30.0),
        ];
        let report = aggregate(&readings);

        assert_eq!(report.len(), 2);

        let report_order = report.report_order();
        assert_eq!(report_order[0].name(), "Monday");
        assert!((report_order[0].mean - 20.0).abs() < 1e-12);
        assert_eq!(report_order[0].n_vals, 3);
        assert_eq!(report_order[1].name(), "Tuesday");
        assert_eq!(report_order[1].mean, 5.0);

        let chart_order: Vec<_> = report.chart_order().iter().map(|m| m.name()).collect();
        assert_eq!(chart_order, ["Monday", "Tuesday"]);
    }

    #[test]
    fn orders_and_bounds() {
        // Four weeks of hourly readings, value depending on hour and day.
        let start = parse_timestamp("2016-01-01 00:00:00").unwrap();
        let readings: Vec<_> = (0..24 * 28)
            .map(|i_hour| {
                let timestamp = start + chrono::Duration::hours(i_hour);
                Reading {
                    timestamp,
                    consumption: Some(((i_hour * 37) % 101) as f64),
                }
            })
            .collect();
        let report = aggregate(&readings);

        assert_eq!(report.len(), 7);

        let report_order = report.report_order();
        assert!(report_order.windows(2).all(|w| w[0].mean >= w[1].mean));

        let chart_order = report.chart_order();
        assert!(chart_order.windows(2).all(|w| w[0].ordinal() < w[1].ordinal()));
        assert_eq!(chart_order[0].weekday, Weekday::Mon);
        assert_eq!(chart_order[6].weekday, Weekday::Sun);

        assert_eq!(aggregate(&readings), report);
    }

    #[test]
    fn ties_keep_calendar_order() {
        let readings = vec![
            reading("2016-01-10", 7.0),
            reading("2016-01-06", 7.0),
            reading("2016-01-04", 7.0),
        ];
        let names: Vec<_> = aggregate(&readings)
            .report_order()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, ["Monday", "Wednesday", "Sunday"]);
    }

    #[test]
    fn skips_missing_values() {
        let mut readings = vec![reading("2016-01-04", 10.0), reading("2016-01-04", f64::NAN)];
        readings.push(Reading {
            timestamp: parse_timestamp("2016-01-05").unwrap(),
            consumption: None,
        });
        let report = aggregate(&readings);

        assert_eq!(report.len(), 1);
        assert_eq!(report.n_skipped(), 2);
        assert_eq!(report.chart_order()[0].mean, 10.0);
    }

    #[test]
    fn empty_input() {
        let report = aggregate(&[]);
        assert!(report.is_empty());
        assert!(report.report_order().is_empty());
    }

    #[test]
    fn csv_output() {
        let readings = vec![reading("2016-01-04", 2.0), reading("2016-01-05", 4.0)];
        let mut buffer = Vec::new();
        aggregate(&readings).write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "weekday,weekday_num,mean,std_dev,n_vals");
        assert!(lines[1].starts_with("Tuesday,1,4.0,"));
        assert!(lines[2].starts_with("Monday,0,2.0,"));
    }
}

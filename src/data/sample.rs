//! Synthetic traffic exports in each source's layout.
//!
//! A daily signal (trend + yearly and weekly seasonality + dips after the
//! calendar's update dates + noise) is aggregated to the source's granularity
//! and written the way the tool exports it:
//!
//! - Google Analytics: `#` header block with the date range, `Week Index,Users`, trailing total row
//! - Ahrefs: `Date,Organic Traffic`, one row per day
//! - Semrush: `Date,Organic Traffic`, one row per month (`YYYY-MM`)

use std::f64::consts::PI;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::calendar::HolidayCalendar;
use crate::domain::SourceKind;
use crate::error::{AppError, PipelineError, Stage};

/// Relative size of the post-update dip.
const UPDATE_DIP: f64 = 0.25;
/// Noise standard deviation relative to the level.
const NOISE_REL: f64 = 0.04;
const BASE_LEVEL: f64 = 1_000.0;
/// Trend growth per year, relative to the base level.
const GROWTH_PER_YEAR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub source: SourceKind,
    /// First date (GA week 0, first Ahrefs day, first Semrush month).
    pub start: Option<NaiveDate>,
    /// Rows to emit (weeks, days or months depending on the source).
    pub periods: Option<usize>,
    pub seed: u64,
}

impl SampleSpec {
    pub fn new(source: SourceKind, seed: u64) -> Self {
        Self {
            source,
            start: None,
            periods: None,
            seed,
        }
    }

    pub fn start(&self) -> NaiveDate {
        let (y, m, d) = match self.source {
            SourceKind::GoogleAnalytics => (2021, 1, 4),
            SourceKind::Ahrefs => (2022, 1, 1),
            SourceKind::Semrush => (2019, 1, 1),
        };
        self.start
            .or_else(|| NaiveDate::from_ymd_opt(y, m, d))
            .unwrap_or_default()
    }

    pub fn periods(&self) -> usize {
        self.periods.unwrap_or(match self.source {
            SourceKind::GoogleAnalytics => 156,
            SourceKind::Ahrefs => 900,
            SourceKind::Semrush => 60,
        })
    }
}

/// A generated export.
#[derive(Debug, Clone)]
pub struct SampleExport {
    pub source: SourceKind,
    pub content: String,
    /// Period start dates and the values written for them.
    pub rows: Vec<(NaiveDate, f64)>,
}

pub fn generate_sample(spec: &SampleSpec, calendar: &HolidayCalendar) -> Result<SampleExport, AppError> {
    let periods = spec.periods();
    if periods == 0 {
        return Err(AppError::new(2, "Sample periods must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let start = spec.start();
    let dips = dip_days(calendar);
    let mut daily = |date: NaiveDate| -> f64 {
        let level = daily_level(start, date, &dips);
        (level * (1.0 + NOISE_REL * rng.sample(normal))).max(0.0)
    };

    let mut rows = Vec::with_capacity(periods);
    match spec.source {
        SourceKind::GoogleAnalytics => {
            for w in 0..periods {
                let week_start = start + Duration::weeks(w as i64);
                let total: f64 = (0..7).map(|d| daily(week_start + Duration::days(d))).sum();
                rows.push((week_start, total.round()));
            }
        }
        SourceKind::Ahrefs => {
            for d in 0..periods {
                let date = start + Duration::days(d as i64);
                rows.push((date, daily(date).round()));
            }
        }
        SourceKind::Semrush => {
            let mut month = first_of_month(start);
            for _ in 0..periods {
                let next = next_month(month)
                    .ok_or_else(|| AppError::new(2, "Sample range runs past the supported calendar."))?;
                let total: f64 = month.iter_days().take_while(|d| *d < next).map(&mut daily).sum();
                rows.push((month, total.round()));
                month = next;
            }
        }
    }

    let content = render(spec.source, &rows).map_err(|e| AppError::new(4, format!("Failed to render sample CSV: {e}")))?;
    tracing::debug!(source = %spec.source, rows = rows.len(), seed = spec.seed, "generated sample export");

    Ok(SampleExport {
        source: spec.source,
        content,
        rows,
    })
}

pub fn write_sample(path: &Path, sample: &SampleExport) -> Result<(), PipelineError> {
    std::fs::write(path, &sample.content).map_err(|source| PipelineError::Io {
        stage: Stage::Export,
        path: path.to_path_buf(),
        source,
    })
}

/// Dates inside some update's effect window (after the event only).
fn dip_days(calendar: &HolidayCalendar) -> Vec<NaiveDate> {
    let after = i64::from(calendar.window().days_after);
    calendar
        .events()
        .iter()
        .flat_map(|e| (0..=after).filter_map(move |d| e.date.checked_add_signed(Duration::days(d))))
        .collect()
}

fn daily_level(start: NaiveDate, date: NaiveDate, dips: &[NaiveDate]) -> f64 {
    let t_years = (date - start).num_days() as f64 / 365.25;
    let doy = f64::from(date.ordinal0());
    let dow = f64::from(date.weekday().num_days_from_monday());

    let trend = BASE_LEVEL * (1.0 + GROWTH_PER_YEAR * t_years);
    let yearly = 0.15 * (2.0 * PI * doy / 365.25).cos();
    let weekly = if dow >= 5.0 { -0.2 } else { 0.05 };
    let dip = if dips.contains(&date) { -UPDATE_DIP } else { 0.0 };

    trend * (1.0 + yearly + weekly + dip)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
}

fn render(source: SourceKind, rows: &[(NaiveDate, f64)]) -> Result<String, csv::Error> {
    let mut w = csv::Writer::from_writer(Vec::new());
    match source {
        SourceKind::GoogleAnalytics => {
            w.write_record(["Week Index", "Users"])?;
            for (i, (_, v)) in rows.iter().enumerate() {
                w.write_record([i.to_string(), format!("{v:.0}")])?;
            }
        }
        SourceKind::Ahrefs => {
            w.write_record(["Date", "Organic Traffic"])?;
            for (d, v) in rows {
                w.write_record([d.format("%Y-%m-%d").to_string(), format!("{v:.0}")])?;
            }
        }
        SourceKind::Semrush => {
            w.write_record(["Date", "Organic Traffic"])?;
            for (d, v) in rows {
                w.write_record([d.format("%Y-%m").to_string(), format!("{v:.0}")])?;
            }
        }
    }
    let body = w.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    let body = String::from_utf8_lossy(&body).into_owned();

    if source != SourceKind::GoogleAnalytics {
        return Ok(body);
    }

    let (first, last) = match (rows.first(), rows.last()) {
        (Some((f, _)), Some((l, _))) => (*f, *l + Duration::days(6)),
        _ => return Ok(body),
    };
    let total: f64 = rows.iter().map(|(_, v)| v).sum();
    Ok(format!(
        "# ----------------------------------------\n\
         # All Web Site Data\n\
         # Audience Overview\n\
         # {}-{}\n\
         # ----------------------------------------\n\
         \n\
         {body}\n\
         ,{total:.0}\n",
        first.format("%Y%m%d"),
        last.format("%Y%m%d"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::{NormalizeOptions, RawUpload, header_start_date, normalize};

    #[test]
    fn same_seed_same_sample() {
        let spec = SampleSpec::new(SourceKind::Ahrefs, 7);
        let cal = HolidayCalendar::default();
        let a = generate_sample(&spec, &cal).unwrap();
        let b = generate_sample(&spec, &cal).unwrap();
        assert_eq!(a.content, b.content);
        let c = generate_sample(&SampleSpec::new(SourceKind::Ahrefs, 8), &cal).unwrap();
        assert_ne!(a.content, c.content);
    }

    #[test]
    fn every_source_sample_normalizes_back() {
        let cal = HolidayCalendar::default();
        for source in SourceKind::ALL {
            let spec = SampleSpec {
                periods: Some(40),
                ..SampleSpec::new(source, 1)
            };
            let sample = generate_sample(&spec, &cal).unwrap();
            let ingest = normalize(&RawUpload::new(sample.content.clone(), source), &NormalizeOptions::default())
                .unwrap_or_else(|e| panic!("{source}: {e}"));
            assert_eq!(ingest.series.len(), 40, "{source}");
            assert_eq!(ingest.series.first_date(), Some(spec.start()), "{source}");
            assert!(ingest.sniff_warning.is_none(), "{source}: {:?}", ingest.sniff_warning);
            let values: Vec<f64> = ingest.series.points().iter().map(|p| p.value).collect();
            let written: Vec<f64> = sample.rows.iter().map(|(_, v)| *v).collect();
            assert_eq!(values, written, "{source}");
        }
    }

    #[test]
    fn ga_header_carries_start_date_and_total_row() {
        let spec = SampleSpec {
            periods: Some(10),
            ..SampleSpec::new(SourceKind::GoogleAnalytics, 3)
        };
        let sample = generate_sample(&spec, &HolidayCalendar::default()).unwrap();
        assert_eq!(header_start_date(&sample.content), Some(spec.start()));
        assert!(sample.content.contains("# 20210104-20210314"));
        let total: f64 = sample.rows.iter().map(|(_, v)| v).sum();
        assert!(sample.content.trim_end().ends_with(&format!(",{total:.0}")));
    }

    #[test]
    fn semrush_rows_are_month_starts() {
        let spec = SampleSpec {
            periods: Some(14),
            start: NaiveDate::from_ymd_opt(2023, 11, 17),
            ..SampleSpec::new(SourceKind::Semrush, 2)
        };
        let sample = generate_sample(&spec, &HolidayCalendar::default()).unwrap();
        assert_eq!(sample.rows[0].0, NaiveDate::from_ymd_opt(2023, 11, 1).unwrap());
        assert_eq!(sample.rows[13].0, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert!(sample.content.contains("\n2024-02,"));
    }

    #[test]
    fn zero_periods_is_rejected() {
        let spec = SampleSpec {
            periods: Some(0),
            ..SampleSpec::new(SourceKind::Ahrefs, 0)
        };
        assert_eq!(generate_sample(&spec, &HolidayCalendar::default()).unwrap_err().exit_code(), 2);
    }
}

//! Command-line parsing for the traffic forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the normalization/forecasting code. Every flag that shapes a
//! run can also come from a `TRAFFIC_FORECAST_*` environment variable (or `.env`).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::calendar::EffectWindow;
use crate::domain::{
    DEFAULT_HORIZON_DAYS, DEFAULT_WINDOW_DAYS, EXPORT_FILENAME, Locale, MAX_HOLIDAY_WINDOW_DAYS, MAX_SPAN_DAYS,
    SourceKind,
};
use crate::io::ingest::parse_compact_date;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "tf",
    version,
    about = "Organic traffic forecaster for Google Analytics, Ahrefs and Semrush exports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize an export, fit the forecast, and print the period-over-period summary.
    Forecast(ForecastArgs),
    /// Normalize an export and print (or write) the canonical `ds,y` series.
    Normalize(NormalizeArgs),
    /// Print the holiday calendar used as forecast regressors.
    Holidays(HolidaysArgs),
    /// Write a synthetic export in a source's layout (for demos and testing).
    Sample(SampleArgs),
}

/// Which export to read and how to date it.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Exported CSV file.
    #[arg(short, long, value_name = "CSV", env = "TRAFFIC_FORECAST_INPUT")]
    pub input: PathBuf,

    /// Tool that produced the export (authoritative; content sniffing only warns).
    #[arg(short, long, value_enum, env = "TRAFFIC_FORECAST_SOURCE")]
    pub source: SourceKind,

    /// Google Analytics week-0 date (YYYYMMDD). Taken from the export header when omitted.
    #[arg(long, value_name = "YYYYMMDD", value_parser = parse_compact_date, env = "TRAFFIC_FORECAST_START_DATE")]
    pub start_date: Option<NaiveDate>,
}

/// Effect window around each calendar event.
#[derive(Debug, Args, Clone, Copy)]
pub struct HolidayWindowArgs {
    /// Days before each update included in its effect window.
    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_HOLIDAY_WINDOW_DAYS)),
        env = "TRAFFIC_FORECAST_HOLIDAY_DAYS_BEFORE"
    )]
    pub holiday_days_before: u32,

    /// Days after each update included in its effect window.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_HOLIDAY_WINDOW_DAYS)),
        env = "TRAFFIC_FORECAST_HOLIDAY_DAYS_AFTER"
    )]
    pub holiday_days_after: u32,
}

impl HolidayWindowArgs {
    pub fn window(&self) -> EffectWindow {
        EffectWindow {
            days_before: self.holiday_days_before,
            days_after: self.holiday_days_after,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub holidays: HolidayWindowArgs,

    /// Days to forecast past the last observation.
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_DAYS,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_SPAN_DAYS)),
        env = "TRAFFIC_FORECAST_HORIZON_DAYS"
    )]
    pub horizon_days: u32,

    /// Length of each compared window, in days.
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SPAN_DAYS)),
        env = "TRAFFIC_FORECAST_WINDOW_DAYS"
    )]
    pub window_days: u32,

    /// Language of the summary.
    #[arg(long, value_enum, default_value_t = Locale::En, env = "TRAFFIC_FORECAST_LOCALE")]
    pub locale: Locale,

    /// Write the forecast CSV. Without a value, writes `previsioni_traffico_futuro.csv`.
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = EXPORT_FILENAME)]
    pub export: Option<PathBuf>,

    /// Write a JSON run summary.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the canonical series as `ds,y` CSV instead of printing it.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone, Copy)]
pub struct HolidaysArgs {
    #[command(flatten)]
    pub holidays: HolidayWindowArgs,

    /// Language of the date labels.
    #[arg(long, value_enum, default_value_t = Locale::En, env = "TRAFFIC_FORECAST_LOCALE")]
    pub locale: Locale,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Layout of the generated export.
    #[arg(short, long, value_enum)]
    pub source: SourceKind,

    /// Output CSV path.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First date (YYYY-MM-DD); defaults depend on the source.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Rows to generate (weeks for GA, days for Ahrefs, months for Semrush).
    #[arg(long)]
    pub periods: Option<usize>,

    #[command(flatten)]
    pub holidays: HolidayWindowArgs,
}

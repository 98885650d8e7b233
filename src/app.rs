//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the forecast pipeline
//! - prints reports and writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::calendar::HolidayCalendar;
use crate::cli::{Command, ForecastArgs, HolidaysArgs, NormalizeArgs, SampleArgs};
use crate::domain::{EXPORT_MEDIA_TYPE, RunConfig};
use crate::error::{AppError, PipelineError};
use crate::io::ingest::{NormalizeOptions, RawUpload, normalize};

pub mod pipeline;

/// Entry point for the `tf` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Forecast(args) => handle_forecast(&args),
        Command::Normalize(args) => handle_normalize(&args),
        Command::Holidays(args) => handle_holidays(args),
        Command::Sample(args) => handle_sample(&args),
    }
}

/// Logs go to stderr so stdout stays the report. `RUST_LOG` overrides the default `warn`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_forecast(args: &ForecastArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let run = pipeline::run_forecast(&config)?;

    // Exports first, so a failed write leaves no report on stdout.
    let exported = write_exports(&config, &run)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.forecast, &run.comparison, config.locale)
    );
    if let Some(path) = exported {
        println!("Forecast written to {} ({EXPORT_MEDIA_TYPE})", path.display());
    }

    Ok(())
}

/// Write the optional forecast CSV and JSON summary; returns the CSV path if one was written.
fn write_exports(config: &RunConfig, run: &pipeline::RunOutput) -> Result<Option<PathBuf>, PipelineError> {
    let exported = match &config.export {
        Some(requested) => {
            let path = crate::io::export::forecast_export_path(Some(requested.as_path()));
            crate::io::export::write_forecast_csv(&path, &run.forecast.series)?;
            Some(path)
        }
        None => None,
    };
    if let Some(path) = &config.json {
        let summary = crate::report::RunSummary::new(&run.ingest, &run.calendar, &run.forecast, &run.comparison);
        crate::io::export::write_json(path, &summary)?;
    }
    Ok(exported)
}

fn handle_normalize(args: &NormalizeArgs) -> Result<(), AppError> {
    let upload = RawUpload::from_path(&args.input.input, args.input.source)?;
    let ingest = normalize(
        &upload,
        &NormalizeOptions {
            start_date: args.input.start_date,
        },
    )
    .map_err(crate::error::PipelineError::from)?;

    for e in &ingest.row_errors {
        eprintln!("line {}: {}", e.line, e.message);
    }
    match &args.output {
        Some(path) => {
            crate::io::export::write_canonical_csv(path, &ingest.series)?;
            eprintln!(
                "{} rows written to {} ({} dropped)",
                ingest.rows_used,
                path.display(),
                ingest.dropped()
            );
        }
        None => crate::io::export::write_canonical(std::io::stdout().lock(), &ingest.series)?,
    }
    Ok(())
}

fn handle_holidays(args: HolidaysArgs) -> Result<(), AppError> {
    let calendar = HolidayCalendar::google_updates(args.holidays.window());
    print!("{}", crate::report::format_holiday_table(&calendar, args.locale));
    Ok(())
}

fn handle_sample(args: &SampleArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        source: args.source,
        start: args.start,
        periods: args.periods,
        seed: args.seed,
    };
    let calendar = HolidayCalendar::google_updates(args.holidays.window());
    let sample = crate::data::generate_sample(&spec, &calendar)?;
    crate::data::write_sample(&args.output, &sample)?;
    println!(
        "Wrote {} {} rows to {}",
        sample.rows.len(),
        sample.source.display_name(),
        args.output.display()
    );
    Ok(())
}

pub fn run_config_from_args(args: &ForecastArgs) -> RunConfig {
    RunConfig {
        input: args.input.input.clone(),
        source: args.input.source,
        start_date: args.input.start_date,
        horizon_days: args.horizon_days,
        window_days: args.window_days,
        holiday_window: args.holidays.window(),
        locale: args.locale,
        export: args.export.clone(),
        json: args.json.clone(),
    }
}

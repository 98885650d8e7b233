//! Shared forecast pipeline logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! upload -> normalize -> forecast (fit + predict) -> compare
//!
//! The pipeline halts at the first error and never returns partial results;
//! presentation and exports happen in the caller once everything succeeded.

use crate::calendar::HolidayCalendar;
use crate::compare::compare_trailing_windows;
use crate::domain::{ComparisonResult, RunConfig};
use crate::error::PipelineError;
use crate::forecast::{AdditiveEngine, ForecastOutcome, forecast_series};
use crate::io::ingest::{IngestedSeries, NormalizeOptions, RawUpload, normalize};

/// All computed outputs of a single `tf forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedSeries,
    pub calendar: HolidayCalendar,
    pub forecast: ForecastOutcome,
    pub comparison: ComparisonResult,
}

/// Read the configured input file and run the pipeline on it.
pub fn run_forecast(config: &RunConfig) -> Result<RunOutput, PipelineError> {
    check_window(config)?;
    let upload = RawUpload::from_path(&config.input, config.source)?;
    run_forecast_with_upload(config, &upload)
}

/// Run the pipeline on an upload already in memory.
///
/// `config.input` and `config.source` are ignored in favour of the upload.
pub fn run_forecast_with_upload(config: &RunConfig, upload: &RawUpload) -> Result<RunOutput, PipelineError> {
    check_window(config)?;

    // 1) Normalize the export.
    let ingest = normalize(
        upload,
        &NormalizeOptions {
            start_date: config.start_date,
        },
    )?;

    // 2) Fit and predict with the update calendar as holidays.
    let calendar = HolidayCalendar::google_updates(config.holiday_window);
    let forecast = forecast_series(&AdditiveEngine::default(), &ingest.series, &calendar, config.horizon_days)?;

    // 3) Compare the trailing windows of the forecast.
    let comparison = compare_trailing_windows(&forecast.series, config.window_days)?;

    Ok(RunOutput {
        ingest,
        calendar,
        forecast,
        comparison,
    })
}

fn check_window(config: &RunConfig) -> Result<(), PipelineError> {
    if config.window_days == 0 {
        return Err(PipelineError::InvalidWindow {
            window_days: config.window_days,
        });
    }
    Ok(())
}

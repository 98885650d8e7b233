//! Export forecasts and canonical series to CSV, and run summaries to JSON.
//!
//! The CSV files are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{CanonicalSeries, EXPORT_FILENAME, ForecastSeries};
use crate::error::{PipelineError, Stage};

/// Resolve the forecast export path, defaulting to [`EXPORT_FILENAME`].
pub fn forecast_export_path(requested: Option<&Path>) -> PathBuf {
    match requested {
        Some(p) if p.is_dir() => p.join(EXPORT_FILENAME),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(EXPORT_FILENAME),
    }
}

/// Write the full forecast (`ds,yhat,yhat_lower,yhat_upper,trend,yearly,weekly,holidays`).
pub fn write_forecast_csv(path: &Path, forecast: &ForecastSeries) -> Result<(), PipelineError> {
    let mut writer = csv_writer(path)?;
    for point in &forecast.points {
        writer.serialize(point).map_err(|source| PipelineError::Csv {
            context: "writing forecast row".to_string(),
            source,
        })?;
    }
    flush(writer, path)?;
    tracing::info!(path = %path.display(), rows = forecast.points.len(), "wrote forecast CSV");
    Ok(())
}

/// Write the canonical series as `ds,y`.
pub fn write_canonical_csv(path: &Path, series: &CanonicalSeries) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        stage: Stage::Export,
        path: path.to_path_buf(),
        source,
    })?;
    write_canonical(file, series)
}

/// Write the canonical series as `ds,y` to any writer (e.g. stdout).
pub fn write_canonical<W: Write>(out: W, series: &CanonicalSeries) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_writer(out);
    for obs in series.points() {
        writer.serialize(obs).map_err(|source| PipelineError::Csv {
            context: "writing canonical row".to_string(),
            source,
        })?;
    }
    writer.flush().map_err(|e| PipelineError::Csv {
        context: "flushing canonical series".to_string(),
        source: e.into(),
    })
}

/// Write any serializable summary as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        stage: Stage::Export,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, value).map_err(|source| PipelineError::Json {
        context: format!("writing '{}'", path.display()),
        source,
    })
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        stage: Stage::Export,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::Writer::from_writer(file))
}

fn flush(mut writer: csv::Writer<File>, path: &Path) -> Result<(), PipelineError> {
    writer.flush().map_err(|source| PipelineError::Io {
        stage: Stage::Export,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ForecastPoint, Observation};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tf-export-{}-{name}", std::process::id()))
    }

    #[test]
    fn default_export_name() {
        assert_eq!(forecast_export_path(None), PathBuf::from("previsioni_traffico_futuro.csv"));
    }

    #[test]
    fn forecast_csv_has_expected_header() {
        let ds = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let forecast = ForecastSeries {
            points: vec![ForecastPoint {
                ds,
                yhat: 10.0,
                yhat_lower: 8.0,
                yhat_upper: 12.0,
                trend: 9.0,
                yearly: 1.0,
                weekly: 0.0,
                holidays: 0.0,
            }],
            history_end: ds,
        };
        let path = temp_path("forecast.csv");
        write_forecast_csv(&path, &forecast).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ds,yhat,yhat_lower,yhat_upper,trend,yearly,weekly,holidays")
        );
        assert_eq!(lines.next(), Some("2024-01-01,10.0,8.0,12.0,9.0,1.0,0.0,0.0"));
    }

    #[test]
    fn canonical_csv_uses_ds_y() {
        let series = CanonicalSeries::new(vec![Observation {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            value: 3.0,
        }])
        .unwrap();
        let path = temp_path("canonical.csv");
        write_canonical_csv(&path, &series).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text, "ds,y\n2024-01-01,3.0\n");
    }
}

//! Error types.
//!
//! Two layers:
//!
//! - [`SchemaError`] / [`PipelineError`] / [`ModelError`]: typed failures raised by
//!   the pipeline stages. Every `PipelineError` knows which [`Stage`] raised it.
//! - [`AppError`]: what the binary prints, with a process exit code.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{ColumnRole, DateWindow, SourceKind};

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), format!("{} failed: {err}", err.stage()))
    }
}

/// Pipeline component that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalizer,
    ForecastAdapter,
    ComparisonEngine,
    Export,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Normalizer => "schema normalizer",
            Stage::ForecastAdapter => "forecast adapter",
            Stage::ComparisonEngine => "comparison engine",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Unrecognized or malformed input structure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{kind} export is missing the {role} column (accepted names: {})", .accepted.join(", "))]
    MissingColumn {
        kind: SourceKind,
        role: ColumnRole,
        accepted: Vec<&'static str>,
    },

    #[error("missing parameter `{name}`: {hint}")]
    MissingParameter { name: &'static str, hint: &'static str },

    #[error("duplicate date {date}{}", fmt_lines(.lines))]
    DuplicateDate {
        date: NaiveDate,
        /// Input lines of the first and the repeated record, when known.
        lines: Option<(usize, usize)>,
    },

    #[error("no valid rows remain after normalization ({rows_read} read, {dropped} dropped)")]
    NoValidRows { rows_read: usize, dropped: usize },

    #[error("malformed input: {0}")]
    Malformed(String),
}

fn fmt_lines(lines: &Option<(usize, usize)>) -> String {
    match lines {
        Some((first, again)) => format!(" (lines {first} and {again})"),
        None => String::new(),
    }
}

/// Failures of the forecasting engine behind the adapter seam.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("history is empty")]
    EmptyHistory,

    #[error("least-squares system is singular for candidate {0}")]
    Singular(String),

    #[error("no candidate configuration could be fitted ({0})")]
    NoCandidates(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("insufficient data: {distinct_dates} distinct date(s), at least {required} required to fit a trend")]
    InsufficientData { distinct_dates: usize, required: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("comparison window of {window_days} day(s) is invalid: it must be at least one day and stay within the calendar range")]
    InvalidWindow { window_days: u32 },

    #[error("forecast horizon of {horizon_days} day(s) runs past the calendar range")]
    InvalidHorizon { horizon_days: u32 },

    #[error("forecast series is empty")]
    EmptyForecast,

    #[error(
        "baseline window {window} sums to zero; change against {sum_b:.2} is an infinite/undefined increase"
    )]
    DivisionByZero { window: DateWindow, sum_b: f64 },

    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error while {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Component that raised the error.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Schema(_) => Stage::Normalizer,
            PipelineError::InsufficientData { .. } | PipelineError::InvalidHorizon { .. } | PipelineError::Model(_) => {
                Stage::ForecastAdapter
            }
            PipelineError::InvalidWindow { .. }
            | PipelineError::EmptyForecast
            | PipelineError::DivisionByZero { .. } => Stage::ComparisonEngine,
            PipelineError::Io { stage, .. } => *stage,
            PipelineError::Csv { .. } | PipelineError::Json { .. } => Stage::Export,
        }
    }

    /// Exit code: 2 = input/config, 3 = degenerate data, 4 = engine failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Schema(_)
            | PipelineError::InvalidWindow { .. }
            | PipelineError::InvalidHorizon { .. }
            | PipelineError::Io { .. }
            | PipelineError::Csv { .. }
            | PipelineError::Json { .. } => 2,
            PipelineError::InsufficientData { .. }
            | PipelineError::EmptyForecast
            | PipelineError::DivisionByZero { .. } => 3,
            PipelineError::Model(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_names_role_and_synonyms() {
        let err = SchemaError::MissingColumn {
            kind: SourceKind::Ahrefs,
            role: ColumnRole::Value,
            accepted: vec!["Organic Traffic", "Traffic"],
        };
        let msg = err.to_string();
        assert!(msg.contains("Ahrefs"), "{msg}");
        assert!(msg.contains("value"), "{msg}");
        assert!(msg.contains("Organic Traffic, Traffic"), "{msg}");
    }

    #[test]
    fn app_error_carries_stage_and_exit_code() {
        let err = PipelineError::InsufficientData {
            distinct_dates: 1,
            required: 2,
        };
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().starts_with("forecast adapter failed"));
    }
}

//! Forecast model fitting.
//!
//! Responsibilities:
//!
//! - place trend changepoints
//! - fit each candidate configuration (parallel)
//! - select the best configuration using BIC + guardrails

pub mod changepoints;
pub mod fitter;
pub mod selection;

pub use changepoints::*;
pub use fitter::*;
pub use selection::*;

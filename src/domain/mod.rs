//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input selectors (`SourceKind`, `Locale`)
//! - the canonical traffic series (`CanonicalSeries`)
//! - forecast and comparison outputs (`ForecastSeries`, `ComparisonResult`)

pub mod types;

pub use types::*;

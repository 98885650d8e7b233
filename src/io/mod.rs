//! Input/output helpers.
//!
//! - CSV ingest + normalization (`ingest`)
//! - source sniffing (`sniff`)
//! - CSV/JSON exports (`export`)

pub mod export;
pub mod ingest;
pub mod sniff;

pub use export::*;
pub use ingest::*;

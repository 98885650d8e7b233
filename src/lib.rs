//! `traffic-forecast` library crate.
//!
//! The binary (`tf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the forecast engine sits behind a trait and can be swapped
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calendar;
pub mod cli;
pub mod compare;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

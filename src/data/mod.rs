//! Demo data: seeded synthetic exports for each supported source.

pub mod sample;

pub use sample::*;

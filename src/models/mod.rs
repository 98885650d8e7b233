//! Additive model implementation.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic.

pub mod additive;

pub use additive::*;

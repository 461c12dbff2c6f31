//! Utility library for the SUE-Sim performance analysis tools.

pub mod files;
pub mod other;
pub mod serde;

//! Small utilities shared across the crate.

pub mod logging;

pub use logging::LogThrottle;

//! Utility functions.

pub mod env;
pub mod time;

pub use time::unix_seconds;

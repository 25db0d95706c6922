//! Shared types and error helpers used across the ditzy crates.

pub mod error;
pub mod types;

pub use error::FromMessage;

//! Configuration loading, validation, and env substitution.
//!
//! Config files: `ditzy.toml`, `ditzy.yaml`, or `ditzy.json`
//! Searched in `./` then `~/.config/ditzy/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load, find_config_file, load_config, temp_dir},
    schema::{BotConfig, DitzyConfig, InboundConfig, MediaConfig, TempConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate_config},
};

//! Configuration validation.
//!
//! Reports syntax and type errors plus semantic problems that would make the
//! bot misbehave at runtime (empty prefix, zero timeouts, a TTL shorter than
//! a transcode can take).

use std::path::Path;

use crate::schema::DitzyConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "media.max_file_size"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate the config at `path`, or the discovered config when `None`.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    match crate::loader::load_config(&actual_path) {
        Ok(config) => {
            let mut diagnostics = Vec::new();
            check_semantics(&config, &mut diagnostics);
            ValidationResult {
                diagnostics,
                config_path: Some(actual_path),
            }
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to load config file: {e}"),
            )],
            config_path: Some(actual_path),
        },
    }
}

/// Semantic checks on an already-loaded config.
#[must_use]
pub fn validate_config(config: &DitzyConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantics(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();
    match toml::from_str::<DitzyConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("invalid config: {e}"),
        )),
    }
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantics(config: &DitzyConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.bot.prefix.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "bot.prefix",
            "command prefix must not be empty",
        ));
    }

    if config.bot.owner.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "bot.owner",
            "no owner configured; owner-only commands are unusable",
        ));
    }

    for (i, owner) in config.bot.owner.iter().enumerate() {
        if owner.starts_with('+') || owner.contains('@') {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "semantic",
                format!("bot.owner[{i}]"),
                format!("owner \"{owner}\" should be bare digits without '+' or a JID suffix"),
            ));
        }
    }

    if config.media.max_file_size == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "media.max_file_size",
            "max_file_size must be greater than zero",
        ));
    }

    for (path, value) in [
        ("media.download_timeout_secs", config.media.download_timeout_secs),
        ("media.transcode_timeout_secs", config.media.transcode_timeout_secs),
        ("temp.sweep_interval_secs", config.temp.sweep_interval_secs),
    ] {
        if value == 0 {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "semantic",
                path,
                "value must be greater than zero",
            ));
        }
    }

    if config.temp.ttl_secs <= config.media.transcode_timeout_secs {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "temp.ttl_secs",
            "TTL does not exceed the transcode timeout; the sweeper may delete in-flight artifacts",
        ));
    }
}

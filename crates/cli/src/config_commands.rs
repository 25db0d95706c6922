use std::{fmt::Write as _, path::Path};

use {anyhow::Result, clap::Subcommand};

use ditzy_config::{
    DitzyConfig,
    validate::{self, Severity, ValidationResult},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Validate {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (file merged over defaults) as JSON.
    Show,
}

pub fn handle_config(action: ConfigAction, config: &DitzyConfig, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Validate { verbose } => check(path, verbose),
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }
    eprint!("{}", render(&result, verbose));

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn render(result: &ValidationResult, verbose: bool) -> String {
    let mut out = String::new();
    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };

        if d.path.is_empty() {
            let _ = writeln!(out, "  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            let _ = writeln!(
                out,
                "  {BOLD}{color}{}{RESET} {}: {}",
                d.severity, d.path, d.message
            );
        }
        shown += 1;
    }

    if shown > 0 {
        out.push('\n');
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        out.push_str("No issues found.\n");
    } else {
        let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_config_reports_no_issues() {
        let result = validate::validate_toml_str("[bot]\nowner = [\"6281234567890\"]\n");
        assert_eq!(render(&result, false), "No issues found.\n");
    }

    #[test]
    fn errors_and_warnings_are_counted() {
        let result = validate::validate_toml_str("[bot]\nprefix = \"\"\n");
        let out = render(&result, false);
        assert!(out.contains("bot.prefix: command prefix must not be empty"));
        assert!(out.contains("bot.owner: no owner configured"));
        assert!(out.ends_with("1 error(s), 1 warning(s)\n"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = validate::validate(Some(&missing));
        assert!(result.has_errors());
        assert!(render(&result, false).contains("failed to load config file"));
    }

    #[test]
    fn info_only_shown_when_verbose() {
        let result = ValidationResult {
            diagnostics: vec![validate::Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
        assert_eq!(render(&result, false), "No issues found.\n");
        assert!(render(&result, true).contains("no config file found; using defaults"));
    }
}

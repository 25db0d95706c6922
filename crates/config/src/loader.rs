use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::DitzyConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["ditzy.toml", "ditzy.yaml", "ditzy.yml", "ditzy.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<DitzyConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ditzy.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/ditzy/ditzy.{toml,yaml,yml,json}` (user-global)
///
/// Returns `DitzyConfig::default()` if no config file is found or the file
/// fails to parse.
pub fn discover_and_load() -> DitzyConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return DitzyConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        DitzyConfig::default()
    })
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/ditzy/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ditzy").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory, falling back to `./.ditzy` when no home is known.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ditzy")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ditzy"))
}

/// Staging directory for temp artifacts: `temp.dir` or `<data dir>/temp`.
pub fn temp_dir(config: &DitzyConfig) -> PathBuf {
    config
        .temp
        .dir
        .clone()
        .unwrap_or_else(|| data_dir().join("temp"))
}

fn parse_config(raw: &str, path: &Path) -> Result<DitzyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

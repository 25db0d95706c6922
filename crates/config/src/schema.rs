//! Config schema types (bot identity, inbound filter, media limits, temp staging).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DitzyConfig {
    pub bot: BotConfig,
    pub inbound: InboundConfig,
    pub media: MediaConfig,
    pub temp: TempConfig,
}

/// Bot identity and command parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Display name used in replies and as the default sticker pack name.
    pub name: String,
    /// Command prefix, e.g. "." for `.sticker`.
    pub prefix: String,
    /// Owner phone numbers (digits only, no `+`). Glob `*` patterns allowed.
    pub owner: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "Ditzy Time".into(),
            prefix: ".".into(),
            owner: Vec::new(),
        }
    }
}

/// Which inbound envelopes reach the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundConfig {
    /// Envelopes older than this are dropped (replayed history after reconnect).
    pub max_message_age_secs: u64,
    /// Drop envelopes the bot sent itself.
    pub ignore_own_messages: bool,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            max_message_age_secs: 60,
            ignore_own_messages: true,
        }
    }
}

/// Media download and transcode limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Ceiling for non-sticker downloads, in bytes.
    pub max_file_size: usize,
    /// Overall timeout for one media download.
    pub download_timeout_secs: u64,
    /// Upper bound on one encode/decode.
    pub transcode_timeout_secs: u64,
    /// Sticker pack name when the command gives none. Falls back to `bot.name`.
    pub sticker_pack: Option<String>,
    /// Sticker author when the command gives none.
    pub sticker_author: String,
    /// Audio sent by `.music`, relative to the working directory.
    pub music_path: PathBuf,
    /// Image sent by `.welcome`.
    pub welcome_image: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            download_timeout_secs: 60,
            transcode_timeout_secs: 30,
            sticker_pack: None,
            sticker_author: "Simple Bot".into(),
            music_path: PathBuf::from("media/music.mp3"),
            welcome_image: PathBuf::from("media/welcome.jpg"),
        }
    }
}

/// Staging directory for transcode intermediates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempConfig {
    /// Staging directory. Defaults to `<data dir>/temp`.
    pub dir: Option<PathBuf>,
    /// Artifacts older than this are removed by the sweeper.
    pub ttl_secs: u64,
    /// Interval between sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: 30 * 60,
            sweep_interval_secs: 30 * 60,
        }
    }
}

impl DitzyConfig {
    /// Sticker pack name, falling back to the bot name.
    pub fn sticker_pack(&self) -> &str {
        self.media.sticker_pack.as_deref().unwrap_or(&self.bot.name)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_bot() {
        let cfg = DitzyConfig::default();
        assert_eq!(cfg.bot.prefix, ".");
        assert_eq!(cfg.inbound.max_message_age_secs, 60);
        assert_eq!(cfg.media.max_file_size, 50 * 1024 * 1024);
        assert_eq!(cfg.temp.ttl_secs, 1800);
        assert_eq!(cfg.temp.sweep_interval_secs, 1800);
        assert_eq!(cfg.sticker_pack(), "Ditzy Time");
        assert_eq!(cfg.media.music_path, PathBuf::from("media/music.mp3"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: DitzyConfig = toml::from_str(
            r#"
            [bot]
            prefix = "!"
            owner = ["6281234567890"]

            [media]
            sticker_pack = "Pack"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bot.prefix, "!");
        assert_eq!(cfg.bot.name, "Ditzy Time");
        assert_eq!(cfg.bot.owner, vec!["6281234567890"]);
        assert_eq!(cfg.sticker_pack(), "Pack");
        assert_eq!(cfg.media.download_timeout_secs, 60);
    }
}

//! Offline session: feed recorded `messages.upsert` batches through the
//! inbound handler, with media served from local files and replies printed
//! to stdout.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    bytes::Bytes,
    ditzy_channels::ChannelOutbound,
    ditzy_common::types::OutboundContent,
    ditzy_config::{DitzyConfig, Severity},
    ditzy_media::{ChunkStream, TempSweeper},
    ditzy_whatsapp::{HandleOutcome, InboundHandler, MediaDescriptor, MediaDownloader, MediaKind},
    futures::{StreamExt, stream},
    serde_json::json,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tracing::{info, warn},
};

use crate::media_commands::{open_store, parse_envelopes, transcoder};

const CHUNK_SIZE: usize = 64 * 1024;

/// Prints every send as one JSON line. Binary payloads appear as their length.
pub struct StdoutOutbound;

#[async_trait]
impl ChannelOutbound for StdoutOutbound {
    async fn send(
        &self,
        chat_id: &str,
        content: OutboundContent,
        quoted_id: Option<&str>,
    ) -> ditzy_channels::Result<()> {
        let mut line = json!({
            "chat_id": chat_id,
            "quoted_id": quoted_id,
            "content": content,
        })
        .to_string();
        line.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ditzy_channels::Error::external("write reply to stdout", e))?;
        stdout
            .flush()
            .await
            .map_err(|e| ditzy_channels::Error::external("flush stdout", e))
    }
}

/// Resolves a descriptor's `url` (or `directPath`) as a file path relative to
/// `base` and streams it in fixed-size chunks.
pub struct LocalFileDownloader {
    base: PathBuf,
}

impl LocalFileDownloader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, media: &MediaDescriptor) -> io::Result<PathBuf> {
        let location = media
            .url
            .as_deref()
            .or(media.direct_path.as_deref())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "media has no location"))?;
        let location = location.strip_prefix("file://").unwrap_or(location);
        Ok(self.base.join(location))
    }
}

#[async_trait]
impl MediaDownloader for LocalFileDownloader {
    async fn download_chunks(
        &self,
        media: &MediaDescriptor,
        kind: MediaKind,
    ) -> io::Result<ChunkStream> {
        let path = self.resolve(media)?;
        let file = tokio::fs::File::open(&path).await?;
        info!(path = %path.display(), %kind, "serving local media");

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, io::Error>(None);
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        });
        Ok(chunks.boxed())
    }
}

/// Replay options.
pub struct ReplayOptions<'a> {
    pub self_id: &'a str,
    /// Clock for the staleness check, in unix seconds. Defaults to now.
    pub at: Option<u64>,
}

/// Replay a JSON-lines file: each line is one envelope or one upsert batch.
///
/// Stops early once a command (e.g. `restart`) cancels the shutdown token.
/// Refuses to start when the config has error diagnostics.
pub async fn replay(
    config: Arc<DitzyConfig>,
    path: &Path,
    options: ReplayOptions<'_>,
) -> Result<BTreeMap<String, usize>> {
    let checked = ditzy_config::validate_config(&config);
    for d in &checked.diagnostics {
        warn!(severity = %d.severity, path = %d.path, "{}", d.message);
    }
    if checked.has_errors() {
        let errors: Vec<String> = checked
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect();
        bail!("invalid config: {}", errors.join("; "));
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    let sweeper = TempSweeper::spawn(
        open_store(&config)?,
        Duration::from_secs(config.temp.sweep_interval_secs),
        Duration::from_secs(config.temp.ttl_secs),
    );
    let handler = InboundHandler::new(
        Arc::clone(&config),
        options.self_id,
        Arc::new(StdoutOutbound),
        Arc::new(LocalFileDownloader::new(base)),
        transcoder(&config)?,
    );
    let now = options.at.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    });

    let mut tally = BTreeMap::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if handler.shutdown_token().is_cancelled() {
            info!(line = lineno + 1, "shutdown requested, stopping replay");
            break;
        }
        let envelopes = match parse_envelopes(line) {
            Ok(envelopes) => envelopes,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed line");
                *tally.entry("malformed".to_string()).or_insert(0) += 1;
                continue;
            },
        };
        for envelope in &envelopes {
            let outcome = handler.handle_at(envelope, now).await;
            *tally.entry(outcome_label(&outcome)).or_insert(0) += 1;
        }
    }

    sweeper.stop().await;
    info!(?tally, "replay finished");
    Ok(tally)
}

fn outcome_label(outcome: &HandleOutcome) -> String {
    match outcome {
        HandleOutcome::Skipped(_) => "skipped".into(),
        HandleOutcome::Dropped => "dropped".into(),
        HandleOutcome::Ignored => "ignored".into(),
        HandleOutcome::Command(command) => format!("command:{}", command.name()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, ditzy_media::assemble};

    fn descriptor(url: &str) -> MediaDescriptor {
        MediaDescriptor {
            kind: MediaKind::Image,
            mime_type: "image/png".into(),
            byte_length: 0,
            width: None,
            height: None,
            duration_seconds: None,
            file_name: None,
            url: Some(url.into()),
            direct_path: None,
            media_key: None,
        }
    }

    #[tokio::test]
    async fn local_downloader_streams_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        std::fs::write(dir.path().join("pic.png"), &data).unwrap();

        let downloader = LocalFileDownloader::new(dir.path());
        let chunks = downloader
            .download_chunks(&descriptor("file://pic.png"), MediaKind::Image)
            .await
            .unwrap();
        let assembled = assemble(chunks, usize::MAX).await.unwrap();
        assert_eq!(assembled.len(), data.len());
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = LocalFileDownloader::new(dir.path());
        let err = downloader
            .download_chunks(&descriptor("absent.png"), MediaKind::Image)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn replay_tallies_outcomes_and_stops_on_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DitzyConfig::default();
        config.temp.dir = Some(dir.path().join("temp"));
        config.bot.owner = vec!["628111".into()];

        let line = |id: &str, text: &str| {
            json!({
                "key": {"remoteJid": "628111@s.whatsapp.net", "fromMe": false, "id": id},
                "messageTimestamp": 1_000,
                "message": {"conversation": text}
            })
            .to_string()
        };
        let script = [
            line("A", ".ping"),
            "not json".to_string(),
            line("B", "hello"),
            line("C", ".restart"),
            line("D", ".ping"),
        ]
        .join("\n");
        let path = dir.path().join("session.jsonl");
        std::fs::write(&path, script).unwrap();

        let tally = replay(Arc::new(config), &path, ReplayOptions {
            self_id: "62800@s.whatsapp.net",
            at: Some(1_010),
        })
        .await
        .unwrap();

        assert_eq!(tally.get("command:ping"), Some(&1));
        assert_eq!(tally.get("command:restart"), Some(&1));
        assert_eq!(tally.get("ignored"), Some(&1));
        assert_eq!(tally.get("malformed"), Some(&1));
    }

    #[tokio::test]
    async fn invalid_config_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DitzyConfig::default();
        config.temp.dir = Some(dir.path().join("temp"));
        config.temp.sweep_interval_secs = 0;
        let path = dir.path().join("session.jsonl");
        std::fs::write(&path, "").unwrap();

        let err = replay(Arc::new(config), &path, ReplayOptions {
            self_id: "",
            at: None,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("temp.sweep_interval_secs"));
        assert!(!dir.path().join("temp").exists());
    }
}

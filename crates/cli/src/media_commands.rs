use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result, bail},
    bytes::Bytes,
    ditzy_config::DitzyConfig,
    ditzy_media::{TempArtifactStore, Transcoder},
    ditzy_whatsapp::{JidResolver, NormalizeContext, RawEnvelope, normalize},
    serde_json::Value,
    tracing::info,
};

/// Open the configured staging directory.
pub fn open_store(config: &DitzyConfig) -> Result<Arc<TempArtifactStore>> {
    let dir = ditzy_config::temp_dir(config);
    let store = TempArtifactStore::new(&dir)
        .with_context(|| format!("failed to open temp dir {}", dir.display()))?;
    Ok(Arc::new(store))
}

pub fn transcoder(config: &DitzyConfig) -> Result<Transcoder> {
    Ok(Transcoder::new(
        open_store(config)?,
        Duration::from_secs(config.media.transcode_timeout_secs),
    ))
}

/// Parse a file holding either one envelope or an upsert batch (JSON array).
pub fn parse_envelopes(raw: &str) -> Result<Vec<RawEnvelope>> {
    let value: Value = serde_json::from_str(raw).context("envelope file is not valid JSON")?;
    let envelopes = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<RawEnvelope>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(envelopes)
}

/// Print the normalized form of every envelope in `path`, one JSON document
/// per line. Envelopes that fail to normalize are reported on stderr.
pub async fn normalize_file(path: &Path, self_id: &str) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let resolver = JidResolver::new();
    let ctx = NormalizeContext {
        self_id,
        resolver: &resolver,
    };

    let mut failed = 0;
    for envelope in parse_envelopes(&raw)? {
        match normalize(&envelope, &ctx) {
            Ok(msg) => println!("{}", serde_json::to_string(&msg)?),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", envelope.id());
            },
        }
    }
    if failed > 0 {
        bail!("{failed} envelope(s) could not be normalized");
    }
    Ok(())
}

pub async fn sticker(
    config: &DitzyConfig,
    input: &Path,
    output: &Path,
    pack: Option<&str>,
    author: Option<&str>,
) -> Result<()> {
    let data = read_input(input).await?;
    let pack = pack.unwrap_or(config.sticker_pack());
    let author = author.unwrap_or(&config.media.sticker_author);

    let Some(sticker) = transcoder(config)?.to_sticker(data, pack, author).await else {
        bail!("failed to create sticker from {}", input.display());
    };
    write_output(output, &sticker).await
}

pub async fn to_image(config: &DitzyConfig, input: &Path, output: &Path) -> Result<()> {
    let data = read_input(input).await?;
    let png = transcoder(config)?.to_image(data).await?;
    write_output(output, &png).await
}

/// Run a single sweep pass over the staging directory.
pub async fn sweep(config: &DitzyConfig, ttl_secs: Option<u64>) -> Result<()> {
    let store = open_store(config)?;
    let ttl = Duration::from_secs(ttl_secs.unwrap_or(config.temp.ttl_secs));
    let report = store.sweep(ttl).await;
    println!(
        "{}: scanned {}, removed {}, failed {}",
        store.dir().display(),
        report.scanned,
        report.removed,
        report.failed
    );
    Ok(())
}

async fn read_input(path: &Path) -> Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Bytes::from(data))
}

async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = data.len(), "wrote output");
    Ok(())
}

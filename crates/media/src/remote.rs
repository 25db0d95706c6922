//! Bounded HTTP download for media referenced by URL.

use std::{io, time::Duration};

use {bytes::Bytes, futures::StreamExt, tracing::debug};

use crate::{
    chunks::assemble,
    error::{Error, Result},
};

/// Download `url` into memory, failing once more than `max_bytes` arrive.
///
/// `timeout` covers the whole request, body included. Non-2xx statuses are
/// download failures.
pub async fn fetch(url: &str, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::download("failed to build HTTP client", e))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::download(format!("request to {url} failed"), e))?
        .error_for_status()
        .map_err(|e| Error::download(format!("{url} returned an error status"), e))?;

    if let Some(declared) = resp.content_length()
        && declared > max_bytes as u64
    {
        debug!(url, declared, limit = max_bytes, "refusing oversized response");
        return Err(Error::MediaTooLarge { limit: max_bytes });
    }

    let body = resp
        .bytes_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();
    let data = assemble(body, max_bytes).await?;
    debug!(url, bytes = data.len(), "fetched remote media");
    Ok(data)
}

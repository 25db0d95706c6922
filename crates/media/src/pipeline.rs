use std::{sync::Arc, time::Duration};

use {
    bytes::Bytes,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    sticker_meta::StickerPack,
    temp::TempArtifactStore,
    transcode,
};

/// Async front of the transcode codecs.
///
/// Codec work runs on the blocking pool. The timeout only bounds how long the
/// caller waits: a codec that overruns keeps its blocking thread until it
/// finishes, and the decoder limits in [`transcode`] cap that cost. Sticker
/// output is staged through a [`TempArtifact`](crate::temp::TempArtifact) so
/// the file is gone once the call returns, whatever the outcome.
#[derive(Debug, Clone)]
pub struct Transcoder {
    store: Arc<TempArtifactStore>,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(store: Arc<TempArtifactStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn run_blocking<T, F>(&self, what: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        // On timeout the handle is dropped; the blocking task runs to completion.
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::transcode(format!("{what} task failed"), join)),
            Err(_) => Err(Error::transcode_message(format!(
                "{what} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn sticker(&self, buffer: Bytes, pack: StickerPack) -> Result<Bytes> {
        let webp = self
            .run_blocking("sticker encode", move || {
                transcode::encode_sticker(&buffer, &pack)
            })
            .await?;

        let artifact = self.store.acquire(".webp");
        artifact.write(&webp).await?;
        let staged = artifact.read().await?;
        debug!(path = %artifact.path().display(), bytes = staged.len(), "staged sticker");
        Ok(Bytes::from(staged))
    }

    /// Produce a WhatsApp sticker from raw image bytes.
    ///
    /// Returns `None` on any failure; the cause is logged.
    pub async fn to_sticker(&self, buffer: Bytes, pack_name: &str, author: &str) -> Option<Bytes> {
        let pack = StickerPack::new(pack_name, author);
        match self.sticker(buffer, pack).await {
            Ok(sticker) => Some(sticker),
            Err(e) => {
                warn!(error = %e, "sticker creation failed");
                None
            },
        }
    }

    /// Convert a WebP sticker into a PNG image.
    pub async fn to_image(&self, buffer: Bytes) -> Result<Bytes> {
        self.run_blocking("png encode", move || transcode::sticker_to_png(&buffer))
            .await
            .map(Bytes::from)
    }
}

//! Media extraction: pull the full payload of a message (or its quote).

use std::time::Duration;

use {
    bytes::Bytes,
    ditzy_media::{assemble, error::Error as MediaError},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    normalize::{MediaDescriptor, NormalizedMessage, QuotedMessage},
    sdk::MediaDownloader,
    variant::{MediaKind, VariantKind},
};

/// Fixed ceiling for downloads that feed sticker creation.
pub const STICKER_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on an assembled download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCeiling {
    /// 10 MiB, the sticker source limit.
    Sticker,
    Limit(usize),
}

impl SizeCeiling {
    pub fn bytes(self) -> usize {
        match self {
            Self::Sticker => STICKER_MAX_BYTES,
            Self::Limit(n) => n,
        }
    }
}

/// Anything that can name a media variant and carry its descriptor.
pub trait MediaSource: Sync {
    fn variant(&self) -> &VariantKind;
    fn media(&self) -> Option<&MediaDescriptor>;
}

impl MediaSource for NormalizedMessage {
    fn variant(&self) -> &VariantKind {
        &self.variant
    }

    fn media(&self) -> Option<&MediaDescriptor> {
        self.payload.media.as_ref()
    }
}

impl MediaSource for QuotedMessage {
    fn variant(&self) -> &VariantKind {
        &self.variant
    }

    fn media(&self) -> Option<&MediaDescriptor> {
        self.media.as_ref()
    }
}

/// Download and assemble the media carried by `target`.
///
/// The whole download, including opening the stream, must finish within
/// `timeout`.
pub async fn extract_media(
    target: &(impl MediaSource + ?Sized),
    downloader: &dyn MediaDownloader,
    ceiling: SizeCeiling,
    timeout: Duration,
) -> Result<Bytes> {
    let no_media = || Error::NoMediaPresent {
        variant: target.variant().to_string(),
    };
    let descriptor = target.media().ok_or_else(no_media)?;
    // Product quotes carry an image under a non-media variant.
    let kind = target
        .variant()
        .media_kind()
        .unwrap_or(descriptor.kind);

    let limit = ceiling.bytes();
    debug!(
        %kind,
        declared = descriptor.byte_length,
        limit,
        "extracting media"
    );

    let bytes = tokio::time::timeout(timeout, download(downloader, descriptor, kind, limit))
        .await
        .map_err(|_| MediaError::download_timeout(timeout))??;
    Ok(bytes)
}

async fn download(
    downloader: &dyn MediaDownloader,
    descriptor: &MediaDescriptor,
    kind: MediaKind,
    limit: usize,
) -> ditzy_media::Result<Bytes> {
    let stream = downloader
        .download_chunks(descriptor, kind)
        .await
        .map_err(|e| MediaError::download(format!("failed to open {kind} download"), e))?;
    assemble(stream, limit).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            normalize::{NormalizeContext, normalize},
            sdk::JidResolver,
        },
        async_trait::async_trait,
        ditzy_media::ChunkStream,
        futures::{StreamExt, stream},
        serde_json::json,
        std::io,
    };

    struct FixedDownloader {
        chunks: Vec<usize>,
        stall: bool,
    }

    #[async_trait]
    impl MediaDownloader for FixedDownloader {
        async fn download_chunks(
            &self,
            _media: &MediaDescriptor,
            _kind: MediaKind,
        ) -> io::Result<ChunkStream> {
            let items: Vec<io::Result<Bytes>> = self
                .chunks
                .iter()
                .map(|&n| Ok(Bytes::from(vec![0u8; n])))
                .collect();
            if self.stall {
                Ok(stream::iter(items).chain(stream::pending()).boxed())
            } else {
                Ok(stream::iter(items).boxed())
            }
        }
    }

    fn message(value: serde_json::Value) -> NormalizedMessage {
        let env = serde_json::from_value(json!({
            "key": {"remoteJid": "628111@s.whatsapp.net", "id": "ID1"},
            "message": value,
        }))
        .unwrap();
        let resolver = JidResolver::new();
        normalize(&env, &NormalizeContext {
            self_id: "62800@s.whatsapp.net",
            resolver: &resolver,
        })
        .unwrap()
    }

    const SECS: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn text_message_has_no_media() {
        let msg = message(json!({"conversation": "hi"}));
        let dl = FixedDownloader {
            chunks: vec![1],
            stall: false,
        };
        let err = extract_media(&msg, &dl, SizeCeiling::Limit(100), SECS)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoMediaPresent { variant } if variant == "conversation"));
    }

    #[tokio::test]
    async fn image_is_assembled() {
        let msg = message(json!({"imageMessage": {"mimetype": "image/jpeg"}}));
        let dl = FixedDownloader {
            chunks: vec![10, 20],
            stall: false,
        };
        let bytes = extract_media(&msg, &dl, SizeCeiling::Limit(100), SECS)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 30);
    }

    #[tokio::test]
    async fn sticker_ceiling_is_ten_mebibytes() {
        let msg = message(json!({"imageMessage": {}}));
        let dl = FixedDownloader {
            chunks: vec![STICKER_MAX_BYTES, 1],
            stall: false,
        };
        let err = extract_media(&msg, &dl, SizeCeiling::Sticker, SECS)
            .await
            .unwrap_err();
        assert!(err.is_too_large());
    }

    #[tokio::test]
    async fn quoted_media_is_extractable() {
        let msg = message(json!({
            "extendedTextMessage": {
                "text": ".toimg",
                "contextInfo": {"stanzaId": "Q", "quotedMessage": {"stickerMessage": {"mimetype": "image/webp"}}}
            }
        }));
        let quoted = msg.quoted.as_ref().unwrap();
        let dl = FixedDownloader {
            chunks: vec![7],
            stall: false,
        };
        let bytes = extract_media(quoted, &dl, SizeCeiling::Limit(100), SECS)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 7);
    }

    #[tokio::test]
    async fn stalled_download_times_out() {
        let msg = message(json!({"videoMessage": {}}));
        let dl = FixedDownloader {
            chunks: vec![1],
            stall: true,
        };
        let err = extract_media(&msg, &dl, SizeCeiling::Limit(100), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Media(ditzy_media::Error::DownloadFailed { .. })
        ));
    }
}

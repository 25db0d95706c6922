//! Chunk assembly: drain a lazy download stream into one contiguous buffer.

use std::io;

use {
    bytes::{Bytes, BytesMut},
    futures::{Stream, StreamExt, stream::BoxStream},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Lazy, finite, non-restartable sequence of downloaded chunks.
///
/// A failed or malformed source yields an `Err` item instead of ending early.
pub type ChunkStream = BoxStream<'static, io::Result<Bytes>>;

/// Drain `source` into a single buffer of at most `max_bytes`.
///
/// Stops pulling as soon as the ceiling is crossed. Partial data is dropped
/// on every error path.
pub async fn assemble<S>(mut source: S, max_bytes: usize) -> Result<Bytes>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let mut buf = BytesMut::new();
    let mut chunks = 0usize;

    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|e| Error::download(format!("chunk {chunks} failed"), e))?;
        if buf.len() + chunk.len() > max_bytes {
            debug!(
                received = buf.len() + chunk.len(),
                limit = max_bytes,
                "aborting download over size ceiling"
            );
            return Err(Error::MediaTooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
        chunks += 1;
    }

    debug!(chunks, bytes = buf.len(), "assembled media buffer");
    Ok(buf.freeze())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::stream,
        std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    fn chunks(sizes: &[usize]) -> Vec<io::Result<Bytes>> {
        sizes.iter().map(|&n| Ok(Bytes::from(vec![7u8; n]))).collect()
    }

    #[tokio::test]
    async fn concatenates_all_chunks() {
        let out = assemble(stream::iter(chunks(&[3, 4, 5])), 100).await.unwrap();
        assert_eq!(out.len(), 12);
    }

    #[tokio::test]
    async fn exactly_at_ceiling_is_allowed() {
        let out = assemble(stream::iter(chunks(&[5, 5])), 10).await.unwrap();
        assert_eq!(out.len(), 10);
    }

    #[tokio::test]
    async fn over_ceiling_fails_and_stops_pulling() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = stream::iter(chunks(&[6, 6, 6, 6])).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = assemble(source, 10).await.unwrap_err();
        assert!(matches!(err, Error::MediaTooLarge { limit: 10 }));
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn source_error_is_download_failure() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"def")),
        ]);
        let err = assemble(source, 100).await.unwrap_err();
        assert!(matches!(err, Error::DownloadFailed { .. }));
    }
}

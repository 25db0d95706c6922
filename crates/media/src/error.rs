use std::error::Error as StdError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The assembled buffer grew past the caller's ceiling.
    #[error("media too large: more than {limit} bytes")]
    MediaTooLarge { limit: usize },

    /// The chunk source failed or timed out; partial data was discarded.
    #[error("download failed: {context}")]
    DownloadFailed {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// Decode or encode failed, or the transcode exceeded its time budget.
    #[error("transcode failed: {context}")]
    TranscodeFailed {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn download<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::DownloadFailed {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn download_timeout(after: std::time::Duration) -> Self {
        Self::DownloadFailed {
            context: format!("timed out after {}s", after.as_secs()),
            source: None,
        }
    }

    #[must_use]
    pub fn transcode<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::TranscodeFailed {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn transcode_message(context: impl Into<String>) -> Self {
        Self::TranscodeFailed {
            context: context.into(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

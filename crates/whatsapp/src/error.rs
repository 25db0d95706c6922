use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The message map did not hold exactly one content key.
    #[error("unrecognized message variant: found [{}]", found.join(", "))]
    UnrecognizedVariant { found: Vec<String> },

    /// A recognised wrapper whose contents cannot be handled.
    #[error("unsupported message variant: {reason}")]
    UnsupportedVariant { reason: String },

    #[error("no media present in {variant} message")]
    NoMediaPresent { variant: String },

    #[error(transparent)]
    Media(#[from] ditzy_media::Error),

    #[error(transparent)]
    Channel(#[from] ditzy_channels::Error),
}

impl Error {
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedVariant {
            reason: reason.into(),
        }
    }

    /// Download exceeded its size ceiling.
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::Media(ditzy_media::Error::MediaTooLarge { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

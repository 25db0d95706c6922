use std::error::Error as StdError;

/// Result type for outbound channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors raised by outbound senders.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network refused the content (size, type, unknown chat).
    #[error("message rejected for {chat_id}: {reason}")]
    Rejected { chat_id: String, reason: String },

    /// Wrapped source error from the SDK collaborator.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn rejected(chat_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Rejected {
            chat_id: chat_id.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

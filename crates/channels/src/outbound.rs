use {async_trait::async_trait, ditzy_common::types::OutboundContent, tokio::sync::Mutex};

use crate::{Error, Result};

/// Send messages to a chat through the network SDK.
///
/// Implementations are expected to serialize sends at the SDK boundary;
/// callers may invoke `send` from concurrent message handlers.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send `content` to `chat_id`, optionally as a reply to `quoted_id`.
    async fn send(
        &self,
        chat_id: &str,
        content: OutboundContent,
        quoted_id: Option<&str>,
    ) -> Result<()>;
}

/// A message captured by [`RecordingOutbound`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: String,
    pub content: OutboundContent,
    pub quoted_id: Option<String>,
}

/// Outbound sender that keeps every message in memory.
///
/// Used for dry runs and by tests that assert on replies.
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<SentMessage>>,
    reject: Option<String>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that refuses every message with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::default(),
            reject: Some(reason.into()),
        }
    }

    /// Snapshot of everything sent so far.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Drain captured messages.
    pub async fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock().await)
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send(
        &self,
        chat_id: &str,
        content: OutboundContent,
        quoted_id: Option<&str>,
    ) -> Result<()> {
        if let Some(reason) = &self.reject {
            return Err(Error::rejected(chat_id, reason));
        }
        tracing::debug!(chat_id, kind = content.kind(), "recording outbound message");
        self.sent.lock().await.push(SentMessage {
            chat_id: chat_id.to_string(),
            content,
            quoted_id: quoted_id.map(str::to_string),
        });
        Ok(())
    }
}

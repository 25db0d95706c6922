//! Inbound pipeline: filter → normalize → command dispatch.

use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use {
    bytes::Bytes,
    ditzy_channels::{ChannelOutbound, gating},
    ditzy_common::types::OutboundContent,
    ditzy_config::DitzyConfig,
    ditzy_media::{Transcoder, remote},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{
    commands::{self, Command, Invocation},
    envelope::RawEnvelope,
    error::Result,
    media::{MediaSource, SizeCeiling, extract_media},
    normalize::{NormalizeContext, NormalizedMessage, normalize},
    sdk::{JidResolver, MediaDownloader},
};

/// Why an envelope never reached the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoMessage,
    OwnMessage,
    Stale { age_secs: u64 },
}

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Skipped(SkipReason),
    /// Normalization failed; the envelope was logged and dropped.
    Dropped,
    /// Normalized, but not a known command.
    Ignored,
    Command(Command),
}

/// Handles `messages.upsert` envelopes for one WhatsApp session.
pub struct InboundHandler {
    config: Arc<DitzyConfig>,
    self_id: String,
    outbound: Arc<dyn ChannelOutbound>,
    downloader: Arc<dyn MediaDownloader>,
    resolver: Arc<JidResolver>,
    transcoder: Transcoder,
    started_at: Instant,
    shutdown: CancellationToken,
}

impl InboundHandler {
    pub fn new(
        config: Arc<DitzyConfig>,
        self_id: impl Into<String>,
        outbound: Arc<dyn ChannelOutbound>,
        downloader: Arc<dyn MediaDownloader>,
        transcoder: Transcoder,
    ) -> Self {
        Self {
            config,
            self_id: self_id.into(),
            outbound,
            downloader,
            resolver: Arc::new(JidResolver::new()),
            transcoder,
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Share a contact book with other parts of the session.
    pub fn with_resolver(mut self, resolver: Arc<JidResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &DitzyConfig {
        &self.config
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Cancelled when an owner asks for a restart.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// The sender is a configured owner, or the message came from this session.
    pub fn is_owner(&self, msg: &NormalizedMessage) -> bool {
        msg.from_me || gating::is_owner(&msg.sender_id, &self.config.bot.owner)
    }

    /// Reply in the message's chat, quoting it.
    pub async fn reply(&self, msg: &NormalizedMessage, content: OutboundContent) -> Result<()> {
        self.outbound
            .send(&msg.chat_id, content, Some(&msg.id))
            .await?;
        Ok(())
    }

    pub(crate) async fn extract(
        &self,
        source: &(impl MediaSource + ?Sized),
        ceiling: SizeCeiling,
    ) -> Result<Bytes> {
        let timeout = Duration::from_secs(self.config.media.download_timeout_secs);
        extract_media(source, self.downloader.as_ref(), ceiling, timeout).await
    }

    /// Fetch a remote image under the general file-size ceiling.
    pub(crate) async fn fetch_url(&self, url: &str) -> Result<Bytes> {
        let media = &self.config.media;
        let timeout = Duration::from_secs(media.download_timeout_secs);
        Ok(remote::fetch(url, media.max_file_size, timeout).await?)
    }

    /// Handle every envelope of one upsert batch in order.
    pub async fn handle_batch(&self, envelopes: &[RawEnvelope]) -> Vec<HandleOutcome> {
        let mut outcomes = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            outcomes.push(self.handle(envelope).await);
        }
        outcomes
    }

    pub async fn handle(&self, envelope: &RawEnvelope) -> HandleOutcome {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.handle_at(envelope, now).await
    }

    /// [`handle`](Self::handle) with an explicit clock, in unix seconds.
    pub async fn handle_at(&self, envelope: &RawEnvelope, now_secs: u64) -> HandleOutcome {
        if let Some(reason) = self.skip_reason(envelope, now_secs) {
            debug!(id = envelope.id(), ?reason, "skipping envelope");
            return HandleOutcome::Skipped(reason);
        }

        let ctx = NormalizeContext {
            self_id: &self.self_id,
            resolver: self.resolver.as_ref(),
        };
        let msg = match normalize(envelope, &ctx) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(
                    id = envelope.id(),
                    chat_id = envelope.chat_id(),
                    error = %e,
                    "dropping envelope"
                );
                return HandleOutcome::Dropped;
            },
        };

        if let Some(name) = envelope.push_name.as_deref() {
            self.resolver.remember(&msg.sender_id, name);
        }

        let Some(invocation) = Invocation::parse(&msg.payload.text, &self.config.bot.prefix) else {
            return HandleOutcome::Ignored;
        };
        let Some(command) = Command::parse(&invocation.name) else {
            debug!(name = %invocation.name, "unknown command");
            return HandleOutcome::Ignored;
        };

        commands::run(self, command, &msg, &invocation.args).await;
        HandleOutcome::Command(command)
    }

    fn skip_reason(&self, envelope: &RawEnvelope, now_secs: u64) -> Option<SkipReason> {
        if envelope.message.is_none() {
            return Some(SkipReason::NoMessage);
        }
        if self.config.inbound.ignore_own_messages && envelope.key.from_me {
            return Some(SkipReason::OwnMessage);
        }
        let age_secs = now_secs.saturating_sub(envelope.message_timestamp?);
        (age_secs > self.config.inbound.max_message_age_secs)
            .then_some(SkipReason::Stale { age_secs })
    }
}

//! WhatsApp Web front end: envelope normalization, media extraction and the
//! prefix-command layer.
//!
//! The network link itself (pairing, reconnects, the socket) belongs to the
//! SDK. This crate consumes its envelopes and talks back through
//! [`ditzy_channels::ChannelOutbound`] and [`sdk::MediaDownloader`].

pub mod commands;
pub mod envelope;
pub mod error;
pub mod format;
pub mod handler;
pub mod media;
pub mod normalize;
pub mod sdk;
pub mod system;
pub mod variant;

pub use {
    envelope::RawEnvelope,
    error::{Error, Result},
    handler::{HandleOutcome, InboundHandler, SkipReason},
    media::{MediaSource, SizeCeiling, extract_media},
    normalize::{MediaDescriptor, NormalizeContext, NormalizedMessage, QuotedMessage, normalize},
    sdk::{IdentityResolver, JidResolver, MediaDownloader, decode_jid},
    variant::{MediaKind, VariantKind},
};

//! Outbound channel seam and access gating.
//!
//! The network SDK owns the transport; this crate describes the single send
//! primitive the bot needs and how command access is decided.

pub mod error;
pub mod gating;
pub mod outbound;

pub use {
    error::{Error, Result},
    outbound::{ChannelOutbound, RecordingOutbound, SentMessage},
};

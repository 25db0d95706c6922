//! Media plumbing: chunk assembly, HTTP fetch, sticker/PNG transcoding, temp
//! artifact staging and sweep.

pub mod chunks;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod sticker_meta;
pub mod sweeper;
pub mod temp;
pub mod transcode;

pub use {
    chunks::{ChunkStream, assemble},
    error::{Error, Result},
    pipeline::Transcoder,
    sweeper::TempSweeper,
    temp::{SweepReport, TempArtifact, TempArtifactStore},
};

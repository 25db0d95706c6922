//! Sticker-pack metadata embedded in a WebP container.
//!
//! WhatsApp reads the pack name and publisher from a JSON document stored in
//! the EXIF chunk of an extended (VP8X) WebP file, under the private TIFF tag
//! `0x5741`.

use {serde::Serialize, uuid::Uuid};

use crate::error::{Error, Result};

const EXIF_TAG: u16 = 0x5741;
const VP8X_FLAG_ALPHA: u8 = 0x10;
const VP8X_FLAG_EXIF: u8 = 0x08;

/// Pack fields carried by every generated sticker.
#[derive(Debug, Clone, Serialize)]
pub struct StickerPack {
    #[serde(rename = "sticker-pack-id")]
    pub id: String,
    #[serde(rename = "sticker-pack-name")]
    pub name: String,
    #[serde(rename = "sticker-pack-publisher")]
    pub publisher: String,
    pub emojis: Vec<String>,
}

impl StickerPack {
    pub fn new(name: impl Into<String>, publisher: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            publisher: publisher.into(),
            emojis: vec![String::new()],
        }
    }

    /// Little-endian TIFF block with a single IFD entry pointing at the JSON.
    pub fn to_exif(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)
            .map_err(|e| Error::transcode("failed to serialize sticker pack", e))?;
        let len = u32::try_from(json.len())
            .map_err(|_| Error::transcode_message("sticker pack metadata too large"))?;

        let mut exif = Vec::with_capacity(22 + json.len());
        exif.extend_from_slice(b"II*\0");
        exif.extend_from_slice(&8u32.to_le_bytes());
        exif.extend_from_slice(&1u16.to_le_bytes());
        exif.extend_from_slice(&EXIF_TAG.to_le_bytes());
        // Type 7: UNDEFINED.
        exif.extend_from_slice(&7u16.to_le_bytes());
        exif.extend_from_slice(&len.to_le_bytes());
        exif.extend_from_slice(&22u32.to_le_bytes());
        exif.extend_from_slice(&json);
        Ok(exif)
    }
}

struct Chunk<'a> {
    fourcc: [u8; 4],
    data: &'a [u8],
}

fn parse_chunks(webp: &[u8]) -> Result<Vec<Chunk<'_>>> {
    if webp.len() < 12 || &webp[0..4] != b"RIFF" || &webp[8..12] != b"WEBP" {
        return Err(Error::transcode_message("not a RIFF/WEBP container"));
    }

    let mut chunks = Vec::new();
    let mut rest = &webp[12..];
    while !rest.is_empty() {
        if rest.len() < 8 {
            return Err(Error::transcode_message("truncated WebP chunk header"));
        }
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&rest[0..4]);
        let size = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let padded = size + (size & 1);
        let body = &rest[8..];
        if body.len() < size {
            return Err(Error::transcode_message("truncated WebP chunk"));
        }
        chunks.push(Chunk {
            fourcc,
            data: &body[..size],
        });
        rest = &body[padded.min(body.len())..];
    }
    Ok(chunks)
}

fn push_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], data: &[u8]) -> Result<()> {
    let size = u32::try_from(data.len())
        .map_err(|_| Error::transcode_message("WebP chunk too large"))?;
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    Ok(())
}

fn vp8x_header(width: u32, height: u32, alpha: bool) -> [u8; 10] {
    let mut header = [0u8; 10];
    header[0] = VP8X_FLAG_EXIF;
    if alpha {
        header[0] |= VP8X_FLAG_ALPHA;
    }
    header[4..7].copy_from_slice(&(width - 1).to_le_bytes()[..3]);
    header[7..10].copy_from_slice(&(height - 1).to_le_bytes()[..3]);
    header
}

/// Rewrite `webp` as an extended WebP that carries `exif`.
///
/// Any EXIF chunk already present is replaced. Simple-format input gains a
/// VP8X header sized `width` × `height`; the alpha flag is only set for a
/// lossless (`VP8L`) bitstream, since a simple lossy file has no alpha.
pub fn embed_exif(webp: &[u8], width: u32, height: u32, exif: &[u8]) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(Error::transcode_message("WebP canvas has zero size"));
    }
    let chunks = parse_chunks(webp)?;

    let mut body = Vec::with_capacity(webp.len() + exif.len() + 32);
    body.extend_from_slice(b"WEBP");

    match chunks.iter().find(|c| &c.fourcc == b"VP8X") {
        Some(existing) if existing.data.len() >= 10 => {
            let mut header = [0u8; 10];
            header.copy_from_slice(&existing.data[..10]);
            header[0] |= VP8X_FLAG_EXIF;
            push_chunk(&mut body, b"VP8X", &header)?;
        },
        Some(_) => return Err(Error::transcode_message("malformed VP8X chunk")),
        None => {
            let alpha = chunks.iter().any(|c| &c.fourcc == b"VP8L");
            push_chunk(&mut body, b"VP8X", &vp8x_header(width, height, alpha))?;
        },
    }

    for chunk in chunks
        .iter()
        .filter(|c| &c.fourcc != b"VP8X" && &c.fourcc != b"EXIF")
    {
        push_chunk(&mut body, &chunk.fourcc, chunk.data)?;
    }
    push_chunk(&mut body, b"EXIF", exif)?;

    let riff_size = u32::try_from(body.len())
        .map_err(|_| Error::transcode_message("WebP file too large"))?;
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_size.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Extract the EXIF chunk payload, if any.
pub fn read_exif(webp: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(parse_chunks(webp)?
        .into_iter()
        .find(|c| &c.fourcc == b"EXIF")
        .map(|c| c.data.to_vec()))
}

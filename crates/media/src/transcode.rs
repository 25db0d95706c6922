//! Synchronous image codecs behind the transcode pipeline.
//!
//! Everything here is CPU-bound and meant to run on the blocking pool.

use std::io::Cursor;

use {
    image::{
        DynamicImage, GenericImageView, ImageReader, Limits, RgbaImage,
        codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder},
        imageops::{self, FilterType},
    },
    libwebp_sys::WebPConfig,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    sticker_meta::{StickerPack, embed_exif},
};

/// Side of the square sticker canvas.
pub const STICKER_SIZE: u32 = 512;

/// Largest source dimension accepted by the decoder.
pub const MAX_SOURCE_DIMENSION: u32 = 8192;

/// Decoder allocation ceiling.
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Lossy WebP quality for stickers (0-100).
pub const STICKER_QUALITY: f32 = 90.0;

/// libwebp compression method (0 = fastest, 6 = slowest).
pub const STICKER_EFFORT: i32 = 3;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::transcode("failed to guess image format", e))?;
    reader.limits(decode_limits());
    Ok(reader)
}

fn decode(data: &[u8]) -> Result<DynamicImage> {
    reader(data)?
        .decode()
        .map_err(|e| Error::transcode("failed to decode image", e))
}

/// Fit `img` inside the sticker square and centre it on a transparent canvas.
fn fit_to_canvas(img: &DynamicImage) -> RgbaImage {
    let resized = img.resize(STICKER_SIZE, STICKER_SIZE, FilterType::Lanczos3);
    let (w, h) = resized.dimensions();

    let mut canvas = RgbaImage::new(STICKER_SIZE, STICKER_SIZE);
    let x = i64::from((STICKER_SIZE - w) / 2);
    let y = i64::from((STICKER_SIZE - h) / 2);
    imageops::overlay(&mut canvas, &resized.to_rgba8(), x, y);
    canvas
}

fn encode_lossy(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut config = WebPConfig::new()
        .map_err(|()| Error::transcode_message("failed to initialise WebP encoder config"))?;
    config.lossless = 0;
    config.quality = STICKER_QUALITY;
    config.method = STICKER_EFFORT;

    let (width, height) = canvas.dimensions();
    let encoded = webp::Encoder::from_rgba(canvas.as_raw(), width, height)
        .encode_advanced(&config)
        .map_err(|e| Error::transcode_message(format!("failed to encode WebP: {e:?}")))?;
    Ok(encoded.to_vec())
}

/// Decode any supported raster and produce a 512×512 lossy WebP sticker
/// with `pack` embedded as EXIF.
pub fn encode_sticker(data: &[u8], pack: &StickerPack) -> Result<Vec<u8>> {
    let img = decode(data)?;
    let (src_w, src_h) = img.dimensions();
    let canvas = fit_to_canvas(&img);

    let webp = encode_lossy(&canvas)?;
    let out = embed_exif(&webp, STICKER_SIZE, STICKER_SIZE, &pack.to_exif()?)?;
    debug!(
        src_w,
        src_h,
        bytes = out.len(),
        pack = %pack.name,
        "encoded sticker"
    );
    Ok(out)
}

/// Decode a WebP sticker and re-encode it as PNG.
pub fn sticker_to_png(data: &[u8]) -> Result<Vec<u8>> {
    let img = decode(data)?;

    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Default, PngFilter::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| Error::transcode("failed to encode PNG", e))?;

    let out = out.into_inner();
    debug!(
        width = img.width(),
        height = img.height(),
        bytes = out.len(),
        "converted sticker to PNG"
    );
    Ok(out)
}

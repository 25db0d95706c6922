#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end media commands through the inbound handler with in-memory
//! collaborators.

use std::{collections::HashMap, io, io::Cursor, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    bytes::Bytes,
    ditzy_channels::RecordingOutbound,
    ditzy_common::types::OutboundContent,
    ditzy_config::DitzyConfig,
    ditzy_media::{ChunkStream, TempArtifactStore, Transcoder},
    ditzy_whatsapp::{
        HandleOutcome, InboundHandler, MediaDescriptor, MediaDownloader, MediaKind, RawEnvelope,
        commands::Command,
    },
    futures::{StreamExt, stream},
    image::{DynamicImage, ImageFormat, Rgba, RgbaImage},
    serde_json::{Value, json},
};

const NOW: u64 = 1_717_000_000;
const CHAT: &str = "628111@s.whatsapp.net";

/// Serves registered payloads by URL in 1 KiB chunks.
#[derive(Default)]
struct MemoryDownloader {
    blobs: HashMap<String, Bytes>,
}

#[async_trait]
impl MediaDownloader for MemoryDownloader {
    async fn download_chunks(
        &self,
        media: &MediaDescriptor,
        _kind: MediaKind,
    ) -> io::Result<ChunkStream> {
        let url = media.url.as_deref().unwrap_or_default();
        let blob = self
            .blobs
            .get(url)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, url.to_string()))?;
        let chunks: Vec<io::Result<Bytes>> = blob
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

fn png(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([250, 180, 0, 255])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

struct Harness {
    handler: InboundHandler,
    outbound: Arc<RecordingOutbound>,
    staging: tempfile::TempDir,
}

fn harness(blobs: &[(&str, Bytes)]) -> Harness {
    harness_with(blobs, DitzyConfig::default())
}

fn harness_with(blobs: &[(&str, Bytes)], config: DitzyConfig) -> Harness {
    let staging = tempfile::tempdir().unwrap();
    let downloader = MemoryDownloader {
        blobs: blobs
            .iter()
            .map(|(url, data)| (url.to_string(), data.clone()))
            .collect(),
    };
    let outbound = Arc::new(RecordingOutbound::new());
    let store = Arc::new(TempArtifactStore::new(staging.path()).unwrap());
    let handler = InboundHandler::new(
        Arc::new(config),
        "62800@s.whatsapp.net",
        outbound.clone(),
        Arc::new(downloader),
        Transcoder::new(store, Duration::from_secs(30)),
    );
    Harness {
        handler,
        outbound,
        staging,
    }
}

fn envelope(message: Value) -> RawEnvelope {
    serde_json::from_value(json!({
        "key": {"remoteJid": CHAT, "fromMe": false, "id": "CMD1"},
        "pushName": "Budi",
        "messageTimestamp": NOW,
        "message": message,
    }))
    .unwrap()
}

fn reply_to(text: &str, quoted: Value) -> RawEnvelope {
    envelope(json!({
        "extendedTextMessage": {
            "text": text,
            "contextInfo": {
                "stanzaId": "ORIG1",
                "participant": "628222@s.whatsapp.net",
                "quotedMessage": quoted
            }
        }
    }))
}

fn last_text(sent: &[ditzy_channels::SentMessage]) -> &str {
    sent.iter()
        .rev()
        .find_map(|m| match &m.content {
            OutboundContent::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn sticker_from_quoted_image_then_back_to_png() {
    let h = harness(&[("mem://photo", png(1000, 400))]);

    let outcome = h
        .handler
        .handle_at(
            &reply_to(".sticker Kopi Budi", json!({"imageMessage": {"url": "mem://photo", "mimetype": "image/png"}})),
            NOW,
        )
        .await;
    assert_eq!(outcome, HandleOutcome::Command(Command::Sticker));

    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(last_text(&sent), "Creating sticker, please wait...");
    let OutboundContent::Sticker { data: sticker } = &sent[1].content else {
        panic!("expected a sticker, got {:?}", sent[1].content);
    };
    let decoded = image::load_from_memory(sticker).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (512, 512));
    // Staged artifacts never outlive the call.
    assert_eq!(std::fs::read_dir(h.staging.path()).unwrap().count(), 0);

    // Feed the sticker back in as a quoted sticker.
    let h2 = harness(&[("mem://sticker", sticker.clone())]);
    h2.handler
        .handle_at(
            &reply_to(".toimg", json!({"stickerMessage": {"url": "mem://sticker", "mimetype": "image/webp"}})),
            NOW,
        )
        .await;
    let sent = h2.outbound.take().await;
    let OutboundContent::Image { data, caption } = &sent[1].content else {
        panic!("expected an image");
    };
    assert_eq!(caption.as_deref(), Some("Sticker converted to image!"));
    let png = image::load_from_memory_with_format(data, ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(png.dimensions(), (512, 512));
    assert_eq!(png.get_pixel(256, 5)[3], 0);
    assert_eq!(png.get_pixel(256, 256)[3], 255);
}

#[tokio::test]
async fn sticker_from_own_caption() {
    let h = harness(&[("mem://selfie", png(64, 64))]);
    let outcome = h
        .handler
        .handle_at(
            &envelope(json!({"imageMessage": {"url": "mem://selfie", "caption": ".s"}})),
            NOW,
        )
        .await;
    assert_eq!(outcome, HandleOutcome::Command(Command::Sticker));
    let sent = h.outbound.take().await;
    assert!(matches!(sent.last().unwrap().content, OutboundContent::Sticker { .. }));
}

#[tokio::test]
async fn oversized_sticker_source_is_refused() {
    let big = Bytes::from(vec![0u8; 10 * 1024 * 1024 + 1]);
    let h = harness(&[("mem://big", big)]);
    h.handler
        .handle_at(
            &reply_to(".sticker", json!({"imageMessage": {"url": "mem://big"}})),
            NOW,
        )
        .await;
    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(last_text(&sent), "File too large! Maximum size is 10MB.");
}

#[tokio::test]
async fn undecodable_sticker_source_reports_failure() {
    let h = harness(&[("mem://clip", Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"))]);
    h.handler
        .handle_at(
            &reply_to(".sticker", json!({"videoMessage": {"url": "mem://clip"}})),
            NOW,
        )
        .await;
    let sent = h.outbound.take().await;
    assert_eq!(last_text(&sent), "Failed to create sticker!");
}

#[tokio::test]
async fn sticker_without_media_explains_usage() {
    let h = harness(&[]);
    h.handler
        .handle_at(&envelope(json!({"conversation": ".sticker"})), NOW)
        .await;
    assert_eq!(
        last_text(&h.outbound.take().await),
        "Reply to an image or video, or send an image/video with the command!"
    );
}

#[tokio::test]
async fn reveal_view_once_resends_media_with_caption() {
    let h = harness(&[("mem://secret", png(8, 8))]);
    h.handler
        .handle_at(
            &reply_to(
                ".rvo",
                json!({"viewOnceMessageV2": {"message": {"imageMessage": {"url": "mem://secret", "caption": "psst"}}}}),
            ),
            NOW,
        )
        .await;
    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 1);
    let OutboundContent::Image { caption, .. } = &sent[0].content else {
        panic!("expected an image");
    };
    assert_eq!(caption.as_deref(), Some("psst"));
}

#[tokio::test]
async fn reveal_rejects_regular_media() {
    let h = harness(&[]);
    h.handler
        .handle_at(&reply_to(".rvo", json!({"imageMessage": {"url": "mem://x"}})), NOW)
        .await;
    assert_eq!(
        last_text(&h.outbound.take().await),
        "This is not a view once message!"
    );
}

#[tokio::test]
async fn media_info_describes_quoted_video() {
    let h = harness(&[]);
    h.handler
        .handle_at(
            &reply_to(
                ".mediainfo",
                json!({"videoMessage": {
                    "mimetype": "video/mp4", "fileLength": "1572864", "width": 1280, "height": 720,
                    "seconds": 125, "caption": "holiday"
                }}),
            ),
            NOW,
        )
        .await;
    let sent = h.outbound.take().await;
    assert_eq!(
        last_text(&sent),
        "Media Information\n\nType: Video\nSize: 1.5 MB\nMIME: video/mp4\nDimensions: 1280x720\nDuration: 2:05\nCaption: holiday"
    );
}

#[tokio::test]
async fn to_image_requires_a_quoted_sticker() {
    let h = harness(&[]);
    h.handler
        .handle_at(&reply_to(".toimg", json!({"conversation": "not a sticker"})), NOW)
        .await;
    assert_eq!(last_text(&h.outbound.take().await), "Reply to a sticker!");
}

fn text_command(body: &str) -> RawEnvelope {
    envelope(json!({"conversation": body}))
}

#[tokio::test]
async fn music_sends_configured_audio() {
    let media = tempfile::tempdir().unwrap();
    let track = media.path().join("track.mp3");
    std::fs::write(&track, b"ID3 not really an mp3").unwrap();
    let mut config = DitzyConfig::default();
    config.media.music_path = track;

    let h = harness_with(&[], config);
    let outcome = h.handler.handle_at(&text_command(".music"), NOW).await;
    assert_eq!(outcome, HandleOutcome::Command(Command::Music));

    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(last_text(&sent), "Playing music...");
    let OutboundContent::Audio { data, mime_type } = &sent[1].content else {
        panic!("expected audio, got {:?}", sent[1].content);
    };
    assert_eq!(mime_type, "audio/mpeg");
    assert_eq!(&data[..], b"ID3 not really an mp3");
    assert_eq!(sent[1].quoted_id.as_deref(), Some("CMD1"));
}

#[tokio::test]
async fn music_without_file_explains() {
    let media = tempfile::tempdir().unwrap();
    let mut config = DitzyConfig::default();
    config.media.music_path = media.path().join("missing.mp3");

    let h = harness_with(&[], config);
    h.handler.handle_at(&text_command(".music"), NOW).await;
    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 1);
    assert!(last_text(&sent).starts_with("Music file not found!\nPlease add "));
}

#[tokio::test]
async fn welcome_sends_image_with_greeting() {
    let media = tempfile::tempdir().unwrap();
    let image = media.path().join("welcome.png");
    std::fs::write(&image, png(16, 16)).unwrap();
    let mut config = DitzyConfig::default();
    config.media.welcome_image = image;
    config.bot.owner = vec!["628999".into()];

    let h = harness_with(&[], config);
    let outcome = h.handler.handle_at(&text_command(".welcome"), NOW).await;
    assert_eq!(outcome, HandleOutcome::Command(Command::Welcome));

    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 1);
    let OutboundContent::Image { data, caption } = &sent[0].content else {
        panic!("expected an image");
    };
    assert_eq!(data.len(), png(16, 16).len());
    let caption = caption.as_deref().unwrap();
    assert!(caption.starts_with("Welcome to Ditzy Time!\n\nHello Budi!\n"));
    assert!(caption.contains("Use *.menu* to see available commands.\n"));
    assert!(caption.contains("Contact owner: @628999\n"));
}

#[tokio::test]
async fn welcome_without_image_explains() {
    let media = tempfile::tempdir().unwrap();
    let mut config = DitzyConfig::default();
    config.media.welcome_image = media.path().join("missing.jpg");

    let h = harness_with(&[], config);
    h.handler.handle_at(&text_command(".welcome"), NOW).await;
    assert!(
        last_text(&h.outbound.take().await).starts_with("Welcome image not found!\nPlease add ")
    );
}

#[tokio::test]
async fn getimg_fetches_and_resends() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/cat.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png(8, 8))
        .create_async()
        .await;
    let url = format!("{}/cat.png", server.url());

    let h = harness(&[]);
    let outcome = h
        .handler
        .handle_at(&text_command(&format!(".getimg {url}")), NOW)
        .await;
    assert_eq!(outcome, HandleOutcome::Command(Command::GetImage));
    mock.assert_async().await;

    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(last_text(&sent), "Getting image from URL...");
    let OutboundContent::Image { data, caption } = &sent[1].content else {
        panic!("expected an image");
    };
    assert_eq!(data.len(), png(8, 8).len());
    assert_eq!(
        caption.as_deref(),
        Some(format!("Image downloaded from URL\nSource: {url}").as_str())
    );
}

#[tokio::test]
async fn getimg_reports_failed_fetch() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let h = harness(&[]);
    h.handler
        .handle_at(
            &text_command(&format!(".getimg {}/gone.png", server.url())),
            NOW,
        )
        .await;
    let sent = h.outbound.take().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(last_text(&sent), "Failed to get image from URL!");
}

#[tokio::test]
async fn getimg_validates_its_argument() {
    let h = harness(&[]);
    h.handler.handle_at(&text_command(".getimg"), NOW).await;
    assert_eq!(
        last_text(&h.outbound.take().await),
        "Please provide an image URL!\nUsage: .getimg <url>"
    );

    h.handler
        .handle_at(&text_command(".getimg ftp://example.com/a.png"), NOW)
        .await;
    assert_eq!(
        last_text(&h.outbound.take().await),
        "Please provide a valid URL (starting with http/https)"
    );
}

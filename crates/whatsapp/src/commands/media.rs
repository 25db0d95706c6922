use std::{fmt::Write as _, io, path::Path};

use {
    bytes::Bytes,
    ditzy_common::types::OutboundContent,
    tracing::{debug, warn},
};

use crate::{
    commands::basic::owner_mention,
    error::Result,
    format::{format_duration_clock, format_size},
    handler::InboundHandler,
    media::{MediaSource, SizeCeiling},
    normalize::NormalizedMessage,
    variant::VariantKind,
};

fn is_image_or_video(variant: &VariantKind) -> bool {
    matches!(variant, VariantKind::Image | VariantKind::Video)
}

pub(super) async fn sticker(
    handler: &InboundHandler,
    msg: &NormalizedMessage,
    args: &[&str],
) -> Result<()> {
    let source: &dyn MediaSource = match &msg.quoted {
        Some(quoted) if is_image_or_video(&quoted.variant) => quoted,
        _ if is_image_or_video(&msg.variant) => msg,
        _ => {
            return handler
                .reply(
                    msg,
                    OutboundContent::text(
                        "Reply to an image or video, or send an image/video with the command!",
                    ),
                )
                .await;
        },
    };

    let buffer = match handler.extract(source, SizeCeiling::Sticker).await {
        Ok(buffer) => buffer,
        Err(e) if e.is_too_large() => {
            return handler
                .reply(msg, OutboundContent::text("File too large! Maximum size is 10MB."))
                .await;
        },
        Err(e) => return Err(e),
    };

    let config = handler.config();
    let pack = args.first().copied().unwrap_or(config.sticker_pack());
    let author = args.get(1).copied().unwrap_or(&config.media.sticker_author);

    handler
        .reply(msg, OutboundContent::text("Creating sticker, please wait..."))
        .await?;

    match handler.transcoder().to_sticker(buffer, pack, author).await {
        Some(data) => handler.reply(msg, OutboundContent::Sticker { data }).await,
        None => {
            handler
                .reply(msg, OutboundContent::text("Failed to create sticker!"))
                .await
        },
    }
}

pub(super) async fn to_image(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let Some(quoted) = msg
        .quoted
        .as_ref()
        .filter(|q| q.variant == VariantKind::Sticker)
    else {
        return handler
            .reply(msg, OutboundContent::text("Reply to a sticker!"))
            .await;
    };

    let limit = SizeCeiling::Limit(handler.config().media.max_file_size);
    let buffer = handler.extract(quoted, limit).await?;

    handler
        .reply(msg, OutboundContent::text("Converting sticker to image..."))
        .await?;
    let data = handler.transcoder().to_image(buffer).await?;
    handler
        .reply(msg, OutboundContent::Image {
            data,
            caption: Some("Sticker converted to image!".into()),
        })
        .await
}

pub(super) async fn reveal_view_once(
    handler: &InboundHandler,
    msg: &NormalizedMessage,
) -> Result<()> {
    let Some(quoted) = &msg.quoted else {
        return handler
            .reply(msg, OutboundContent::text("Reply to a view once message!"))
            .await;
    };
    if !quoted.view_once {
        return handler
            .reply(msg, OutboundContent::text("This is not a view once message!"))
            .await;
    }
    if !is_image_or_video(&quoted.variant) {
        return handler
            .reply(msg, OutboundContent::text("Unsupported view once message type!"))
            .await;
    }

    let limit = SizeCeiling::Limit(handler.config().media.max_file_size);
    let data = handler.extract(quoted, limit).await?;
    let caption = |fallback: &str| {
        Some(if quoted.text.is_empty() {
            fallback.to_string()
        } else {
            quoted.text.clone()
        })
    };

    let content = if quoted.variant == VariantKind::Image {
        OutboundContent::Image {
            data,
            caption: caption("View once image revealed!"),
        }
    } else {
        OutboundContent::Video {
            data,
            caption: caption("View once video revealed!"),
        }
    };
    debug!(id = %quoted.id, kind = content.kind(), "revealing view once media");
    handler.reply(msg, content).await
}

pub(super) async fn media_info(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let described = msg.quoted.as_ref().and_then(|q| {
        matches!(
            q.variant,
            VariantKind::Image | VariantKind::Video | VariantKind::Audio | VariantKind::Document
        )
        .then_some(q)
        .zip(q.media.as_ref())
    });
    let Some((quoted, media)) = described else {
        return handler
            .reply(msg, OutboundContent::text("Reply to a media message!"))
            .await;
    };

    let kind = media.kind.as_str();
    let mut info = String::from("Media Information\n\n");
    let _ = writeln!(info, "Type: {}{}", kind[..1].to_uppercase(), &kind[1..]);
    let _ = writeln!(info, "Size: {}", format_size(media.byte_length));
    let mime = if media.mime_type.is_empty() {
        "Unknown"
    } else {
        &media.mime_type
    };
    let _ = writeln!(info, "MIME: {mime}");
    if let (Some(w), Some(h)) = (media.width, media.height)
        && w > 0
        && h > 0
    {
        let _ = writeln!(info, "Dimensions: {w}x{h}");
    }
    if let Some(secs) = media.duration_seconds.filter(|s| *s > 0) {
        let _ = writeln!(info, "Duration: {}", format_duration_clock(secs));
    }
    if let Some(name) = media.file_name.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(info, "Filename: {name}");
    }
    if !quoted.text.is_empty() {
        let _ = writeln!(info, "Caption: {}", quoted.text);
    }

    handler
        .reply(msg, OutboundContent::text(info.trim_end()))
        .await
}


/// Read a bundled media file. `None` when it does not exist.
async fn read_bundled(path: &Path) -> Result<Option<Bytes>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ditzy_media::Error::from(e).into()),
    }
}

pub(super) async fn music(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let path = &handler.config().media.music_path;
    let Some(data) = read_bundled(path).await? else {
        return handler
            .reply(
                msg,
                OutboundContent::text(format!(
                    "Music file not found!\nPlease add {}.",
                    path.display()
                )),
            )
            .await;
    };

    handler
        .reply(msg, OutboundContent::text("Playing music..."))
        .await?;
    handler
        .reply(msg, OutboundContent::Audio {
            data,
            mime_type: "audio/mpeg".into(),
        })
        .await
}

pub(super) async fn welcome(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let config = handler.config();
    let path = &config.media.welcome_image;
    let Some(data) = read_bundled(path).await? else {
        return handler
            .reply(
                msg,
                OutboundContent::text(format!(
                    "Welcome image not found!\nPlease add {}.",
                    path.display()
                )),
            )
            .await;
    };

    let name = if msg.display_name.is_empty() {
        "User"
    } else {
        &msg.display_name
    };
    let owner_line = owner_mention(&config.bot)
        .map(|(owner, _)| format!("Need help? Contact owner: @{owner}\n"))
        .unwrap_or_default();
    let caption = format!(
        "Welcome to {bot}!\n\n\
         Hello {name}!\n\
         I'm a WhatsApp bot ready to help you.\n\n\
         Use *{prefix}menu* to see available commands.\n\
         {owner_line}\n\
         Thank you for using our bot!",
        bot = config.bot.name,
        prefix = config.bot.prefix,
    );

    handler
        .reply(msg, OutboundContent::Image {
            data,
            caption: Some(caption),
        })
        .await
}

pub(super) async fn get_image(
    handler: &InboundHandler,
    msg: &NormalizedMessage,
    args: &[&str],
) -> Result<()> {
    let url = args.join(" ");
    if url.is_empty() {
        let prefix = &handler.config().bot.prefix;
        return handler
            .reply(
                msg,
                OutboundContent::text(format!(
                    "Please provide an image URL!\nUsage: {prefix}getimg <url>"
                )),
            )
            .await;
    }
    if !url.starts_with("http") {
        return handler
            .reply(
                msg,
                OutboundContent::text("Please provide a valid URL (starting with http/https)"),
            )
            .await;
    }

    handler
        .reply(msg, OutboundContent::text("Getting image from URL..."))
        .await?;

    match handler.fetch_url(&url).await {
        Ok(data) => {
            handler
                .reply(msg, OutboundContent::Image {
                    data,
                    caption: Some(format!("Image downloaded from URL\nSource: {url}")),
                })
                .await
        },
        Err(e) => {
            warn!(%url, error = %e, "image fetch failed");
            handler
                .reply(msg, OutboundContent::text("Failed to get image from URL!"))
                .await
        },
    }
}

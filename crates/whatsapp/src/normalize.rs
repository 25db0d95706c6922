//! Envelope normalization: one raw SDK envelope in, one immutable
//! [`NormalizedMessage`] out.

use {serde::Serialize, tracing::debug};

use crate::{
    envelope::{ContextInfo, MediaMessage, MessageContent, RawEnvelope},
    error::{Error, Result},
    sdk::IdentityResolver,
    variant::{Content, MediaKind, VariantKind},
};

const GROUP_SUFFIX: &str = "@g.us";

/// Everything the command layer needs about one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    pub id: String,
    pub chat_id: String,
    pub is_group: bool,
    pub sender_id: String,
    pub from_me: bool,
    pub display_name: String,
    pub variant: VariantKind,
    /// A view-once layer was unwrapped to reach `variant`.
    pub view_once: bool,
    pub is_baileys_generated: bool,
    pub timestamp: Option<u64>,
    pub payload: Payload,
    pub quoted: Option<QuotedMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    pub text: String,
    pub caption: Option<String>,
    pub mentioned_ids: Vec<String>,
    pub media: Option<MediaDescriptor>,
}

/// The message a [`NormalizedMessage`] replies to. Never nested further.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotedMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub from_me: bool,
    pub variant: VariantKind,
    pub view_once: bool,
    pub is_baileys_generated: bool,
    pub text: String,
    pub mentioned_ids: Vec<String>,
    pub media: Option<MediaDescriptor>,
}

/// What the SDK needs to fetch a media payload, plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub mime_type: String,
    pub byte_length: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<u32>,
    pub file_name: Option<String>,
    pub url: Option<String>,
    pub direct_path: Option<String>,
    #[serde(skip)]
    pub media_key: Option<String>,
}

/// Session identity and lookups used while normalizing.
pub struct NormalizeContext<'a> {
    /// The bot's own JID as reported by the SDK.
    pub self_id: &'a str,
    pub resolver: &'a dyn IdentityResolver,
}

impl MediaDescriptor {
    fn from_message(kind: MediaKind, m: &MediaMessage) -> Self {
        Self {
            kind,
            mime_type: m.mimetype.clone().unwrap_or_default(),
            byte_length: m.file_length.unwrap_or_default(),
            width: m.width,
            height: m.height,
            duration_seconds: m.seconds,
            file_name: m.file_name.clone(),
            url: m.url.clone(),
            direct_path: m.direct_path.clone(),
            media_key: m.media_key.clone(),
        }
    }
}

/// SDK-generated message ids: 16 characters starting with `BAE5`.
pub fn is_baileys_id(id: &str) -> bool {
    id.len() == 16 && id.starts_with("BAE5")
}

/// Resolve the single content entry, unwrapping at most one view-once layer.
fn resolve_content(message: &MessageContent) -> Result<(Content<'_>, bool)> {
    let content = message
        .single_content()
        .ok_or_else(|| Error::UnrecognizedVariant {
            found: message.content_tags(),
        })?;

    let Content::ViewOnce(wrapper) = content else {
        return Ok((content, false));
    };

    let inner = wrapper
        .message
        .as_deref()
        .ok_or_else(|| Error::unsupported("view-once wrapper without inner message"))?;
    match inner.single_content() {
        Some(Content::ViewOnce(_)) => Err(Error::unsupported("nested view-once wrapper")),
        Some(inner) => Ok((inner, true)),
        None => Err(Error::unsupported(format!(
            "view-once wrapper around [{}]",
            inner.content_tags().join(", ")
        ))),
    }
}

fn media_of(content: &Content<'_>) -> Option<MediaDescriptor> {
    let kind = content.kind().media_kind()?;
    content
        .media()
        .map(|m| MediaDescriptor::from_message(kind, m))
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn canonical_or_empty(resolver: &dyn IdentityResolver, candidates: &[Option<&str>]) -> String {
    candidates
        .iter()
        .flatten()
        .find(|id| !id.is_empty())
        .map(|id| resolver.canonical_id(id))
        .unwrap_or_default()
}

/// Build the quoted message from an attached context. Lenient: anything
/// unresolvable yields `None`.
fn resolve_quoted(
    info: &ContextInfo,
    chat_id: &str,
    self_canonical: &str,
    ctx: &NormalizeContext<'_>,
) -> Option<QuotedMessage> {
    let quoted = info.quoted_message.as_deref()?;
    let (content, view_once) = match resolve_content(quoted) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!(error = %e, "dropping unresolvable quoted message");
            return None;
        },
    };

    // Product quotes carry their text and image one level further down.
    let media = match content {
        Content::Product(p) => p
            .product
            .as_ref()
            .and_then(|snap| snap.product_image.as_ref())
            .map(|img| MediaDescriptor::from_message(MediaKind::Image, img)),
        _ => media_of(&content),
    };
    let product_text = match content {
        Content::Product(p) => p.product.as_ref().and_then(|snap| {
            snap.title
                .as_deref()
                .or(snap.description.as_deref())
                .filter(|s| !s.is_empty())
        }),
        _ => None,
    };

    let id = info.stanza_id.clone().unwrap_or_default();
    let chat_id = info
        .remote_jid
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(chat_id)
        .to_string();
    let sender_id = canonical_or_empty(ctx.resolver, &[
        info.participant.as_deref(),
        Some(chat_id.as_str()),
    ]);

    Some(QuotedMessage {
        from_me: !sender_id.is_empty() && sender_id == self_canonical,
        is_baileys_generated: is_baileys_id(&id),
        text: first_non_empty([
            content.text(),
            content.caption(),
            content.conversation(),
            content.content_text(),
            content.selected_display_text(),
            product_text.or(content.title()),
        ]),
        mentioned_ids: info.mentioned_jid.clone(),
        variant: content.kind(),
        view_once,
        media,
        id,
        chat_id,
        sender_id,
    })
}

/// Normalize one envelope.
///
/// Fails with `UnrecognizedVariant` or `UnsupportedVariant`; a quoted message
/// that cannot be resolved is dropped instead.
pub fn normalize(envelope: &RawEnvelope, ctx: &NormalizeContext<'_>) -> Result<NormalizedMessage> {
    let message = envelope
        .message
        .as_ref()
        .ok_or_else(|| Error::UnrecognizedVariant { found: Vec::new() })?;
    let (content, view_once) = resolve_content(message)?;

    let id = envelope.id().to_string();
    let chat_id = envelope.chat_id().to_string();
    let from_me = envelope.key.from_me;
    let self_canonical = ctx.resolver.canonical_id(ctx.self_id);

    let sender_id = if from_me && !self_canonical.is_empty() {
        self_canonical.clone()
    } else {
        canonical_or_empty(ctx.resolver, &[
            envelope.participant.as_deref(),
            envelope.key.participant.as_deref(),
            Some(chat_id.as_str()),
        ])
    };

    let display_name = match envelope.push_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if sender_id.is_empty() => String::new(),
        _ => ctx.resolver.display_name(&sender_id),
    };

    let info = content.context_info();
    let quoted = info.and_then(|info| resolve_quoted(info, &chat_id, &self_canonical, ctx));

    let payload = Payload {
        text: first_non_empty([
            content.conversation(),
            content.caption(),
            content.text(),
            content.selected_row_id(),
            content.selected_button_id(),
        ]),
        caption: content.caption().map(str::to_string),
        mentioned_ids: info.map(|i| i.mentioned_jid.clone()).unwrap_or_default(),
        media: media_of(&content),
    };

    let normalized = NormalizedMessage {
        is_group: chat_id.ends_with(GROUP_SUFFIX),
        is_baileys_generated: is_baileys_id(&id),
        timestamp: envelope.message_timestamp,
        variant: content.kind(),
        view_once,
        id,
        chat_id,
        sender_id,
        from_me,
        display_name,
        payload,
        quoted,
    };
    debug!(
        id = %normalized.id,
        chat_id = %normalized.chat_id,
        variant = %normalized.variant,
        view_once,
        quoted = normalized.quoted.is_some(),
        "normalized envelope"
    );
    Ok(normalized)
}

//! Content-type resolution over the typed message map.

use {serde::Serialize, serde_json::Value};

use crate::envelope::{
    ButtonsResponseMessage, ContextInfo, ExtendedTextMessage, FutureProofMessage,
    ListResponseMessage, MediaMessage, MessageContent, ProductMessage,
};

/// Which content key a message carried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Conversation,
    ExtendedText,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    ListResponse,
    ButtonsResponse,
    Product,
    ViewOnce,
    /// A single content key the bot has no typed model for.
    Other(String),
}

/// Download kinds understood by the media primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl VariantKind {
    /// Wire name of the content key.
    pub fn tag(&self) -> &str {
        match self {
            Self::Conversation => "conversation",
            Self::ExtendedText => "extendedTextMessage",
            Self::Image => "imageMessage",
            Self::Video => "videoMessage",
            Self::Audio => "audioMessage",
            Self::Document => "documentMessage",
            Self::Sticker => "stickerMessage",
            Self::ListResponse => "listResponseMessage",
            Self::ButtonsResponse => "buttonsResponseMessage",
            Self::Product => "productMessage",
            Self::ViewOnce => "viewOnceMessage",
            Self::Other(tag) => tag,
        }
    }

    /// Download kind: the tag with its `Message` suffix stripped.
    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_download_kind(self.tag().strip_suffix("Message")?)
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for VariantKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl MediaKind {
    pub fn from_download_kind(kind: &str) -> Option<Self> {
        match kind {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "document" => Some(Self::Document),
            "sticker" => Some(Self::Sticker),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of the single content entry of a message map.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    Conversation(&'a str),
    ExtendedText(&'a ExtendedTextMessage),
    Image(&'a MediaMessage),
    Video(&'a MediaMessage),
    Audio(&'a MediaMessage),
    Document(&'a MediaMessage),
    Sticker(&'a MediaMessage),
    ListResponse(&'a ListResponseMessage),
    ButtonsResponse(&'a ButtonsResponseMessage),
    Product(&'a ProductMessage),
    ViewOnce(&'a FutureProofMessage),
    Other(&'a str, &'a Value),
}

impl MessageContent {
    /// Every content entry present, metadata keys excluded.
    pub fn contents(&self) -> Vec<Content<'_>> {
        let mut found = Vec::new();
        if let Some(text) = &self.conversation {
            found.push(Content::Conversation(text));
        }
        if let Some(m) = &self.extended_text_message {
            found.push(Content::ExtendedText(m));
        }
        if let Some(m) = &self.image_message {
            found.push(Content::Image(m));
        }
        if let Some(m) = &self.video_message {
            found.push(Content::Video(m));
        }
        if let Some(m) = &self.audio_message {
            found.push(Content::Audio(m));
        }
        if let Some(m) = &self.document_message {
            found.push(Content::Document(m));
        }
        if let Some(m) = &self.sticker_message {
            found.push(Content::Sticker(m));
        }
        if let Some(m) = &self.list_response_message {
            found.push(Content::ListResponse(m));
        }
        if let Some(m) = &self.buttons_response_message {
            found.push(Content::ButtonsResponse(m));
        }
        if let Some(m) = &self.product_message {
            found.push(Content::Product(m));
        }
        for m in [
            &self.view_once_message,
            &self.view_once_message_v2,
            &self.view_once_message_v2_extension,
        ]
        .into_iter()
        .flatten()
        {
            found.push(Content::ViewOnce(m));
        }
        for (tag, value) in &self.other {
            if !value.is_null() {
                found.push(Content::Other(tag, value));
            }
        }
        found
    }

    /// The content entry, if exactly one is present.
    pub fn single_content(&self) -> Option<Content<'_>> {
        let mut found = self.contents();
        if found.len() == 1 { found.pop() } else { None }
    }

    /// Tags of every content entry, for diagnostics.
    pub fn content_tags(&self) -> Vec<String> {
        self.contents()
            .iter()
            .map(|c| c.kind().tag().to_string())
            .collect()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

impl<'a> Content<'a> {
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Conversation(_) => VariantKind::Conversation,
            Self::ExtendedText(_) => VariantKind::ExtendedText,
            Self::Image(_) => VariantKind::Image,
            Self::Video(_) => VariantKind::Video,
            Self::Audio(_) => VariantKind::Audio,
            Self::Document(_) => VariantKind::Document,
            Self::Sticker(_) => VariantKind::Sticker,
            Self::ListResponse(_) => VariantKind::ListResponse,
            Self::ButtonsResponse(_) => VariantKind::ButtonsResponse,
            Self::Product(_) => VariantKind::Product,
            Self::ViewOnce(_) => VariantKind::ViewOnce,
            Self::Other(tag, _) => VariantKind::Other((*tag).to_string()),
        }
    }

    pub fn context_info(&self) -> Option<&'a ContextInfo> {
        match *self {
            Self::ExtendedText(m) => m.context_info.as_ref(),
            Self::Image(m) | Self::Video(m) | Self::Audio(m) | Self::Document(m) | Self::Sticker(m) => {
                m.context_info.as_ref()
            },
            Self::ListResponse(m) => m.context_info.as_ref(),
            Self::ButtonsResponse(m) => m.context_info.as_ref(),
            Self::Product(m) => m.context_info.as_ref(),
            Self::Conversation(_) | Self::ViewOnce(_) | Self::Other(..) => None,
        }
    }

    /// Downloadable payload, if this variant carries one.
    pub fn media(&self) -> Option<&'a MediaMessage> {
        match *self {
            Self::Image(m) | Self::Video(m) | Self::Audio(m) | Self::Document(m) | Self::Sticker(m) => {
                Some(m)
            },
            _ => None,
        }
    }

    pub fn conversation(&self) -> Option<&'a str> {
        match *self {
            Self::Conversation(text) => non_empty(Some(text)),
            _ => None,
        }
    }

    pub fn caption(&self) -> Option<&'a str> {
        non_empty(self.media().and_then(|m| m.caption.as_deref()))
    }

    pub fn text(&self) -> Option<&'a str> {
        match *self {
            Self::ExtendedText(m) => non_empty(m.text.as_deref()),
            Self::Other(_, value) => non_empty(value.get("text").and_then(Value::as_str)),
            _ => None,
        }
    }

    pub fn selected_row_id(&self) -> Option<&'a str> {
        match *self {
            Self::ListResponse(m) => non_empty(
                m.single_select_reply
                    .as_ref()
                    .and_then(|r| r.selected_row_id.as_deref()),
            ),
            _ => None,
        }
    }

    pub fn selected_button_id(&self) -> Option<&'a str> {
        match *self {
            Self::ButtonsResponse(m) => non_empty(m.selected_button_id.as_deref()),
            _ => None,
        }
    }

    pub fn selected_display_text(&self) -> Option<&'a str> {
        match *self {
            Self::ButtonsResponse(m) => non_empty(m.selected_display_text.as_deref()),
            _ => None,
        }
    }

    /// Body text of template-style messages the bot does not model.
    pub fn content_text(&self) -> Option<&'a str> {
        match *self {
            Self::Other(_, value) => non_empty(value.get("contentText").and_then(Value::as_str)),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&'a str> {
        match *self {
            Self::ListResponse(m) => non_empty(m.title.as_deref()),
            Self::Image(m) | Self::Video(m) | Self::Audio(m) | Self::Document(m) | Self::Sticker(m) => {
                non_empty(m.title.as_deref())
            },
            Self::Product(m) => non_empty(m.product.as_ref().and_then(|p| p.title.as_deref())),
            Self::Other(_, value) => non_empty(value.get("title").and_then(Value::as_str)),
            _ => None,
        }
    }
}

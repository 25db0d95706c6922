//! Typed model of the web-message JSON delivered by the WhatsApp Web SDK.
//!
//! Only the fields the bot reads are modelled. Unknown message keys are kept
//! in [`MessageContent::other`] so that variant resolution can still count
//! them.

use std::collections::BTreeMap;

use {
    serde::{Deserialize, Deserializer},
    serde_json::Value,
};

/// One inbound message as delivered by `messages.upsert`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    #[serde(default)]
    pub key: MessageKey,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default, deserialize_with = "opt_long")]
    pub message_timestamp: Option<u64>,
    #[serde(default)]
    pub message: Option<MessageContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default)]
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub participant: Option<String>,
}

/// The message map: at most one content key is expected to be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextMessage>,
    pub image_message: Option<MediaMessage>,
    pub video_message: Option<MediaMessage>,
    pub audio_message: Option<MediaMessage>,
    pub document_message: Option<MediaMessage>,
    pub sticker_message: Option<MediaMessage>,
    pub list_response_message: Option<ListResponseMessage>,
    pub buttons_response_message: Option<ButtonsResponseMessage>,
    pub product_message: Option<ProductMessage>,
    pub view_once_message: Option<FutureProofMessage>,
    #[serde(rename = "viewOnceMessageV2")]
    pub view_once_message_v2: Option<FutureProofMessage>,
    #[serde(rename = "viewOnceMessageV2Extension")]
    pub view_once_message_v2_extension: Option<FutureProofMessage>,

    // Protocol metadata that rides along with content; never a variant.
    pub message_context_info: Option<Value>,
    pub sender_key_distribution_message: Option<Value>,

    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub stanza_id: Option<String>,
    pub participant: Option<String>,
    pub remote_jid: Option<String>,
    pub quoted_message: Option<Box<MessageContent>>,
    #[serde(default)]
    pub mentioned_jid: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTextMessage {
    pub text: Option<String>,
    pub context_info: Option<ContextInfo>,
}

/// Shared shape of image, video, audio, document and sticker payloads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    pub url: Option<String>,
    pub direct_path: Option<String>,
    pub media_key: Option<String>,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "opt_long")]
    pub file_length: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seconds: Option<u32>,
    pub file_name: Option<String>,
    pub title: Option<String>,
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponseMessage {
    pub title: Option<String>,
    pub single_select_reply: Option<SingleSelectReply>,
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSelectReply {
    pub selected_row_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsResponseMessage {
    pub selected_button_id: Option<String>,
    pub selected_display_text: Option<String>,
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMessage {
    pub product: Option<ProductSnapshot>,
    pub business_owner_jid: Option<String>,
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub title: Option<String>,
    pub description: Option<String>,
    pub product_image: Option<MediaMessage>,
}

/// `{ "message": { ... } }` wrapper used by the view-once variants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FutureProofMessage {
    pub message: Option<Box<MessageContent>>,
}

impl RawEnvelope {
    pub fn chat_id(&self) -> &str {
        self.key.remote_jid.as_deref().unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.key.id.as_deref().unwrap_or_default()
    }
}

/// Protobuf `Long` values arrive as a number, a decimal string, or a
/// `{low, high}` pair depending on the SDK version.
#[derive(Deserialize)]
#[serde(untagged)]
enum Long {
    Number(u64),
    Text(String),
    Parts { low: i64, high: i64 },
}

impl Long {
    fn value(self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Parts { low, high } => {
                let high = u64::try_from(high).ok()?;
                let low = u64::from(low as u32);
                Some((high << 32) | low)
            },
        }
    }
}

fn opt_long<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Long>::deserialize(deserializer)?.and_then(Long::value))
}

use {bytes::Bytes, serde::Serialize};

/// Content handed to the outbound send primitive.
///
/// The core never validates acceptance; it only moves bytes through.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundContent {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        mentions: Vec<String>,
    },
    Image {
        #[serde(serialize_with = "serialize_len")]
        data: Bytes,
        caption: Option<String>,
    },
    Video {
        #[serde(serialize_with = "serialize_len")]
        data: Bytes,
        caption: Option<String>,
    },
    Audio {
        #[serde(serialize_with = "serialize_len")]
        data: Bytes,
        mime_type: String,
    },
    Sticker {
        #[serde(serialize_with = "serialize_len")]
        data: Bytes,
    },
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            mentions: Vec::new(),
        }
    }

    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Sticker { .. } => "sticker",
        }
    }
}

// Binary payloads are summarised as their length when content is logged or
// printed; the raw bytes go through the outbound sender untouched.
fn serialize_len<S: serde::Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(data.len() as u64)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_content_serializes_as_length() {
        let content = OutboundContent::Sticker {
            data: Bytes::from_static(&[1, 2, 3]),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "sticker");
        assert_eq!(json["data"], 3);
    }

    #[test]
    fn text_omits_empty_mentions() {
        let json = serde_json::to_value(OutboundContent::text("hi")).unwrap();
        assert_eq!(json["text"], "hi");
        assert!(json.get("mentions").is_none());
    }
}

//! Collaborators supplied by the network SDK: media download and identity lookup.

use std::{
    collections::HashMap,
    io,
    sync::{PoisonError, RwLock},
};

use {async_trait::async_trait, ditzy_media::ChunkStream};

use crate::{normalize::MediaDescriptor, variant::MediaKind};

/// Opens the encrypted media download for a descriptor.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Start a lazy chunk stream for `media`. Errors may surface here or
    /// while iterating the stream.
    async fn download_chunks(&self, media: &MediaDescriptor, kind: MediaKind)
    -> io::Result<ChunkStream>;
}

/// Identity lookups. Both methods are pure and never fail.
pub trait IdentityResolver: Send + Sync {
    /// Canonical form of a JID (device suffix removed).
    fn canonical_id(&self, raw: &str) -> String;

    /// Known display name for a canonical id, or the empty string.
    fn display_name(&self, id: &str) -> String;
}

/// Strip the device part from a user JID: `628123:7@s.whatsapp.net` → `628123@s.whatsapp.net`.
pub fn decode_jid(jid: &str) -> String {
    if let Some((user_part, server)) = jid.split_once('@')
        && let Some((user, device)) = user_part.split_once(':')
        && !device.is_empty()
        && device.bytes().all(|b| b.is_ascii_digit())
    {
        return format!("{user}@{server}");
    }
    jid.to_string()
}

/// Default resolver: JID decoding plus an in-memory contact book fed with
/// push names seen on inbound messages.
#[derive(Debug, Default)]
pub struct JidResolver {
    contacts: RwLock<HashMap<String, String>>,
}

impl JidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `name` for `jid`. Empty names are ignored.
    pub fn remember(&self, jid: &str, name: &str) {
        if jid.is_empty() || name.is_empty() {
            return;
        }
        self.contacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(decode_jid(jid), name.to_string());
    }
}

impl IdentityResolver for JidResolver {
    fn canonical_id(&self, raw: &str) -> String {
        decode_jid(raw)
    }

    fn display_name(&self, id: &str) -> String {
        self.contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&decode_jid(id))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("628123:7@s.whatsapp.net", "628123@s.whatsapp.net")]
    #[case("628123@s.whatsapp.net", "628123@s.whatsapp.net")]
    #[case("120363@g.us", "120363@g.us")]
    #[case("628123:abc@s.whatsapp.net", "628123:abc@s.whatsapp.net")]
    #[case("", "")]
    fn decodes_device_suffix(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(decode_jid(raw), expected);
    }

    #[test]
    fn contact_book_uses_canonical_ids() {
        let resolver = JidResolver::new();
        resolver.remember("628123:3@s.whatsapp.net", "Budi");
        resolver.remember("628999@s.whatsapp.net", "");
        assert_eq!(resolver.display_name("628123@s.whatsapp.net"), "Budi");
        assert_eq!(resolver.display_name("628999@s.whatsapp.net"), "");
    }
}

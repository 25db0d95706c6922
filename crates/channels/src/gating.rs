/// Check if a peer matches an allowlist.
///
/// An empty allowlist matches nobody here: owner gating is opt-in, so a bot
/// with no configured owner has no owner commands.
/// Entries are matched case-insensitively and may contain `*` wildcards.
pub fn is_allowed(peer_id: &str, allowlist: &[String]) -> bool {
    let peer = peer_id.to_lowercase();
    allowlist
        .iter()
        .any(|pattern| wildcard_match(&pattern.to_lowercase(), &peer))
}

/// Check whether a sender JID belongs to one of the configured owners.
///
/// Owners are configured as bare phone numbers; the JID server suffix and
/// any device part (`628123:5@s.whatsapp.net`) are ignored.
pub fn is_owner(sender_id: &str, owners: &[String]) -> bool {
    let user = jid_user(sender_id);
    !user.is_empty() && is_allowed(user, owners)
}

/// The user part of a JID: everything before `:` or `@`.
pub fn jid_user(jid: &str) -> &str {
    let end = jid.find([':', '@']).unwrap_or(jid.len());
    &jid[..end]
}

/// `*` matches any (possibly empty) run of characters; everything else is literal.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut segments = pattern.split('*');
    let first = segments.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = segments.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all.
        return rest.is_empty();
    };

    for segment in middle {
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

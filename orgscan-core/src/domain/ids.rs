// orgscan-core/src/domain/ids.rs

/// Platform record ids come in a case-sensitive 15-character form and an
/// 18-character form with a case-insensitive checksum suffix. Everything the
/// pipeline joins on is keyed by the 15-character form.
pub fn id15(id: &str) -> &str {
    if id.len() == 18 && id.is_ascii() {
        &id[..15]
    } else {
        id
    }
}

pub fn id15_owned(id: &str) -> String {
    id15(id).to_string()
}

/// Rough shape check used by the code scanner and by callers that receive ids
/// from free text.
pub fn looks_like_record_id(candidate: &str) -> bool {
    (candidate.len() == 15 || candidate.len() == 18)
        && candidate.chars().all(|c| c.is_ascii_alphanumeric())
        && candidate.chars().take(3).any(|c| c.is_ascii_digit())
}

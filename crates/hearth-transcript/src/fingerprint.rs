//! Fingerprinting — the deduplication key shared across all four capture
//! layers (§4.2).

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Normalize `text` (Unicode NFC, trim, collapse internal whitespace runs)
/// and return a stable short hash, hex-encoded.
pub fn fingerprint(text: &str) -> String {
    let normalized = normalize(text);
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(&digest[..8])
}

/// Normalize text the same way [`fingerprint`] does, without hashing.
/// Exposed so pane-capture filtering can compare cleaned text directly.
pub fn normalize(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    let trimmed = nfc.trim();
    collapse_whitespace(trimmed)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_produces_identical_fingerprint() {
        assert_eq!(fingerprint("hello, dave"), fingerprint("hello, dave"));
    }

    #[test]
    fn whitespace_variance_is_normalized_away() {
        assert_eq!(
            fingerprint("  hi,   dave  "),
            fingerprint("hi, dave")
        );
    }

    #[test]
    fn internal_newlines_collapse_to_single_space() {
        assert_eq!(fingerprint("hi\n\ndave"), fingerprint("hi dave"));
    }

    #[test]
    fn different_text_produces_different_fingerprint() {
        assert_ne!(fingerprint("hello"), fingerprint("goodbye"));
    }

    #[test]
    fn nfc_normalization_equates_composed_and_decomposed_forms() {
        // "é" as a single codepoint (U+00E9) vs "e" + combining acute (U+0065 U+0301).
        let composed = "caf\u{00e9}";
        let decomposed = "cafe\u{0301}";
        assert_eq!(fingerprint(composed), fingerprint(decomposed));
    }
}

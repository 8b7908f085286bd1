//! Text normalization and content hashing
//!
//! Normalization is what plain (`Contains`) matching applies to both the
//! needle and the haystack. Hashing backs record fingerprints and the
//! store-wide content hash used for sync invalidation.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

use crate::document::ParentId;
use crate::error::SearchResult;

// ────────────────────────────────────────────────────────────────────
// Text normalization
// ────────────────────────────────────────────────────────────────────

/// Normalize text for plain substring matching.
///
/// - NFKC (compatibility composition), so `ﬁ` matches `fi` and full-width
///   forms match ASCII
/// - Lower-cased
/// - Every whitespace run collapsed to one ASCII space, ends trimmed
#[must_use]
pub fn normalize_text(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut prev_ws = true;

    for ch in input.nfkc().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !prev_ws {
                result.push(' ');
            }
            prev_ws = true;
        } else {
            result.push(ch);
            prev_ws = false;
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }
    result
}

// ────────────────────────────────────────────────────────────────────
// Hashing
// ────────────────────────────────────────────────────────────────────

/// Hex-encoded SHA-256 (64 chars).
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Fingerprint of one record: SHA-256 over its JSON encoding.
///
/// Records are encoded through `serde`, so field order follows the type's
/// declaration and maps must be ordered (`BTreeMap`) for stable output.
pub fn fingerprint<T: Serialize + ?Sized>(record: &T) -> SearchResult<String> {
    let encoded = serde_json::to_vec(record)?;
    Ok(sha256_hex(&encoded))
}

/// Store-wide hash over `(parent id, fingerprint)` pairs.
///
/// Iteration order of the `BTreeMap` makes the result independent of the
/// order records were inserted into the store.
#[must_use]
pub fn store_hash(fingerprints: &BTreeMap<ParentId, String>) -> String {
    let mut hasher = Sha256::new();
    for (parent, fp) in fingerprints {
        hasher.update(parent.as_bytes());
        hasher.update([0u8]);
        hasher.update(fp.as_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Hello \t\n  World  "), "hello world");
    }

    #[test]
    fn normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn normalize_applies_nfkc() {
        assert_eq!(normalize_text("\u{FB01}le"), "file");
        assert_eq!(normalize_text("ＭＥＥＴＩＮＧ"), "meeting");
        // Decomposed é composes to the single code point.
        assert_eq!(normalize_text("cafe\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_text("  Ａ  b\u{00A0}\u{00A0}C ");
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = fingerprint(&("m1", "hello")).unwrap();
        let b = fingerprint(&("m1", "hello")).unwrap();
        let c = fingerprint(&("m1", "hello!")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn store_hash_is_order_independent() {
        let mut left = BTreeMap::new();
        left.insert("b".to_owned(), "2".to_owned());
        left.insert("a".to_owned(), "1".to_owned());
        let mut right = BTreeMap::new();
        right.insert("a".to_owned(), "1".to_owned());
        right.insert("b".to_owned(), "2".to_owned());
        assert_eq!(store_hash(&left), store_hash(&right));
    }

    #[test]
    fn store_hash_separates_id_from_fingerprint() {
        let mut left = BTreeMap::new();
        left.insert("ab".to_owned(), "c".to_owned());
        let mut right = BTreeMap::new();
        right.insert("a".to_owned(), "bc".to_owned());
        assert_ne!(store_hash(&left), store_hash(&right));
    }

    #[test]
    fn empty_store_has_stable_hash() {
        let empty = BTreeMap::new();
        assert_eq!(store_hash(&empty), sha256_hex(b""));
    }
}

//! Fuzzy title matching.
//!
//! Titles in the compatibility store come from community spreadsheets and
//! rarely match the internal title embedded in a disc image byte for byte.
//! Matching normalizes both sides and compares with a normalized
//! Levenshtein ratio.

use strsim::normalized_levenshtein;

/// Minimum similarity for a title search to produce any candidates.
pub const TITLE_MATCH_THRESHOLD: f64 = 0.6;

/// Minimum similarity for a match to be accepted without confirmation
/// in batch runs.
pub const AUTOMATED_MATCH_THRESHOLD: f64 = 0.7;

/// Similarity above which an off-region record may still be used.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.9;

/// Lowercase and collapse runs of whitespace to single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity ratio in [0.0, 1.0] between two titles after normalization.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&normalize_title(a), &normalize_title(b))
}

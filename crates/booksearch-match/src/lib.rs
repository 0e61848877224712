//! booksearch-match
//!
//! Approximate substring matching (`fuzzy`) and the lazy per-paragraph match
//! producers built on it (`producer`).
pub mod fuzzy;
pub mod producer;

pub use fuzzy::{fuzzy_substring, fuzzy_substring_similarity, try_fuzzy_substring_similarity, MatchLimits};
pub use producer::{score_paragraph, search_matches, MatchIter, ScoredParagraph};

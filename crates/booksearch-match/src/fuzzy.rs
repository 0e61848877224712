use booksearch_core::error::{Error, Result};
use booksearch_core::types::FuzzyMatch;

/// Distance and span of the best approximate occurrence of a needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstringMatch {
    pub distance: usize,
    pub start_index: usize,
    pub end_index: usize,
}

/// Upper bound on the DP work spent on a single paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLimits {
    /// needle chars x haystack chars
    pub max_cells: usize,
}

impl Default for MatchLimits {
    fn default() -> Self { Self { max_cells: 64 * 1024 * 1024 } }
}

/// Minimum edit distance between `needle` and any substring of `haystack`.
///
/// Levenshtein DP with needle rows and haystack columns, except that row 0 is
/// all zeros so a match may start anywhere in the haystack. The end index is
/// the rightmost column holding the minimum of the last row and the start
/// index is `end - needle_len`. That start is an approximation, not a
/// backtrace through the table; it saturates at 0.
///
/// All indices count characters, not bytes.
pub fn fuzzy_substring(needle: &str, haystack: &str) -> SubstringMatch {
    if let Some(byte_pos) = haystack.find(needle) {
        let start_index = haystack[..byte_pos].chars().count();
        return SubstringMatch { distance: 0, start_index, end_index: start_index + needle.chars().count() };
    }

    let needle: Vec<char> = needle.chars().collect();
    // every character of the needle has to be inserted
    if haystack.is_empty() {
        return SubstringMatch { distance: needle.len(), start_index: 0, end_index: 0 };
    }

    let haystack: Vec<char> = haystack.chars().collect();
    let mut previous = vec![0usize; haystack.len() + 1];
    let mut current = vec![0usize; haystack.len() + 1];

    for (i, &n) in needle.iter().enumerate() {
        current[0] = i + 1;
        for (j, &h) in haystack.iter().enumerate() {
            let cost = usize::from(n != h);
            current[j + 1] = (previous[j + 1] + 1) // deletion
                .min(current[j] + 1) // insertion
                .min(previous[j] + cost); // substitution
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let last_row = previous;
    let distance = last_row.iter().copied().min().unwrap_or(needle.len());
    let end_index = last_row.iter().rposition(|&d| d == distance).unwrap_or(0);

    SubstringMatch { distance, start_index: end_index.saturating_sub(needle.len()), end_index }
}

/// [`fuzzy_substring`] plus a similarity score: `1.0` for an exact hit,
/// `1 - distance / needle_len` otherwise. The score is not clamped.
pub fn fuzzy_substring_similarity(needle: &str, haystack: &str) -> FuzzyMatch {
    let found = fuzzy_substring(needle, haystack);
    let similarity_score = if found.distance == 0 {
        1.0
    } else {
        1.0 - found.distance as f64 / needle.chars().count() as f64
    };
    FuzzyMatch { distance: found.distance, start_index: found.start_index, end_index: found.end_index, similarity_score }
}

/// Like [`fuzzy_substring_similarity`] but refuses paragraphs whose DP table
/// would exceed `limits`. Exact hits never need the table and always succeed.
pub fn try_fuzzy_substring_similarity(needle: &str, haystack: &str, limits: MatchLimits) -> Result<FuzzyMatch> {
    let needle_len = needle.chars().count();
    let haystack_len = haystack.chars().count();
    let cells = needle_len.saturating_mul(haystack_len);
    if cells > limits.max_cells && !haystack.contains(needle) {
        return Err(Error::MatchComputation(format!(
            "{needle_len} x {haystack_len} characters exceeds the {} cell budget",
            limits.max_cells
        )));
    }
    Ok(fuzzy_substring_similarity(needle, haystack))
}

//! Text helpers shared by the strategies: term extraction, bag-of-words
//! similarity and size-bounded splitting. All lengths are in chars.

use std::collections::BTreeMap;

const STOPWORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "because", "been", "before", "being",
    "but", "can", "could", "did", "does", "each", "for", "from", "had", "has", "have", "her",
    "here", "his", "how", "into", "its", "just", "may", "more", "most", "not", "now", "one",
    "only", "other", "our", "out", "over", "she", "should", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "use", "used",
    "using", "very", "via", "was", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "would", "you", "your",
];

/// Term frequencies for a bag-of-words.
pub(crate) type TermCounts = BTreeMap<String, usize>;

/// Length of `text` in chars.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Lowercased content terms: alphanumeric words of three or more chars that
/// are not stopwords.
pub(crate) fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
}

pub(crate) fn term_counts(text: &str) -> TermCounts {
    let mut counts = TermCounts::new();
    add_terms(&mut counts, text);
    counts
}

pub(crate) fn add_terms(counts: &mut TermCounts, text: &str) {
    for term in terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
}

/// Cosine similarity of two term-frequency vectors. Empty vectors score 0.
pub(crate) fn cosine(a: &TermCounts, b: &TermCounts) -> f32 {
    let dot: usize = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    if dot == 0 {
        return 0.0;
    }
    let norm = |v: &TermCounts| v.values().map(|x| (x * x) as f64).sum::<f64>().sqrt();
    (dot as f64 / (norm(a) * norm(b))) as f32
}

/// The `n` most frequent terms, ties broken alphabetically.
pub(crate) fn top_terms(counts: &TermCounts, n: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(t, _)| t.clone()).collect()
}

pub(crate) fn keywords(text: &str, n: usize) -> Vec<String> {
    top_terms(&term_counts(text), n)
}

/// Split `text` into pieces of at most `max` chars, breaking after the last
/// whitespace that fits. Words longer than `max` are cut hard.
pub(crate) fn split_to_fit(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }

        let mut end = (start + max).min(chars.len());
        if end < chars.len() {
            if let Some(ws) = (start + 1..=end).rev().find(|&i| chars[i].is_whitespace()) {
                end = ws;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim_end();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = end;
    }

    pieces
}

/// Find a good break point at or before `target_end`, never at or before
/// `floor`.
///
/// Looks back over the last fifth of the window and prefers a paragraph
/// break, then a newline, then a sentence end, then any whitespace.
pub(crate) fn find_break_point(chars: &[char], floor: usize, target_end: usize) -> usize {
    let total = chars.len();
    if target_end >= total {
        return total;
    }

    let search_start = target_end
        .saturating_sub(target_end.saturating_sub(floor) / 5)
        .max(floor + 1);
    if search_start > target_end {
        return target_end;
    }
    let window = search_start..=target_end;

    for i in window.clone().rev() {
        if i >= 2 && chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
    }

    for i in window.clone().rev() {
        if i >= 1 && chars[i - 1] == '\n' {
            return i;
        }
    }

    for i in window.clone().rev() {
        if i >= 2 && matches!(chars[i - 2], '.' | '!' | '?') && chars[i - 1].is_whitespace() {
            return i;
        }
    }

    for i in window.rev() {
        if i >= 1 && chars[i - 1].is_whitespace() {
            return i;
        }
    }

    target_end
}

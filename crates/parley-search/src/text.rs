// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query normalization and keyword helpers.

/// Words ignored when extracting keywords.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "did", "do",
    "does", "for", "from", "has", "have", "how", "i", "in", "is", "it", "its", "me", "my", "of",
    "on", "or", "our", "please", "should", "tell", "that", "the", "their", "there", "these",
    "this", "to", "was", "we", "were", "what", "when", "where", "which", "who", "why", "will",
    "with", "would", "you", "your",
];

/// Trims, lower-cases and collapses internal whitespace. Used as the cache key.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cased alphanumeric terms of at least `min_len` chars that are not
/// stop-words, in order of appearance.
pub fn keywords(text: &str, min_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= min_len && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with "..."
/// when there is room for it.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars < ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let cut: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    format!("{}{ELLIPSIS}", cut.trim_end())
}

const ELLIPSIS: &str = "...";

/// Line width handed to the HTML renderer; wide enough that snippets are
/// never wrapped before whitespace is collapsed.
const RENDER_WIDTH: usize = 4096;

/// Renders an HTML fragment (such as a snippet with `<strong>` highlights
/// and escaped entities) as plain single-line text.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::from_read_with_decorator(
        html.as_bytes(),
        RENDER_WIDTH,
        html2text::render::TrivialDecorator::new(),
    );
    match rendered {
        Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(e) => {
            tracing::debug!(error = %e, "could not render snippet html, using it as-is");
            html.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_space() {
        assert_eq!(normalize_query("  Sydney   Weather\t"), "sydney weather");
    }

    #[test]
    fn keywords_drop_stop_words_and_short_terms() {
        assert_eq!(
            keywords("What is the weather in Sydney, AU today?", 3),
            vec!["weather", "sydney", "today"]
        );
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "héllo wörld, this is long";
        let cut = truncate_chars(text, 10);
        assert!(cut.chars().count() <= 10);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn truncation_never_exceeds_tiny_limits() {
        for max in 0..3 {
            assert_eq!(truncate_chars("Sydney weather", max).chars().count(), max);
        }
        assert_eq!(truncate_chars("Sydney weather", 3), "...");
    }

    #[test]
    fn tags_are_stripped() {
        assert_eq!(html_to_text("<strong>Sydney</strong> weather"), "Sydney weather");
    }

    #[test]
    fn entities_are_decoded_and_bare_angles_kept() {
        assert_eq!(
            html_to_text("Sydney&#x27;s <strong>weather</strong> &amp; x < 5 and y > 3"),
            "Sydney's weather & x < 5 and y > 3"
        );
    }
}

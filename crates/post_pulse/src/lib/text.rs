//! Character-aware helpers shared by topic grounding and post length enforcement.
//!
//! All lengths are counted in `char`s, never bytes.

use std::collections::HashSet;

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Returns the longest prefix of `s` holding at most `max_chars` characters
pub fn clip_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’')
}

/// Byte offsets just past every sentence terminator (and any closing quotes) that is
/// followed by whitespace or the end of the text
fn sentence_ends(s: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if is_terminator(next) || is_closer(next) {
                end = next_idx + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        match chars.peek() {
            None => ends.push(end),
            Some(&(_, next)) if next.is_whitespace() => ends.push(end),
            _ => {}
        }
    }
    ends
}

/// Splits `s` into trimmed, non-empty sentences
pub fn sentences(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for end in sentence_ends(s) {
        let sentence = s[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = end;
    }
    let rest = s[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Cuts `s` after the last whole sentence that fits in `max_chars`.
///
/// Returns `None` when not even the first sentence fits.
pub fn trim_to_sentence(s: &str, max_chars: usize) -> Option<&str> {
    let s = s.trim();
    sentence_ends(s)
        .into_iter()
        .filter(|&end| char_len(&s[..end]) <= max_chars)
        .last()
        .map(|end| s[..end].trim_end())
}

/// A readable lead-in of at most `max_chars`: whole sentences when possible,
/// otherwise cut at a word boundary with an ellipsis
pub fn leading_excerpt(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if char_len(s) <= max_chars {
        return s.to_string();
    }
    if let Some(trimmed) = trim_to_sentence(s, max_chars) {
        return trimmed.to_string();
    }
    let clipped = clip_chars(s, max_chars.saturating_sub(3));
    let clipped = match clipped.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &clipped[..idx],
        _ => clipped,
    };
    format!("{}...", clipped.trim_end())
}

pub fn words(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_chars_respects_char_boundaries() {
        assert_eq!(clip_chars("héllo", 2), "hé");
        assert_eq!(clip_chars("hi", 10), "hi");
    }

    #[test]
    fn test_sentences() {
        let text = "First one. Second? \"Third!\" Trailing bit";
        assert_eq!(
            sentences(text),
            vec!["First one.", "Second?", "\"Third!\"", "Trailing bit"]
        );
    }

    #[test]
    fn test_decimal_points_are_not_sentence_ends() {
        assert_eq!(sentences("Growth was 3.5 percent. Nice."), vec![
            "Growth was 3.5 percent.",
            "Nice."
        ]);
    }

    #[test]
    fn test_trim_to_sentence() {
        let text = "Short one. A much longer second sentence follows here.";
        assert_eq!(trim_to_sentence(text, 20), Some("Short one."));
        assert_eq!(trim_to_sentence(text, 200), Some(text));
        assert_eq!(trim_to_sentence(text, 5), None);
    }

    #[test]
    fn test_leading_excerpt_prefers_sentences_then_words() {
        assert_eq!(leading_excerpt("One. Two three four.", 8), "One.");
        assert_eq!(leading_excerpt("alpha beta gamma delta", 15), "alpha beta...");
        assert_eq!(leading_excerpt("  tiny ", 15), "tiny");
    }

    #[test]
    fn test_words_ignore_short_tokens() {
        let w = words("The AI revolution, in 2025!");
        assert!(w.contains("revolution"));
        assert!(w.contains("the"));
        assert!(!w.contains("in"));
    }
}

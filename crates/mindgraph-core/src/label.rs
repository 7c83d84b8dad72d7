//! Caption normalization for conversation-turn labels.
//!
//! Raw labels are conversation prompts ("什么是导数", "please explain X"),
//! not display names. Normalization strips the conversational filler and
//! bounds the caption length so nodes stay readable. The pass is pure and
//! idempotent: a re-fetched node is re-normalized on every merge, so running
//! it over its own output must be a fixpoint.

/// Maximum caption length in Unicode scalar values before truncation.
pub const DEFAULT_MAX_CAPTION_CHARS: usize = 12;

const ELLIPSIS: char = '…';

/// Leading prompt phrases, checked in order. Longer variants come before
/// their prefixes so "请解释一下" is not left half-stripped.
const PROMPT_PREFIXES: &[&str] = &[
    "请解释一下",
    "请解释",
    "请讲讲",
    "解释一下",
    "介绍一下",
    "什么是",
    "何为",
    "please explain",
    "tell me about",
    "what is",
    "what are",
    "explain",
];

/// Normalize with the default length bound.
pub fn normalize(text: &str) -> String {
    normalize_with_limit(text, DEFAULT_MAX_CAPTION_CHARS)
}

/// Strips prompt prefixes and markdown heading markers, falls back to the
/// original text when stripping empties the string, then truncates to
/// `max_chars` with an ellipsis. Never returns an empty caption for
/// non-empty input.
pub fn normalize_with_limit(text: &str, max_chars: usize) -> String {
    let original = text.trim();
    let stripped = strip_filler(original);
    let base = if stripped.is_empty() { original } else { stripped };
    truncate_chars(base, max_chars)
}

/// Applies every pattern repeatedly until nothing changes. The fixpoint loop
/// is what keeps normalization idempotent for inputs like "什么是什么是".
fn strip_filler(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let before = current;

        while let Some(rest) = current.strip_prefix('#') {
            current = rest.trim_start();
        }

        for prefix in PROMPT_PREFIXES {
            if let Some(rest) = strip_prefix_ignore_ascii_case(current, prefix) {
                current = rest.trim_start_matches(separator);
            }
        }

        current = current.trim_end_matches(trailing_punctuation).trim_end();

        if current == before {
            return current;
        }
    }
}

fn separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ':' | '：' | ',' | '，')
}

fn trailing_punctuation(c: char) -> bool {
    matches!(c, '?' | '？' | '!' | '！' | '。')
}

/// ASCII prefixes only count on a word boundary, so labels that merely start
/// with the same letters ("explanation", "what island") survive intact. CJK
/// prefixes have no such ambiguity and strip unconditionally.
fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() < prefix.len() || !text.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = text.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    if prefix.is_ascii() && !rest.is_empty() && !rest.starts_with(separator) {
        return None;
    }
    Some(rest)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut caption: String = text.chars().take(max_chars).collect();
    caption.push(ELLIPSIS);
    caption
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_chinese_prompt_prefix() {
        assert_eq!(normalize("什么是导数"), "导数");
        assert_eq!(normalize("什么是导数？"), "导数");
        assert_eq!(normalize("请解释一下链式法则"), "链式法则");
    }

    #[test]
    fn test_strips_english_prompt_prefix() {
        assert_eq!(normalize("what is a monad"), "a monad");
        assert_eq!(normalize("Please explain closures"), "closures");
        assert_eq!(normalize("Explain: recursion"), "recursion");
    }

    #[test]
    fn test_strips_heading_markers() {
        assert_eq!(normalize("## 导数"), "导数");
        assert_eq!(normalize("# what is 积分"), "积分");
    }

    #[test]
    fn test_prefix_strips_only_on_word_boundary() {
        assert_eq!(normalize("what island"), "what island");
        assert_eq!(normalize("explanation"), "explanation");
        assert_eq!(normalize("explains the rule"), "explains the rule");
        // A separator after the phrase still counts as a boundary.
        assert_eq!(normalize("explain: recursion"), "recursion");
    }

    #[test]
    fn test_falls_back_to_original_when_stripped_empty() {
        assert_eq!(normalize("什么是"), "什么是");
        assert_eq!(normalize("###"), "###");
        assert_eq!(normalize("what is?"), "what is?");
    }

    #[test]
    fn test_truncates_long_captions() {
        let caption = normalize("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(caption, "abcdefghijkl…");
        assert_eq!(caption.chars().count(), DEFAULT_MAX_CAPTION_CHARS + 1);
    }

    #[test]
    fn test_truncation_counts_scalar_values() {
        let long = "微积分基本定理以及它的几何意义解释";
        let caption = normalize(long);
        assert_eq!(
            caption,
            long.chars()
                .take(DEFAULT_MAX_CAPTION_CHARS)
                .chain(std::iter::once(ELLIPSIS))
                .collect::<String>()
        );
    }

    #[test]
    fn test_non_empty_for_non_empty_input() {
        for input in ["x", "什么是", "#", "please explain", "  导数  "] {
            assert!(!normalize(input).is_empty(), "emptied {input:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "什么是导数",
            "什么是什么是导数",
            "please explain what is ownership in Rust",
            "## 链式法则",
            "abcdefghijklmnopqrstuvwxyz",
            "微积分基本定理以及它的几何意义解释",
            "什么是",
            "plain caption",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_custom_limit() {
        assert_eq!(normalize_with_limit("abcdef", 3), "abc…");
        assert_eq!(normalize_with_limit("abc", 3), "abc");
    }
}

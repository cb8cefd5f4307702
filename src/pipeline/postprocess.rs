//! Post-processing: isolate the organised content from conversational wrap.
//!
//! The directive asks the service to fence its answer between two `'''`
//! lines. Models still add a sentence before or after the fence ("Here is
//! the extracted text:"), so when enabled this pass keeps only what is
//! inside the first fenced block. It is opt-in: by default the artifacts
//! store exactly what the service returned.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_SENTINEL_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*'''[ \t]*\r?\n(.*?)\r?\n[ \t]*'''[ \t]*\r?$").unwrap());

/// Return the content between the first pair of sentinel lines.
///
/// Falls back to the trimmed input when no complete fenced block is present,
/// so an unfenced answer is never discarded.
pub fn strip_sentinels(input: &str) -> String {
    match RE_SENTINEL_BLOCK.captures(input) {
        Some(caps) => caps[1].trim_matches('\n').to_string(),
        None => input.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_fenced_content() {
        let raw = "Here is the text:\n'''\n# Title\n\nBody line\n'''\nLet me know!";
        assert_eq!(strip_sentinels(raw), "# Title\n\nBody line");
    }

    #[test]
    fn handles_crlf_and_padding() {
        let raw = "  '''  \r\nLine one\r\nLine two\r\n'''\r\n";
        assert_eq!(strip_sentinels(raw), "Line one\r\nLine two");
    }

    #[test]
    fn unfenced_answer_is_kept() {
        assert_eq!(strip_sentinels("\n  plain answer \n"), "plain answer");
    }

    #[test]
    fn unterminated_fence_is_kept_verbatim() {
        let raw = "'''\nstarted but never closed";
        assert_eq!(strip_sentinels(raw), raw);
    }

    #[test]
    fn first_block_wins() {
        let raw = "'''\nfirst\n'''\n'''\nsecond\n'''";
        assert_eq!(strip_sentinels(raw), "first");
    }
}

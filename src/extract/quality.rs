//! Text quality gate.
//!
//! Normalizes extracted text, enforces the hard length cap, and decides
//! whether a result is good enough to stop the pipeline or weak enough to
//! trigger escalation. Also scrubs renderer error strings before they enter
//! diagnostics.

// ── Normalization ───────────────────────────────────────────────────────────

/// Result of normalizing one candidate text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub truncated: bool,
}

/// Clean up candidate text and enforce the character cap.
///
/// With `collapse` set, every whitespace run (newlines and tabs included)
/// becomes a single space. Renderer output is already whitespace-cleaned, so
/// the render path passes `collapse = false` and only trims the ends.
/// Truncation counts characters, not bytes.
pub fn normalize(text: &str, max_chars: usize, collapse: bool) -> Normalized {
    let cleaned: String = if collapse {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.trim().to_string()
    };

    let char_count = cleaned.chars().count();
    if char_count > max_chars {
        Normalized {
            text: cleaned.chars().take(max_chars).collect(),
            truncated: true,
        }
    } else {
        Normalized { text: cleaned, truncated: false }
    }
}

// ── Assessment ──────────────────────────────────────────────────────────────

/// Verdict on a normalized text length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextQuality {
    /// Long enough to return as-is.
    Accepted,
    /// Non-fatal but below the minimum; escalation should be attempted.
    Weak,
}

/// Judge text length against the minimum. The boundary is inclusive: a text
/// of exactly `min_len` characters is accepted.
pub fn assess(text_len: usize, min_len: usize) -> TextQuality {
    if text_len >= min_len {
        TextQuality::Accepted
    } else {
        TextQuality::Weak
    }
}

// ── Error sanitization ──────────────────────────────────────────────────────

const MAX_ERRORS: usize = 3;
const MAX_ERROR_LEN: usize = 200;

/// Scrub renderer error strings before they land in diagnostics.
///
/// Keeps at most three entries of at most 200 characters each. Entries that
/// mention a filesystem path are cut at the first colon, which drops
/// stack-trace tails and their local paths.
pub fn sanitize_errors<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .map(|e| {
            let cut = if e.contains('/') || e.contains('\\') {
                e.split(':').next().unwrap_or(e)
            } else {
                e
            };
            cut.chars().take(MAX_ERROR_LEN).collect::<String>()
        })
        .take(MAX_ERRORS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        let got = normalize("  hello\n\tworld  \n again ", 100, true);
        assert_eq!(got.text, "hello world again");
        assert!(!got.truncated);
    }

    #[test]
    fn test_trim_only_preserves_inner_whitespace() {
        let got = normalize("  line one\nline two  ", 100, false);
        assert_eq!(got.text, "line one\nline two");
    }

    #[test]
    fn test_truncation_is_character_exact() {
        let got = normalize("abcdefghij", 4, false);
        assert_eq!(got.text, "abcd");
        assert!(got.truncated);

        // Multibyte characters count as one each.
        let got = normalize("héllo wörld", 7, false);
        assert_eq!(got.text.chars().count(), 7);
        assert!(got.truncated);
    }

    #[test]
    fn test_truncation_flag_only_when_over_cap() {
        assert!(!normalize("abcd", 4, false).truncated);
        assert!(normalize("abcde", 4, false).truncated);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let text = "  some\t\ttext   with \n gaps  ";
        let once = normalize(text, 50, true);
        let twice = normalize(&once.text, 50, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_assess_boundary_inclusive() {
        assert_eq!(assess(200, 200), TextQuality::Accepted);
        assert_eq!(assess(199, 200), TextQuality::Weak);
        assert_eq!(assess(0, 200), TextQuality::Weak);
    }

    #[test]
    fn test_sanitize_cuts_path_bearing_entries_at_first_colon() {
        let raw = vec![
            "TimeoutError: waiting for selector at /usr/lib/node_modules/puppeteer/lib/Page.js:120:15",
            "/home/user/secret/file.js: permission denied",
        ];
        let got = sanitize_errors(&raw);
        assert_eq!(got, vec!["TimeoutError", "/home/user/secret/file.js"]);
    }

    #[test]
    fn test_sanitize_caps_count_and_length() {
        let long = "x".repeat(500);
        let raw = vec![long.as_str(), "a", "b", "c", "d"];
        let got = sanitize_errors(&raw);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].len(), 200);
        assert_eq!(got[1], "a");
    }

    #[test]
    fn test_sanitize_drops_blank_entries() {
        let raw = vec!["  ", "", "real error"];
        assert_eq!(sanitize_errors(&raw), vec!["real error"]);
    }

    #[test]
    fn test_sanitize_keeps_plain_messages_with_colons() {
        let raw = vec!["Error: net::ERR_CONNECTION_REFUSED"];
        assert_eq!(sanitize_errors(&raw), vec!["Error: net::ERR_CONNECTION_REFUSED"]);
    }
}

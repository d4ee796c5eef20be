//! Anti-bot block detection.
//!
//! Pure predicate over render metadata. A render attempt counts as blocked
//! when the target answered with a challenge-class HTTP status or when any
//! renderer error string carries a known anti-bot signature.

use regex::Regex;
use std::sync::OnceLock;

/// HTTP statuses treated as active blocking regardless of error strings.
const BLOCK_STATUSES: [u16; 3] = [403, 429, 503];

static BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn block_pattern() -> &'static Regex {
    BLOCK_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(captcha|cloudflare|challenge|access denied|forbidden|robot|verify you are human)")
            .unwrap()
    })
}

/// Inspect render metadata for blocking signatures.
///
/// Status match alone is sufficient; error strings are checked with a
/// case-insensitive substring match. No signal on either side means not
/// blocked.
pub fn is_blocked(http_status: Option<u16>, errors: &[String]) -> bool {
    if let Some(status) = http_status {
        if BLOCK_STATUSES.contains(&status) {
            return true;
        }
    }
    errors.iter().any(|e| block_pattern().is_match(e))
}

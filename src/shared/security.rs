//! Usage: Token masking for log output and constant-time state comparison.

use subtle::ConstantTimeEq;

const VISIBLE_PREFIX: usize = 6;
const VISIBLE_SUFFIX: usize = 4;

/// Redact a secret down to `abcdef...7890`. Values too short to keep any
/// context are replaced entirely.
pub(crate) fn mask_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return String::new();
    }
    if token.len() <= VISIBLE_PREFIX + VISIBLE_SUFFIX {
        return "*".repeat(token.len().min(8));
    }
    format!(
        "{}...{}",
        &token[..VISIBLE_PREFIX],
        &token[token.len() - VISIBLE_SUFFIX..]
    )
}

/// Comparison time must not depend on where the inputs diverge; the callback
/// state check goes through here.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

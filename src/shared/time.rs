//! Usage: Wall-clock helpers shared across the auth lifecycle.

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::now_unix_seconds;

    #[test]
    fn clock_is_past_2020() {
        assert!(now_unix_seconds() > 1_577_836_800);
    }
}

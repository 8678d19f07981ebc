//! Time helpers.

use chrono::Utc;

/// Current Unix time in whole seconds.
#[must_use]
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_seconds_is_recent() {
        // 2023-11-14; anything earlier means a broken clock source.
        assert!(unix_seconds() > 1_700_000_000);
    }
}

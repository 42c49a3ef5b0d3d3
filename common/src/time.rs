//! Time utilities and protocol timing constants.

use chrono::{DateTime, Duration, Utc};

/// Protocol timing constants.
pub mod constants {
    use super::Duration;

    /// Lifetime of a pending transaction awaiting confirmation (30 minutes).
    pub fn pending_transaction_ttl() -> Duration {
        Duration::minutes(30)
    }

    /// Idle delay between consumer polls when a topic is empty (10 ms).
    pub fn consumer_idle_delay() -> Duration {
        Duration::milliseconds(10)
    }
}

/// A timestamp with timezone (always UTC for CrownFX).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has expired (is in the past).
pub fn is_expired(expiry: Timestamp) -> bool {
    now() > expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let past = now() - Duration::seconds(10);
        assert!(is_expired(past));

        let future = now() + Duration::seconds(10);
        assert!(!is_expired(future));
    }

    #[test]
    fn test_expires_in() {
        let expiry = expires_in(constants::pending_transaction_ttl());
        let delta = expiry - now();
        assert!(delta > Duration::minutes(29));
        assert!(delta <= Duration::minutes(30));
    }
}

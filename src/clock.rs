use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::signature::SignError;

/// Source of the Unix timestamps that end up in the signed string. Signing a request
/// always samples the clock, so swapping the clock is the only way to get a
/// reproducible signature.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> Result<u64, SignError>;
}

/// The wall clock of the host.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Result<u64, SignError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_err| SignError::Clock)?;
        u64::try_from(elapsed.as_millis()).map_err(|_err| SignError::Clock)
    }
}

/// A clock stuck at one instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> Result<u64, SignError> {
        Ok(self.0)
    }
}

/// A fresh correlation id: a random UUID rendered as 32 lowercase hex digits without
/// separators.
pub fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_in_milliseconds() {
        let now = SystemClock.now_millis().unwrap();
        // 2001-09-09 in milliseconds; a seconds-based clock would be far below this.
        assert!(now > 1_000_000_000_000);
    }

    #[test]
    fn fixed_clock_never_moves() {
        let clock = FixedClock(1_700_000_000_000);
        assert_eq!(clock.now_millis().unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn correlation_id_has_no_separators() {
        let id = correlation_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, correlation_id());
    }
}

//! Injectable time source for the Pulse state machine: a generic
//! dependency at the test seam rather than a concrete system-clock call,
//! so round timeouts can be tested without sleeping.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current unix timestamp in seconds. Production code uses
/// [`SystemClock`]; tests inject a fixed or steppable clock so stage
/// deadlines can be crossed deterministically.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

/// A clock that only advances when told to, for deterministic stage-timeout
/// tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::sync::atomic::AtomicU64,
}

impl FixedClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_on_demand() {
        let clock = FixedClock::new(100);
        assert_eq!(clock.now_secs(), 100);
        clock.advance(30);
        assert_eq!(clock.now_secs(), 130);
    }
}

//! Generic exponential-backoff retry helper, collapsed into one file since
//! this crate only needs the one policy.

use std::{thread::sleep, time::Duration};

use tracing::{error, warn};

pub trait Backoff {
    /// Base delay in ms.
    fn base_delay_ms(&self) -> u64;

    /// Generates next delay given current delay.
    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64;
}

/// Exponential retry backoff expressed as a fixed-point multiplier
/// (`multiplier / multiplier_base`) to avoid floating-point math.
pub struct ExponentialBackoff {
    base_delay_ms: u64,
    multiplier: u64,
    multiplier_base: u64,
}

impl ExponentialBackoff {
    pub fn new(base_delay_ms: u64, multiplier: u64, multiplier_base: u64) -> Self {
        assert!(multiplier_base != 0);
        Self {
            base_delay_ms,
            multiplier,
            multiplier_base,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1500,
            multiplier: 15,
            multiplier_base: 10,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64 {
        curr_delay_ms * self.multiplier / self.multiplier_base
    }
}

/// Runs a fallible operation with a backoff retry, logging a warning on
/// each failure and an error once retries are exhausted.
pub fn retry_with_backoff<R, E, F>(
    name: &str,
    max_retries: u16,
    backoff: &impl Backoff,
    operation: F,
) -> Result<R, E>
where
    F: FnMut() -> Result<R, E>,
    E: std::fmt::Debug,
{
    retry_with_backoff_inner(name, max_retries, backoff, operation, sleep)
}

fn retry_with_backoff_inner<R, E, F, S>(
    name: &str,
    max_retries: u16,
    backoff: &impl Backoff,
    mut operation: F,
    mut sleep_fn: S,
) -> Result<R, E>
where
    F: FnMut() -> Result<R, E>,
    E: std::fmt::Debug,
    S: FnMut(Duration),
{
    let mut delay = backoff.base_delay_ms();

    for attempt in 0..=max_retries {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                warn!(
                    "attempt {} failed with {:?} while running {}, retrying in {}ms",
                    attempt + 1,
                    err,
                    name,
                    delay
                );
                sleep_fn(Duration::from_millis(delay));
                delay = backoff.next_delay_ms(delay);
            }
            Err(err) => {
                error!("max retries exceeded while running {}", name);
                return Err(err);
            }
        }
    }

    unreachable!()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct HalfBackoff;

    impl Backoff for HalfBackoff {
        fn base_delay_ms(&self) -> u64 {
            128
        }

        fn next_delay_ms(&self, curr: u64) -> u64 {
            curr / 2
        }
    }

    #[test]
    fn tracks_sleep_and_retries_correctly() {
        let backoff = HalfBackoff;
        let counter = Arc::new(Mutex::new(0));
        let sleep_log = Arc::new(Mutex::new(Vec::new()));
        let max_retries = 2;

        let result = retry_with_backoff_inner(
            "mock_op",
            max_retries,
            &backoff,
            {
                let counter = Arc::clone(&counter);
                move || -> Result<(), &str> {
                    let mut count = counter.lock().unwrap();
                    *count += 1;
                    Err("fail")
                }
            },
            {
                let sleep_log = Arc::clone(&sleep_log);
                move |dur| {
                    sleep_log.lock().unwrap().push(dur.as_millis() as u64);
                }
            },
        );

        assert_eq!(result, Err("fail"));
        assert_eq!(*counter.lock().unwrap(), 1 + max_retries);
        assert_eq!(sleep_log.lock().unwrap().to_vec(), vec![128, 64]);
    }

    #[test]
    fn succeeds_after_retries() {
        let backoff = HalfBackoff;
        let attempts_counter = Arc::new(Mutex::new(0));
        let success_at_attempt = 2;
        let max_retries = 3;

        let result = retry_with_backoff_inner(
            "mock_op_success",
            max_retries,
            &backoff,
            {
                let attempts_counter = Arc::clone(&attempts_counter);
                move || -> Result<&str, &str> {
                    let mut attempts = attempts_counter.lock().unwrap();
                    *attempts += 1;
                    if *attempts - 1 == success_at_attempt {
                        Ok("success")
                    } else {
                        Err("fail")
                    }
                }
            },
            |_dur| {},
        );

        assert_eq!(result, Ok("success"));
        assert_eq!(*attempts_counter.lock().unwrap(), success_at_attempt + 1);
    }

    #[test]
    fn exhausts_retries_and_returns_last_error() {
        let backoff = ExponentialBackoff::new(10, 15, 10);
        let result: Result<(), &str> =
            retry_with_backoff_inner("always_fails", 1, &backoff, || Err("nope"), |_dur| {});
        assert_eq!(result, Err("nope"));
    }
}

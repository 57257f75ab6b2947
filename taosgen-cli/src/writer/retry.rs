//! Retry wrapper shared by every writer's `write` call (`spec.md` §4.9):
//! exponential backoff, bounded attempt count, failures beyond the budget
//! propagate to the consumer loop rather than being swallowed.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1 << attempt.min(16));
        scaled.min(self.max_delay)
    }
}

/// Runs `op` up to `policy.max_attempts` times, sleeping with exponential
/// backoff between failures. Returns the last error if every attempt fails.
pub fn execute_with_retry<T, E>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E>
where
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                log::warn!("write attempt {attempt} failed, retrying: {err}");
                std::thread::sleep(policy.delay_for(attempt));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let result: Result<u32, &str> = execute_with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient")
            } else {
                Ok(n)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let result: Result<(), &str> = execute_with_retry(&policy, || Err("permanent"));
        assert_eq!(result.unwrap_err(), "permanent");
    }
}

use std::time::Duration;

use rand::Rng as _;

/// Jitter factor bounds applied when advancing the delay.
const JITTER_MIN: f64 = 0.9;
const JITTER_MAX: f64 = 1.1;

/// Exponential backoff state for the reconnect loop.
///
/// The delay actually waited before a retry is the current stored value;
/// jitter is folded into the *next* delay when advancing, so the first wait
/// equals the configured initial delay exactly.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectDelay {
    current: Duration,
    max: Duration,
}

impl ReconnectDelay {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            max,
        }
    }

    /// Return the delay to wait now and advance to the next one.
    ///
    /// Next delay is `min(max, current * 2)` scaled by a jitter factor drawn
    /// uniformly from `[0.9, 1.1]`.
    pub(crate) fn next_wait(&mut self) -> Duration {
        let wait = self.current;
        let jitter = rand::rng().random_range(JITTER_MIN..=JITTER_MAX);
        let doubled = self.current.as_secs_f64() * 2.0;
        let next = doubled.min(self.max.as_secs_f64()) * jitter;
        self.current = Duration::from_secs_f64(next);
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_wait_is_exactly_initial() {
        let mut delay = ReconnectDelay::new(Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(delay.next_wait(), Duration::from_secs(1));
    }

    #[test]
    fn waits_double_within_jitter_bounds() {
        let initial = Duration::from_secs(1);
        let mut delay = ReconnectDelay::new(initial, Duration::from_secs(60));
        let mut lo = initial.as_secs_f64();
        let mut hi = lo;

        // First wait is pre-jitter; the jitter factors compound across later
        // waits, so the Nth wait lies in [2^(N-1) * 0.9^(N-1), 2^(N-1) * 1.1^(N-1)].
        assert_eq!(delay.next_wait(), initial);
        for _ in 0..4 {
            lo *= 2.0 * JITTER_MIN;
            hi *= 2.0 * JITTER_MAX;
            let wait = delay.next_wait().as_secs_f64();
            assert!(
                wait >= lo && wait <= hi,
                "wait {wait} outside jitter bounds [{lo}, {hi}]"
            );
        }
    }

    #[test]
    fn delay_is_capped_at_max() {
        let mut delay = ReconnectDelay::new(Duration::from_secs(1), Duration::from_secs(2));
        for _ in 0..10 {
            let _ = delay.next_wait();
        }
        // Cap of 2s plus at most 10% jitter.
        assert!(delay.next_wait() <= Duration::from_secs_f64(2.2 + f64::EPSILON));
    }

    #[test]
    fn fresh_state_starts_back_at_initial() {
        let mut delay = ReconnectDelay::new(Duration::from_secs(1), Duration::from_secs(60));
        let _ = delay.next_wait();
        let _ = delay.next_wait();
        // A new closure episode builds fresh state, so the wait resets.
        let mut delay = ReconnectDelay::new(Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(delay.next_wait(), Duration::from_secs(1));
    }
}

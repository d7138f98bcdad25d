use super::types::*;
use std::time::Duration;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
            retry_on: vec![RetryCategory::NavigationTimeout, RetryCategory::DriverFault],
        }
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.total_retries + 1
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff(mut self, backoff_policy: BackoffPolicy) -> Self {
        self.backoff_policy = backoff_policy;
        self
    }

    /// Decides whether a failure of `category` gets another attempt. On `Some`,
    /// the retry is recorded in `state` and the returned delay should be slept
    /// before the next attempt.
    pub fn should_retry(
        &self,
        category: RetryCategory,
        state: &mut RetryState,
    ) -> Option<Duration> {
        if !self.retry_on.contains(&category) {
            return None;
        }
        if state.attempts() >= self.max_attempts {
            return None;
        }

        let delay = self.calculate_delay(state.total_retries);
        *state.counts.entry(category).or_insert(0) += 1;
        state.total_retries += 1;
        Some(delay)
    }

    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return std::cmp::min(self.initial_delay, self.max_delay);
        }

        let delay = match self.backoff_policy {
            BackoffPolicy::Constant => self.initial_delay,
            BackoffPolicy::Linear => {
                let steps = u32::try_from(attempt.saturating_add(1)).unwrap_or(u32::MAX);
                self.initial_delay.saturating_mul(steps)
            }
            BackoffPolicy::Exponential { factor } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let nanos = (self.initial_delay.as_nanos() as f64 * factor.powi(exponent)).round();
                if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
                    self.max_delay
                } else {
                    Duration::from_nanos(nanos as u64)
                }
            }
        };

        std::cmp::min(delay, self.max_delay)
    }
}

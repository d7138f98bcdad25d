use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffPolicy {
    Constant,
    Linear,
    Exponential { factor: f64 },
}

/// Failure classes a navigation can be retried for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RetryCategory {
    NavigationTimeout, // readiness wait exceeded
    DriverFault,       // navigation itself failed
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_policy: BackoffPolicy,
    pub retry_on: Vec<RetryCategory>,
}

#[derive(Debug, Clone, Default)]
pub struct RetryState {
    pub counts: HashMap<RetryCategory, usize>,
    pub total_retries: usize,
}

mod r#impl;
mod types;

pub use types::{BackoffPolicy, RetryCategory, RetryPolicy, RetryState};

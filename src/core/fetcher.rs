//! Rate-limited, retried navigation followed by a readiness wait.

use crate::core::config::HarvestConfig;
use crate::core::rate_limit::TokenBucket;
use crate::core::retry::{RetryCategory, RetryPolicy, RetryState};
use crate::drivers::{Driver, DriverError};
use crate::stats::HarvestStats;
use log::{debug, warn};
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};
use url::Url;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Page at {url} was not ready within {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error(transparent)]
    DriverFault(#[from] DriverError),
}

impl FetchError {
    pub fn category(&self) -> RetryCategory {
        match self {
            FetchError::NavigationTimeout { .. } => RetryCategory::NavigationTimeout,
            FetchError::DriverFault(_) => RetryCategory::DriverFault,
        }
    }
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub url: Url,
    /// Navigations issued, the successful one included.
    pub attempts: usize,
    pub retries: RetryState,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct PageFetcher {
    limiter: TokenBucket,
    retry: RetryPolicy,
    ready_timeout: Duration,
    poll_interval: Duration,
    stats: HarvestStats,
}

impl PageFetcher {
    pub fn new(config: &HarvestConfig, stats: HarvestStats) -> Self {
        Self {
            limiter: TokenBucket::new(config.requests_per_sec, config.bucket_capacity),
            retry: config.retry.clone(),
            ready_timeout: config.ready_timeout,
            poll_interval: config.ready_poll_interval,
            stats,
        }
    }

    pub fn limiter(&self) -> &TokenBucket {
        &self.limiter
    }

    /// Navigates `driver` to `url` and waits for the document to be ready.
    ///
    /// Every attempt takes one token from the limiter. Failures in a category
    /// the retry policy covers are retried after the backoff delay; once the
    /// attempts are used up the last error is returned as is.
    pub async fn fetch<D>(&self, driver: &mut D, url: &Url) -> Result<FetchReport, FetchError>
    where
        D: Driver + ?Sized,
    {
        let started = Instant::now();
        let mut state = RetryState::new();

        loop {
            match self.attempt(driver, url).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    self.stats.record_fetch(elapsed);
                    debug!(
                        "Fetched {} in {:?} ({} attempt(s))",
                        url,
                        elapsed,
                        state.attempts()
                    );
                    return Ok(FetchReport {
                        url: url.clone(),
                        attempts: state.attempts(),
                        retries: state,
                        elapsed,
                    });
                }
                Err(err) => {
                    let category = err.category();
                    match self.retry.should_retry(category, &mut state) {
                        Some(delay) => {
                            warn!(
                                "Retrying {} after {:?} (attempt {}/{}): {}",
                                url,
                                delay,
                                state.attempts(),
                                self.retry.max_attempts,
                                err
                            );
                            self.stats.record_retry(format!("{:?}", category));
                            sleep(delay).await;
                        }
                        None => {
                            self.stats.record_fetch_failure();
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    async fn attempt<D>(&self, driver: &mut D, url: &Url) -> Result<(), FetchError>
    where
        D: Driver + ?Sized,
    {
        self.limiter.consume(1).await;
        driver.navigate(url).await?;
        self.wait_until_ready(driver, url).await
    }

    async fn wait_until_ready<D>(&self, driver: &mut D, url: &Url) -> Result<(), FetchError>
    where
        D: Driver + ?Sized,
    {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if driver.is_document_ready().await? {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(FetchError::NavigationTimeout {
                    url: url.to_string(),
                    timeout: self.ready_timeout,
                });
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

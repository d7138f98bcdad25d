use super::PageElement;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Picks one of the built-in user agents. The same seed always yields the same agent.
pub fn choose_user_agent(seed: Option<u64>) -> &'static str {
    let seed = seed.unwrap_or_else(|| u64::from(chrono::Utc::now().timestamp_subsec_nanos()));
    DEFAULT_USER_AGENTS[(seed % DEFAULT_USER_AGENTS.len() as u64) as usize]
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    #[error("Failed to start driver session: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Readiness probe failed: {0}")]
    Readiness(String),

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No page loaded")]
    NoPage,

    #[error("Driver session closed")]
    Closed,
}

/// The narrow surface of a page automation session.
///
/// A driver holds at most one loaded page. Elements returned by `query` are
/// detached snapshots, so they stay usable after the next navigation.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError>;

    async fn is_document_ready(&mut self) -> Result<bool, DriverError>;

    /// All elements of the current page matching `selector`, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<PageElement>, DriverError>;

    /// URL of the page last navigated to.
    fn current_url(&self) -> Option<&Url>;

    /// Releases the session. Calling it twice is harmless.
    async fn close(&mut self) -> Result<(), DriverError>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError> {
        (**self).navigate(url).await
    }

    async fn is_document_ready(&mut self) -> Result<bool, DriverError> {
        (**self).is_document_ready().await
    }

    async fn query(&self, selector: &str) -> Result<Vec<PageElement>, DriverError> {
        (**self).query(selector).await
    }

    fn current_url(&self) -> Option<&Url> {
        (**self).current_url()
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        (**self).close().await
    }
}

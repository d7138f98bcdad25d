use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use super::{select_document, Driver, DriverError, PageElement};

/// What the mock serves for one navigation.
#[derive(Debug, Clone)]
pub enum MockPage {
    /// Loads and is ready on the first probe.
    Html(String),
    /// Loads, and first reports ready on probe number `polls`.
    ReadyAfter { polls: usize, html: String },
    /// Navigation succeeds, readiness never does.
    NeverReady,
    /// Navigation itself fails.
    NavigationFails(String),
}

/// Shared view of what a `MockDriver` was asked to do; stays valid after the
/// driver has been moved into a scraper.
#[derive(Debug, Clone, Default)]
pub struct MockDriverHandle {
    navigations: Arc<Mutex<Vec<Url>>>,
    closes: Arc<AtomicUsize>,
}

impl MockDriverHandle {
    pub fn navigations(&self) -> Vec<Url> {
        self.navigations.lock().clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum Loaded {
    Nothing,
    Pending { polls_left: usize, html: String },
    Ready(String),
    Stuck,
}

/// Serves a fixed script of pages, one per navigation, in order. Once the
/// script runs out every further navigation fails.
#[derive(Debug)]
pub struct MockDriver {
    script: VecDeque<MockPage>,
    loaded: Loaded,
    current_url: Option<Url>,
    handle: MockDriverHandle,
}

impl MockDriver {
    pub fn new(script: Vec<MockPage>) -> Self {
        Self {
            script: script.into(),
            loaded: Loaded::Nothing,
            current_url: None,
            handle: MockDriverHandle::default(),
        }
    }

    pub fn from_html_pages<S: Into<String>>(pages: Vec<S>) -> Self {
        Self::new(pages.into_iter().map(|p| MockPage::Html(p.into())).collect())
    }

    pub fn handle(&self) -> MockDriverHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError> {
        self.handle.navigations.lock().push(url.clone());
        self.current_url = Some(url.clone());
        self.loaded = Loaded::Nothing;

        match self.script.pop_front() {
            Some(MockPage::Html(html)) => self.loaded = Loaded::Ready(html),
            Some(MockPage::ReadyAfter { polls, html }) => {
                self.loaded = Loaded::Pending {
                    polls_left: polls,
                    html,
                }
            }
            Some(MockPage::NeverReady) => self.loaded = Loaded::Stuck,
            Some(MockPage::NavigationFails(reason)) => {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason,
                })
            }
            None => {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: "mock script exhausted".to_string(),
                })
            }
        }
        Ok(())
    }

    async fn is_document_ready(&mut self) -> Result<bool, DriverError> {
        let loaded = std::mem::replace(&mut self.loaded, Loaded::Nothing);
        let (next, ready) = match loaded {
            Loaded::Pending { polls_left, html } if polls_left <= 1 => (Loaded::Ready(html), true),
            Loaded::Pending { polls_left, html } => (
                Loaded::Pending {
                    polls_left: polls_left - 1,
                    html,
                },
                false,
            ),
            Loaded::Ready(html) => (Loaded::Ready(html), true),
            other => (other, false),
        };
        self.loaded = next;
        Ok(ready)
    }

    async fn query(&self, selector: &str) -> Result<Vec<PageElement>, DriverError> {
        match &self.loaded {
            Loaded::Ready(html) => select_document(html, selector),
            _ => Err(DriverError::NoPage),
        }
    }

    fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.handle.closes.fetch_add(1, Ordering::SeqCst);
        self.loaded = Loaded::Nothing;
        Ok(())
    }
}

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{header, Client, ClientBuilder, StatusCode};
use std::time::Duration;
use url::Url;

use super::{choose_user_agent, select_document, Driver, DriverError, PageElement};

const DEFAULT_PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Driver that loads pages with a plain HTTP GET and queries the returned
/// markup. A page counts as ready as soon as its body has been read, so it
/// only suits listing pages that render server-side.
#[derive(Clone)]
pub struct HttpDriver {
    client: Client,
    user_agent: String,
    headers: header::HeaderMap,
    page_load_timeout: Duration,
    current_url: Option<Url>,
    body: Option<String>,
    closed: bool,
}

impl HttpDriver {
    pub fn new() -> Result<Self, DriverError> {
        Self::with_user_agent(choose_user_agent(None))
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, DriverError> {
        Self::build(user_agent, DEFAULT_PAGE_LOAD_TIMEOUT, header::HeaderMap::new())
    }

    pub fn with_page_load_timeout(self, timeout: Duration) -> Result<Self, DriverError> {
        Self::build(&self.user_agent, timeout, self.headers)
    }

    pub fn with_headers(self, headers: Vec<(&str, &str)>) -> Result<Self, DriverError> {
        let mut header_map = self.headers;
        for (key, value) in headers {
            let name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| DriverError::Launch(format!("invalid header name {key:?}: {e}")))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| DriverError::Launch(format!("invalid header value for {key:?}: {e}")))?;
            header_map.insert(name, value);
        }
        Self::build(&self.user_agent, self.page_load_timeout, header_map)
    }

    fn build(
        user_agent: &str,
        page_load_timeout: Duration,
        headers: header::HeaderMap,
    ) -> Result<Self, DriverError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .default_headers(headers.clone())
            .timeout(page_load_timeout)
            .build()
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            headers,
            page_load_timeout,
            current_url: None,
            body: None,
            closed: false,
        })
    }

    fn is_transient(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

#[async_trait]
impl Driver for HttpDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.body = None;
        self.current_url = Some(url.clone());

        let navigation_error = |reason: String| DriverError::Navigation {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);
        if Self::is_transient(status) {
            return Err(navigation_error(format!("status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        trace!("Loaded {} bytes from {}", body.len(), url);
        self.body = Some(body);
        Ok(())
    }

    async fn is_document_ready(&mut self) -> Result<bool, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(self.body.is_some())
    }

    async fn query(&self, selector: &str) -> Result<Vec<PageElement>, DriverError> {
        let body = self.body.as_deref().ok_or(DriverError::NoPage)?;
        select_document(body, selector)
    }

    fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.body = None;
        Ok(())
    }
}

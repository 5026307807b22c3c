//! HTTP client shared by the search provider and the document downloader.
//!
//! CORDIS answers plain library requests with HTML error pages more often than
//! browser-shaped ones, so every request carries a fixed browser-like header set.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response};

/// Accept header preferring XML, then HTML.
pub const ACCEPT_XML_FIRST: &str =
    "text/xml,application/xml,application/xhtml+xml,text/html;q=0.9,*/*;q=0.8";

/// Accept header preferring HTML (search pages).
pub const ACCEPT_HTML_FIRST: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP client with a fixed header profile and request logging.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    source_id: String,
}

fn extract_response_headers(response: &Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

/// Builder for constructing `HttpClient` with optional configuration.
///
/// Required parameters (source_id, timeout) are provided via
/// `HttpClient::builder()`. All other configuration is optional and
/// set through chainable methods before calling `build()`.
pub struct HttpClientBuilder {
    source_id: String,
    timeout: Duration,
    user_agent: Option<String>,
    accept: Option<String>,
}

impl HttpClientBuilder {
    /// Set the user agent string.
    /// - `"impersonate"`: Use random real browser user agent
    /// - Any other string: Use as-is
    /// - Not called: Use the default browser-like user agent
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Set an optional user agent; `None` keeps the default.
    pub fn maybe_user_agent(mut self, ua: Option<&str>) -> Self {
        self.user_agent = ua.map(str::to_string);
        self
    }

    /// Override the Accept header (defaults to XML first).
    pub fn accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    /// Build the `HttpClient`.
    ///
    /// # Errors
    /// Returns an error if a header value is invalid or the TLS backend
    /// cannot be initialized.
    pub fn build(self) -> Result<HttpClient, String> {
        let user_agent = resolve_user_agent(self.user_agent.as_deref());
        let accept = self.accept.as_deref().unwrap_or(ACCEPT_XML_FIRST);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(accept).map_err(|e| format!("Invalid Accept header: {}", e))?,
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
        headers.insert(
            HeaderName::from_static("upgrade-insecure-requests"),
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(self.timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(HttpClient {
            client,
            source_id: self.source_id,
        })
    }
}

impl HttpClient {
    /// Create a builder for configuring an `HttpClient`.
    ///
    /// - `source_id`: Identifier used in log lines
    /// - `timeout`: Request timeout duration
    pub fn builder(source_id: &str, timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            source_id: source_id.to_string(),
            timeout,
            user_agent: None,
            accept: None,
        }
    }

    /// Source identifier used in logs.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Perform a single GET request. No retries.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();

        tracing::debug!(
            "[{}] GET {} -> {} ({} ms)",
            self.source_id,
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        let headers = extract_response_headers(&response);
        Ok(HttpResponse {
            status,
            headers,
            response,
        })
    }

    /// GET with query parameters appended to the URL.
    pub async fn get_with_query(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let start = Instant::now();
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();

        tracing::debug!(
            "[{}] GET {} {:?} -> {} ({} ms)",
            self.source_id,
            url,
            params,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        let headers = extract_response_headers(&response);
        Ok(HttpResponse {
            status,
            headers,
            response,
        })
    }
}

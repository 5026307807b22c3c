//! CORDIS website search.
//!
//! Fetches the public search page and scrapes project links out of it. The
//! result markup changes from time to time, so several container selectors
//! are tried in order before falling back to bare project links.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{SearchError, SearchProvider, SearchSession};
use crate::http_client::{HttpClient, ACCEPT_HTML_FIRST};
use crate::models::CandidateRecord;

/// Public CORDIS site.
pub const CORDIS_BASE_URL: &str = "https://cordis.europa.eu";

/// Result container selectors, most specific first.
const RESULT_SELECTORS: &[&str] = &[
    ".result",
    "[data-testid='result-item']",
    ".search-result",
    "div[class*='result']",
    "article",
    ".project-item",
];

/// Link selectors tried inside a result container.
const LINK_SELECTORS: &[&str] = &[
    "a[href*='/project/id/']",
    ".title a",
    ".result-title a",
    "h3 a",
    "h2 a",
];

const PROJECT_LINK_SELECTOR: &str = "a[href*='/project/id/']";
const DESCRIPTION_SELECTOR: &str = ".description, .summary, .teaser";

static PROJECT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/project/id/(\d+)").expect("project id pattern should compile")
});

static LANGUAGE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(/project/id/\d+)/[a-z]{2}$").expect("language suffix pattern should compile")
});

/// Search provider backed by the CORDIS website.
#[derive(Debug, Clone)]
pub struct CordisSearchProvider {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl CordisSearchProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for CordisSearchProvider {
    fn default() -> Self {
        Self::new(CORDIS_BASE_URL)
    }
}

#[async_trait]
impl SearchProvider for CordisSearchProvider {
    fn name(&self) -> &str {
        "cordis"
    }

    async fn open(&self) -> Result<Box<dyn SearchSession>, SearchError> {
        let client = HttpClient::builder("cordis-search", self.timeout)
            .maybe_user_agent(self.user_agent.as_deref())
            .accept(ACCEPT_HTML_FIRST)
            .build()
            .map_err(SearchError::Config)?;

        debug!("Opened CORDIS search session against {}", self.base_url);
        Ok(Box::new(CordisSearchSession {
            client: Some(client),
            base_url: self.base_url.clone(),
        }))
    }
}

/// One search session; owns its HTTP client (and cookie jar).
struct CordisSearchSession {
    client: Option<HttpClient>,
    base_url: String,
}

#[async_trait]
impl SearchSession for CordisSearchSession {
    async fn search(
        &mut self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, SearchError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("search session already closed".into()))?;

        let url = format!("{}/search", self.base_url);
        let num = limit.to_string();
        debug!("CORDIS search: {}", query);

        let response = client
            .get_with_query(
                &url,
                &[
                    ("q", query),
                    ("p", "1"),
                    ("num", num.as_str()),
                    ("srt", "Relevance:decreasing"),
                ],
            )
            .await?;

        if !response.is_success() {
            return Err(SearchError::Unavailable(format!(
                "CORDIS search returned {} for '{}'",
                response.status, query
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Parse(format!("Failed to read response text: {}", e)))?;

        let results = parse_results(&html, &self.base_url, limit)?;
        debug!("Parsed {} results for '{}'", results.len(), query);
        Ok(results)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed CORDIS search session");
        }
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Make a link absolute and strip a trailing language segment.
fn normalize_project_url(href: &str, base_url: &str) -> String {
    let absolute = if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        match url::Url::parse(base_url).and_then(|base| base.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
        }
    };
    LANGUAGE_SUFFIX.replace(&absolute, "$1").into_owned()
}

fn project_id(href: &str) -> Option<String> {
    PROJECT_ID
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse one result container into a candidate.
fn parse_container(
    element: ElementRef<'_>,
    links: &[Selector],
    description: &Selector,
    base_url: &str,
) -> Option<CandidateRecord> {
    let link = links.iter().find_map(|s| element.select(s).next())?;
    let href = link.value().attr("href")?;
    let id = project_id(href)?;

    if href.contains("/reporting") || href.contains("/factsheet") {
        return None;
    }

    let description = element
        .select(description)
        .next()
        .map(collapse_text)
        .unwrap_or_default();

    Some(CandidateRecord {
        id,
        title: collapse_text(link),
        description,
        url: normalize_project_url(href, base_url),
    })
}

/// Extract candidate projects from a CORDIS search page.
///
/// Containers are located with the first selector that matches anything.
/// When no container yields a project, every project link on the page is
/// used instead. Results keep page order, are unique by id and hold at most
/// `limit` entries.
pub fn parse_results(
    html: &str,
    base_url: &str,
    limit: usize,
) -> Result<Vec<CandidateRecord>, SearchError> {
    let document = Html::parse_document(html);
    let links = LINK_SELECTORS
        .iter()
        .map(|s| selector(s))
        .collect::<Result<Vec<_>, _>>()?;
    let description = selector(DESCRIPTION_SELECTOR)?;

    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for css in RESULT_SELECTORS {
        let containers: Vec<_> = document.select(&selector(css)?).collect();
        if containers.is_empty() {
            continue;
        }
        debug!("Found {} result containers with '{}'", containers.len(), css);

        for container in containers.into_iter().take(limit) {
            if let Some(candidate) = parse_container(container, &links, &description, base_url) {
                if seen.insert(candidate.id.clone()) {
                    results.push(candidate);
                }
            }
        }
        break;
    }

    if results.is_empty() {
        let project_links = selector(PROJECT_LINK_SELECTOR)?;
        for link in document.select(&project_links) {
            if results.len() >= limit {
                break;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(id) = project_id(href) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            let title = collapse_text(link);
            results.push(CandidateRecord {
                id,
                title: if title.is_empty() {
                    "Unknown Title".to_string()
                } else {
                    title
                },
                description: String::new(),
                url: normalize_project_url(href, base_url),
            });
        }
        if !results.is_empty() {
            debug!("Fallback: found {} project links", results.len());
        }
    }

    results.truncate(limit);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="result">
            <h3><a href="/project/id/101057392/en">ACME  Exascale
              Platform</a></h3>
            <p class="teaser">An open exascale platform for research.</p>
          </div>
          <div class="result">
            <a href="/project/id/101057392/reporting">Reporting</a>
          </div>
          <div class="result">
            <a href="https://cordis.europa.eu/project/id/874567">Other Project</a>
          </div>
          <div class="result"><span>No link here</span></div>
        </body></html>
    "#;

    #[test]
    fn parses_result_containers() {
        let results = parse_results(RESULTS_PAGE, CORDIS_BASE_URL, 10).unwrap();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].id, "101057392");
        assert_eq!(results[0].title, "ACME Exascale Platform");
        assert_eq!(
            results[0].url,
            "https://cordis.europa.eu/project/id/101057392"
        );
        assert_eq!(
            results[0].description,
            "An open exascale platform for research."
        );

        assert_eq!(results[1].id, "874567");
        assert_eq!(results[1].description, "");
    }

    #[test]
    fn respects_limit() {
        let results = parse_results(RESULTS_PAGE, CORDIS_BASE_URL, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "101057392");
    }

    #[test]
    fn falls_back_to_bare_links() {
        let html = r#"
            <html><body><ul>
              <li><a href="/project/id/123456/de">Projekt</a></li>
              <li><a href="/project/id/123456">Duplicate</a></li>
              <li><a href="/project/id/654321"></a></li>
            </ul></body></html>
        "#;
        let results = parse_results(html, CORDIS_BASE_URL, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://cordis.europa.eu/project/id/123456");
        assert_eq!(results[1].title, "Unknown Title");
    }

    #[test]
    fn empty_page_yields_no_results() {
        let results = parse_results("<html><body></body></html>", CORDIS_BASE_URL, 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn strips_only_language_suffix() {
        assert_eq!(
            normalize_project_url("/project/id/42/fr", "https://cordis.europa.eu"),
            "https://cordis.europa.eu/project/id/42"
        );
        assert_eq!(
            normalize_project_url("/project/id/42/results", "https://cordis.europa.eu"),
            "https://cordis.europa.eu/project/id/42/results"
        );
    }
}

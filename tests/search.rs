//! CORDIS search provider against a local HTML server.

mod common;

use std::sync::Arc;

use common::spawn_search_server;
use cordisacquire::matching::{MatchResolver, ScriptedChooser};
use cordisacquire::search::{CordisSearchProvider, SearchProvider};

const RESULTS_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="result">
    <h3><a href="/project/id/101057392/en">ACME-X</a></h3>
    <p class="description">Advanced computing for modern exascale systems.</p>
  </div>
  <div class="result">
    <a href="/project/id/101057392/reporting">Results in brief</a>
  </div>
  <div class="result">
    <h3><a href="/project/id/874567">Marine Ecosystem Observatory</a></h3>
  </div>
</body></html>"#;

#[tokio::test]
async fn session_parses_live_results() {
    let (base_url, seen) = spawn_search_server(RESULTS_PAGE).await;
    let provider = CordisSearchProvider::new(base_url.clone());

    let mut session = provider.open().await.unwrap();
    let results = session.search("ACME-X", 10).await.unwrap();
    session.close().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "101057392");
    assert_eq!(results[0].title, "ACME-X");
    assert_eq!(
        results[0].url,
        format!("{}/project/id/101057392", base_url)
    );
    assert!(results[0].description.contains("exascale"));
    assert_eq!(results[1].id, "874567");
    assert_eq!(seen.lock().unwrap().as_slice(), ["ACME-X"]);
}

#[tokio::test]
async fn closed_session_refuses_searches() {
    let (base_url, seen) = spawn_search_server(RESULTS_PAGE).await;
    let provider = CordisSearchProvider::new(base_url);

    let mut session = provider.open().await.unwrap();
    session.close().await;
    session.close().await;

    assert!(session.search("ACME-X", 10).await.is_err());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn resolver_over_http_stops_on_exact_title() {
    let (base_url, seen) = spawn_search_server(RESULTS_PAGE).await;
    let resolver = MatchResolver::new(
        Arc::new(CordisSearchProvider::new(base_url)),
        Arc::new(ScriptedChooser::new(Vec::<String>::new())),
    );

    let project = resolver.resolve("ACME-X", true).await.unwrap();

    assert_eq!(project.id, "101057392");
    assert_eq!(project.score, 1.0);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

//! Shared fixtures: local HTTP servers and scripted search doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use cordisacquire::models::CandidateRecord;
use cordisacquire::search::{SearchError, SearchProvider, SearchSession};

/// A CORDIS-shaped project document comfortably above the minimum size.
pub fn project_xml(id: &str, acronym: &str, title: &str) -> String {
    let objective = "The project develops open research infrastructure and shares \
                     its results with the wider scientific community. "
        .repeat(12);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://cordis.europa.eu">
  <id>{id}</id>
  <acronym>{acronym}</acronym>
  <title>{title}</title>
  <objective>{objective}</objective>
  <startDate>2023-01-01</startDate>
  <endDate>2026-12-31</endDate>
  <totalCost>2500000</totalCost>
  <ecMaxContribution>2000000</ecMaxContribution>
  <keywords>research infrastructure</keywords>
</project>
"#
    )
}

/// Serve `docs` (id -> body) at `/project/id/{id}`; unknown ids are 404.
/// Returns the base URL and a request counter.
pub async fn spawn_document_server(docs: HashMap<String, String>) -> (String, Arc<AtomicUsize>) {
    #[derive(Clone)]
    struct DocState {
        docs: Arc<HashMap<String, String>>,
        hits: Arc<AtomicUsize>,
    }

    async fn document(
        State(state): State<DocState>,
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        state.hits.fetch_add(1, Ordering::SeqCst);
        if params.get("format").map(String::as_str) != Some("xml") {
            return (StatusCode::BAD_REQUEST, "format=xml required").into_response();
        }
        match state.docs.get(&id) {
            Some(body) => (
                [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
                body.clone(),
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, "Project not found").into_response(),
        }
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let state = DocState {
        docs: Arc::new(docs),
        hits: hits.clone(),
    };
    let app = Router::new()
        .route("/project/id/:id", get(document))
        .with_state(state);
    (serve(app).await, hits)
}

/// Serve a fixed HTML page at `/search`, recording the `q` parameters seen.
pub async fn spawn_search_server(page: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let app = Router::new().route(
        "/search",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let recorder = recorder.clone();
            async move {
                if let Some(q) = params.get("q") {
                    recorder.lock().unwrap().push(q.clone());
                }
                ([(header::CONTENT_TYPE, "text/html")], page)
            }
        }),
    );
    (serve(app).await, seen)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Call counters shared between a scripted provider and the test.
#[derive(Debug, Default)]
pub struct Calls {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl Calls {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

/// In-memory provider answering from a table keyed by search term.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: HashMap<String, Vec<CandidateRecord>>,
    fallback: Vec<CandidateRecord>,
    failing: Vec<String>,
    pub calls: Arc<Calls>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `term` with `records`.
    pub fn respond(mut self, term: &str, records: Vec<CandidateRecord>) -> Self {
        self.responses.insert(term.to_string(), records);
        self
    }

    /// Answer every term without an explicit response with `records`.
    pub fn fallback(mut self, records: Vec<CandidateRecord>) -> Self {
        self.fallback = records;
        self
    }

    /// Fail searches for `term`.
    pub fn fail(mut self, term: &str) -> Self {
        self.failing.push(term.to_string());
        self
    }
}

struct ScriptedSession {
    responses: HashMap<String, Vec<CandidateRecord>>,
    fallback: Vec<CandidateRecord>,
    failing: Vec<String>,
    calls: Arc<Calls>,
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self) -> Result<Box<dyn SearchSession>, SearchError> {
        self.calls.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            responses: self.responses.clone(),
            fallback: self.fallback.clone(),
            failing: self.failing.clone(),
            calls: self.calls.clone(),
        }))
    }
}

#[async_trait]
impl SearchSession for ScriptedSession {
    async fn search(
        &mut self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, SearchError> {
        self.calls.queries.lock().unwrap().push(query.to_string());
        if self.failing.iter().any(|t| t == query) {
            return Err(SearchError::Unavailable(format!("scripted failure for {}", query)));
        }
        let mut records = self
            .responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        records.truncate(limit);
        Ok(records)
    }

    async fn close(&mut self) {
        self.calls.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn record(id: &str, title: &str) -> CandidateRecord {
    CandidateRecord::new(
        id,
        title,
        "",
        format!("https://cordis.europa.eu/project/id/{}", id),
    )
}

//! cordisacquire - CORDIS project resolution and document acquisition.
//!
//! Resolves free-text project names or acronyms to CORDIS project ids,
//! downloads and validates the project XML records, and feeds them to the
//! RAXKG knowledge-graph build.

pub mod acquisition;
pub mod cli;
pub mod collector;
pub mod config;
pub mod graph;
pub mod http_client;
pub mod matching;
pub mod models;
pub mod search;
pub mod storage;

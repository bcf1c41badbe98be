//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{FeedEntry, HashField};
use crate::traits::{DocumentParser, Fetcher, Transport};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Mock transport that replays a queue of responses.
#[derive(Clone)]
pub struct MockTransport {
    /// Each call pops the first element. If empty, returns a network error.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new(body: &str) -> Self {
        Self::with_responses(vec![Ok(body.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(AppError::NetworkError("no mock response queued".into()))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving fixed bodies per URL. Unknown URLs yield `None`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages.lock().unwrap().get(url).cloned()
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Line-oriented fake parser.
///
/// Feed and search documents hold one `title|link` entry per line; lines
/// without a `|` are skipped. Detail documents carry an `Info Hash:` line.
#[derive(Clone, Default)]
pub struct MockParser;

impl MockParser {
    fn entries(document: &str) -> Vec<FeedEntry> {
        document
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                line.split_once('|')
                    .map(|(title, link)| FeedEntry::new(title.trim(), link.trim()))
            })
            .collect()
    }
}

impl DocumentParser for MockParser {
    fn parse_feed(&self, document: &str) -> Vec<FeedEntry> {
        Self::entries(document)
    }

    fn parse_search(&self, document: &str) -> Vec<FeedEntry> {
        Self::entries(document)
    }

    fn find_hash_field(&self, document: &str) -> HashField {
        match document
            .lines()
            .find_map(|line| line.trim().strip_prefix("Info Hash:"))
        {
            Some(value) if !value.trim().is_empty() => HashField::Found(value.trim().to_string()),
            Some(_) => HashField::MissingValue,
            None => HashField::MissingLabel,
        }
    }
}

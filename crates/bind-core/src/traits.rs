use std::future::Future;

use crate::error::AppError;
use crate::models::{FeedEntry, HashField};

/// One way of downloading a URL (a single waterfall layer).
///
/// Any non-success status must be reported as an error; soft-block detection
/// happens in the waterfall, not here.
pub trait Transport: Send + Sync + Clone {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Fetches the text body of a URL. Failures are absorbed and reported as `None`.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Turns site documents into entries and hash fields.
///
/// Malformed entries are skipped by implementations, never returned as errors.
pub trait DocumentParser: Send + Sync + Clone {
    /// Parses the RSS feed of recent uploads.
    fn parse_feed(&self, document: &str) -> Vec<FeedEntry>;

    /// Parses a search results page.
    fn parse_search(&self, document: &str) -> Vec<FeedEntry>;

    /// Locates the info-hash field of a detail page.
    fn find_hash_field(&self, document: &str) -> HashField;
}

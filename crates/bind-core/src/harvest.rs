use url::Url;

use crate::identifier;
use crate::models::{CandidateRecord, FeedEntry, HashField};
use crate::traits::{DocumentParser, Fetcher};

/// Site-facing operations: list recent uploads, search, and resolve a detail
/// page to its info hash.
///
/// Generic over the fetcher and parser so the pipeline can be exercised
/// without network access.
#[derive(Clone)]
pub struct HarvestService<F, P>
where
    F: Fetcher,
    P: DocumentParser,
{
    fetcher: F,
    parser: P,
    base_url: Url,
}

impl<F, P> HarvestService<F, P>
where
    F: Fetcher,
    P: DocumentParser,
{
    pub fn new(fetcher: F, parser: P, base_url: Url) -> Self {
        Self {
            fetcher,
            parser,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).ok()
    }

    pub fn feed_url(&self) -> Option<Url> {
        self.endpoint("/rss")
    }

    pub fn search_url(&self, term: &str) -> Option<Url> {
        let mut url = self.endpoint("/")?;
        url.query_pairs_mut().append_pair("s", term);
        Some(url)
    }

    /// Resolves an absolute or site-relative link against the base URL.
    pub fn resolve(&self, link: &str) -> Option<Url> {
        let link = link.trim();
        if link.starts_with("http") {
            Url::parse(link).ok()
        } else {
            self.base_url.join(link).ok()
        }
    }

    fn to_candidates(&self, entries: Vec<FeedEntry>) -> Vec<CandidateRecord> {
        entries
            .into_iter()
            .filter_map(|entry| match self.resolve(&entry.link) {
                Some(detail_link) => Some(CandidateRecord {
                    title: entry.title,
                    detail_link,
                    identifier: None,
                }),
                None => {
                    tracing::warn!(title = %entry.title, link = %entry.link, "Skipping entry with unusable link");
                    None
                }
            })
            .collect()
    }

    /// Candidates from the site's RSS feed. Empty if the feed cannot be fetched.
    pub async fn get_recent_candidates(&self) -> Vec<CandidateRecord> {
        let Some(url) = self.feed_url() else {
            tracing::error!(base_url = %self.base_url, "Cannot build feed URL");
            return Vec::new();
        };

        let Some(document) = self.fetcher.fetch(url.as_str()).await else {
            return Vec::new();
        };

        let candidates = self.to_candidates(self.parser.parse_feed(&document));
        tracing::info!(count = candidates.len(), "Parsed feed");
        candidates
    }

    pub async fn search(&self, term: &str) -> Vec<CandidateRecord> {
        let Some(url) = self.search_url(term) else {
            return Vec::new();
        };

        let Some(document) = self.fetcher.fetch(url.as_str()).await else {
            return Vec::new();
        };

        self.to_candidates(self.parser.parse_search(&document))
    }

    /// Fetches a detail page and returns its canonical info hash.
    pub async fn extract_identifier(&self, detail_link: &str) -> Option<String> {
        let Some(url) = self.resolve(detail_link) else {
            tracing::warn!(link = %detail_link, "Cannot resolve detail link");
            return None;
        };

        let document = self.fetcher.fetch(url.as_str()).await?;

        match self.parser.find_hash_field(&document) {
            HashField::Found(raw) => identifier::canonicalize(&raw),
            HashField::MissingValue => {
                tracing::warn!(%url, "Found 'Info Hash:' label but no value");
                None
            }
            HashField::MissingLabel => {
                tracing::warn!(%url, "Could not find 'Info Hash:'");
                None
            }
        }
    }
}

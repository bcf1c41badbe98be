use url::Url;

/// A `{title, link}` pair exactly as found in a feed or search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }
}

/// A listing entry whose detail page may yield an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    /// Absolute URL of the detail page.
    pub detail_link: Url,
    /// Canonical 40-char lowercase hex info hash, once known.
    pub identifier: Option<String>,
}

/// Result of looking for the labelled info-hash field in a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashField {
    /// Raw, not yet canonicalized, value next to the label.
    Found(String),
    /// The label is present but has no value cell.
    MissingValue,
    /// The label is not on the page.
    MissingLabel,
}

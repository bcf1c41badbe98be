//! Magnet link construction and parsing.
//!
//! Links are derived values: the emitted file keeps them for readers, but a
//! reader can rebuild any stored link with the current tracker set through
//! [`ParsedLink::regenerate`].

use url::form_urlencoded;

const MAGNET_PREFIX: &str = "magnet:?";
const BTIH_PREFIX: &str = "urn:btih:";

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builds `magnet:?xt=urn:btih:<id>&dn=<title>` followed by one `tr`
/// parameter per tracker, in order.
///
/// The title and trackers are form-encoded (space becomes `+`, reserved
/// characters are percent-escaped) so none of them can split the query.
pub fn build_link<S: AsRef<str>>(identifier: &str, title: &str, trackers: &[S]) -> String {
    let mut link = format!(
        "{MAGNET_PREFIX}xt={BTIH_PREFIX}{identifier}&dn={}",
        encode(title)
    );
    for tracker in trackers {
        link.push_str("&tr=");
        link.push_str(&encode(tracker.as_ref()));
    }
    link
}

/// The parts of a stored magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub identifier: String,
    pub title: String,
    pub trackers: Vec<String>,
}

impl ParsedLink {
    /// Parses a magnet link. Returns `None` if it has no `urn:btih:` topic.
    pub fn parse(link: &str) -> Option<Self> {
        let query = link.trim().strip_prefix(MAGNET_PREFIX)?;

        let mut identifier = None;
        let mut title = None;
        let mut trackers = Vec::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "xt" => {
                    if let Some(hash) = value.strip_prefix(BTIH_PREFIX) {
                        identifier = Some(hash.to_lowercase());
                    }
                }
                "dn" => title = Some(value.into_owned()),
                "tr" => trackers.push(value.into_owned()),
                _ => {}
            }
        }

        Some(Self {
            identifier: identifier?,
            title: title.unwrap_or_else(|| "Unknown".to_string()),
            trackers,
        })
    }

    /// Rebuilds the link with `trackers` in place of the stored ones.
    pub fn regenerate<S: AsRef<str>>(&self, trackers: &[S]) -> String {
        build_link(&self.identifier, &self.title, trackers)
    }

    pub fn to_link(&self) -> String {
        self.regenerate(&self.trackers)
    }
}

//! HTML/RSS document parser.
//!
//! The site's RSS feed is parsed with the HTML parser too. Two HTML rules
//! matter for feeds:
//! - `<link>` is a void element, so an item's URL ends up in the text node
//!   right after it rather than inside it.
//! - `<title>` is raw text, so a `<![CDATA[...]]>` wrapper stays in the text.

use bind_core::models::{FeedEntry, HashField};
use bind_core::traits::DocumentParser;
use scraper::{ElementRef, Html, Selector};

const HASH_LABEL: &str = "Info Hash:";

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!(%css, error = %e, "Invalid selector");
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn strip_cdata(text: &str) -> &str {
    text.trim()
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(text.trim())
}

/// Parser for the site's feed, search and detail pages, built on `scraper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocumentParser;

impl HtmlDocumentParser {
    pub fn new() -> Self {
        Self
    }

    fn item_title(item: ElementRef<'_>) -> Option<String> {
        let title_sel = selector("title")?;
        let title = item.select(&title_sel).next()?;
        let text = element_text(title);
        let text = strip_cdata(&text);
        (!text.is_empty()).then(|| text.to_string())
    }

    fn item_link(item: ElementRef<'_>) -> Option<String> {
        let link_sel = selector("link")?;
        let link = item.select(&link_sel).next()?;

        let inner = element_text(link);
        if !inner.is_empty() {
            return Some(inner);
        }

        link.next_siblings()
            .take_while(|node| !node.value().is_element())
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
            .map(str::to_string)
    }
}

impl DocumentParser for HtmlDocumentParser {
    fn parse_feed(&self, document: &str) -> Vec<FeedEntry> {
        let Some(item_sel) = selector("item") else {
            return Vec::new();
        };
        let html = Html::parse_document(document);

        let mut entries = Vec::new();
        for item in html.select(&item_sel) {
            match (Self::item_title(item), Self::item_link(item)) {
                (Some(title), Some(link)) => entries.push(FeedEntry::new(title, link)),
                _ => tracing::warn!("Skipping RSS item with missing title or link"),
            }
        }
        entries
    }

    fn parse_search(&self, document: &str) -> Vec<FeedEntry> {
        let (Some(post_sel), Some(heading_sel), Some(anchor_sel)) = (
            selector(".post"),
            selector(".postTitle h2 a"),
            selector(".postTitle a"),
        ) else {
            return Vec::new();
        };
        let html = Html::parse_document(document);

        html.select(&post_sel)
            .filter_map(|post| {
                let anchor = post
                    .select(&heading_sel)
                    .next()
                    .or_else(|| post.select(&anchor_sel).next())?;
                let href = anchor.value().attr("href")?.trim();
                let title = element_text(anchor);
                if href.is_empty() || title.is_empty() {
                    tracing::debug!("Skipping search result without title or link");
                    return None;
                }
                Some(FeedEntry::new(title, href))
            })
            .collect()
    }

    fn find_hash_field(&self, document: &str) -> HashField {
        let Some(td_sel) = selector("td") else {
            return HashField::MissingLabel;
        };
        let html = Html::parse_document(document);

        let Some(label) = html
            .select(&td_sel)
            .find(|cell| element_text(*cell) == HASH_LABEL)
        else {
            return HashField::MissingLabel;
        };

        label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|sibling| sibling.value().name() == "td")
            .map(|value| HashField::Found(element_text(value)))
            .unwrap_or(HashField::MissingValue)
    }
}

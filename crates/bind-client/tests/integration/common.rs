use std::path::{Path, PathBuf};

use bind_client::{HtmlDocumentParser, ReqwestTransport, build_waterfall};
use bind_core::config::{ConfigOverrides, HarvestConfig};
use bind_core::harvest::HarvestService;
use bind_core::metrics::LayerMetrics;
use bind_core::throttle::ThrottleConfig;
use bind_core::waterfall::FetchWaterfall;

pub const HASH_HEX: &str = "abc123def456789012345678901234567890abcd";
pub const HASH_BASE32: &str = "YEX6DQDLXISUVHOJ6UM3GNNKPQJWPKEK";
pub const HASH_BASE32_HEX: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

pub const CHALLENGE_PAGE: &str =
    "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";

/// RSS document with one `<item>` per `(title, link)` pair.
pub fn feed(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link)| {
            format!("<item><title><![CDATA[{title}]]></title><link>{link}</link></item>\n")
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Books</title>\n{items}</channel></rss>"
    )
}

pub fn detail_page(hash: &str) -> String {
    format!(
        "<html><body><div class=\"postContent\"><table>\
         <tr><td>Format:</td><td>M4B</td></tr>\
         <tr><td>Info Hash:</td><td>{hash}</td></tr>\
         </table></div></body></html>"
    )
}

/// Configuration pointing at a local mock site, with no politeness delay.
pub fn config(base_url: &str, output_dir: &Path, proxy: Option<&str>) -> HarvestConfig {
    let overrides = ConfigOverrides {
        base_url: Some(base_url.to_string()),
        proxy: proxy.map(str::to_string),
        output_dir: Some(output_dir.to_path_buf()),
        breaker_threshold: Some(2),
        ..Default::default()
    };
    let mut config = HarvestConfig::from_lookup(overrides, |_| None).unwrap();
    config.throttle = ThrottleConfig::disabled();
    config
}

pub fn waterfall(config: &HarvestConfig) -> (FetchWaterfall<ReqwestTransport>, LayerMetrics) {
    let metrics = LayerMetrics::new();
    let waterfall = build_waterfall(config, metrics.clone()).unwrap();
    (waterfall, metrics)
}

pub fn service(
    config: &HarvestConfig,
) -> HarvestService<FetchWaterfall<ReqwestTransport>, HtmlDocumentParser> {
    let (waterfall, _) = waterfall(config);
    HarvestService::new(waterfall, HtmlDocumentParser::new(), config.base_url.clone())
}

/// Output directory inside `root`, so the tracker file lands in `root` too.
pub fn output_dir(root: &Path) -> PathBuf {
    let dir = root.join("magnets");
    bind_core::config::ensure_output_dir(&dir).unwrap();
    dir
}

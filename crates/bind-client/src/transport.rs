use std::time::Duration;

use bind_core::error::AppError;
use bind_core::traits::Transport;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const CONSERVATIVE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0";

/// HTTP transport using reqwest.
///
/// Three constructors match the three waterfall layers: a browser-like
/// client, the same client routed through a proxy, and a plainer HTTP/1.1
/// client that never reuses connections.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    /// Browser-impersonating client, direct connection.
    pub fn impersonating(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self::from_client(client, timeout))
    }

    /// Browser-impersonating client routed through `proxy_url`
    /// (`http://`, `https://` or `socks5://`).
    pub fn proxied(timeout: Duration, proxy_url: &str) -> Result<Self, AppError> {
        let proxy = Proxy::all(proxy_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid proxy: {e}")))?;

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .timeout(timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self::from_client(client, timeout))
    }

    /// Conservative fallback client: HTTP/1.1 only, fresh connection per request.
    pub fn conservative(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(CONSERVATIVE_USER_AGENT)
            .timeout(timeout)
            .http1_only()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self::from_client(client, timeout))
    }

    fn from_client(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout_secs: timeout.as_secs(),
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

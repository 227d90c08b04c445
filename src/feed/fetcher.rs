use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::parser::{parse_feed, ParseError};
use super::types::RawFeed;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sent on every request, including proxied ones.
pub const USER_AGENT: &str = concat!("newsboard/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_FETCH_SERVICE_ENDPOINT: &str = "https://app.scrapingbee.com/api/v1/";

/// Errors that can occur while retrieving a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Forward proxy and fetch service were both configured.
    #[error("Pick either a proxy or the fetch service, not both")]
    ConfigConflict,
    /// Upstream redirected to its "unsupported" page.
    #[error("This feed is not available")]
    FeedUnavailable,
    /// Fetch service answered with anything but 200.
    #[error("Fetch service status {status}: {body}")]
    FetchService { status: u16, body: String },
    /// Direct or proxied fetch returned a non-2xx status.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Body could not be read as a feed, even after the direct retry.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Forward proxy URLs per scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    fn client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(http) = &self.http {
            let proxy =
                reqwest::Proxy::http(http).map_err(|e| FetchError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if let Some(https) = &self.https {
            let proxy = reqwest::Proxy::https(https)
                .map_err(|e| FetchError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| FetchError::InvalidProxy(e.to_string()))
    }
}

/// Third-party fetch service (ScrapingBee-compatible API).
pub struct FetchService {
    api_key: SecretString,
    endpoint: String,
}

impl FetchService {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_endpoint(api_key, DEFAULT_FETCH_SERVICE_ENDPOINT)
    }

    pub fn with_endpoint(api_key: SecretString, endpoint: &str) -> Self {
        Self {
            api_key,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_url(&self, target: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("api_key", self.api_key.expose_secret()),
                ("url", target),
                ("render_js", "false"),
            ],
        )
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }
}

/// Masks the API key.
impl std::fmt::Debug for FetchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchService")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// How a single fetch is routed. At most one of the two may be set.
#[derive(Debug, Default)]
pub struct FetchOptions {
    pub proxy: Option<ProxyConfig>,
    pub fetch_service: Option<FetchService>,
}

enum Route<'a> {
    Direct,
    Proxy(&'a ProxyConfig),
    Service(&'a FetchService),
}

impl FetchOptions {
    pub fn is_direct(&self) -> bool {
        self.proxy.is_none() && self.fetch_service.is_none()
    }

    fn route(&self) -> Result<Route<'_>, FetchError> {
        match (&self.proxy, &self.fetch_service) {
            (Some(_), Some(_)) => Err(FetchError::ConfigConflict),
            (Some(proxy), None) => Ok(Route::Proxy(proxy)),
            (None, Some(service)) => Ok(Route::Service(service)),
            (None, None) => Ok(Route::Direct),
        }
    }
}

/// Response body plus the URL the request finally landed on.
#[derive(Debug)]
pub struct FetchedFeed {
    pub body: String,
    pub final_url: Url,
}

/// Retrieves feeds and recognizes the upstream "unsupported" redirect.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    unavailable_prefix: String,
}

impl FeedFetcher {
    /// `base_url` is the feed root; redirects to `{base_url}/unsupported`
    /// mean the feed does not exist.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            unavailable_prefix: format!("{}/unsupported", base_url.trim_end_matches('/')),
        }
    }

    /// Fetches `url` once, following `options`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::ConfigConflict`] - proxy and fetch service both set; no request is made
    /// - [`FetchError::FetchService`] - the service returned a non-200 status
    /// - [`FetchError::FeedUnavailable`] - the final URL is the upstream sentinel
    /// - [`FetchError::HttpStatus`] - non-2xx on a direct or proxied fetch
    /// - [`FetchError::Timeout`], [`FetchError::Network`], [`FetchError::ResponseTooLarge`]
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedFeed, FetchError> {
        let route = options.route()?;

        let response = match route {
            Route::Direct => {
                tracing::debug!(%url, "Fetching feed");
                send(&self.client, url).await?
            }
            Route::Proxy(proxy) => {
                tracing::debug!(%url, "Fetching feed through proxy");
                send(&proxy.client()?, url).await?
            }
            Route::Service(service) => {
                tracing::debug!(%url, endpoint = %service.endpoint(), "Fetching feed through fetch service");
                let request_url = service.request_url(url)?;
                let response = send(&self.client, request_url.as_str()).await?;
                if response.status() != reqwest::StatusCode::OK {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::FetchService { status, body });
                }
                response
            }
        };

        let final_url = response.url().clone();
        if final_url.as_str().starts_with(&self.unavailable_prefix) {
            tracing::warn!(%url, final_url = %final_url, "Upstream reports feed unsupported");
            return Err(FetchError::FeedUnavailable);
        }

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        let body = String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)?;
        Ok(FetchedFeed { body, final_url })
    }

    /// Fetches and parses a feed.
    ///
    /// When the fetch was direct and the body parsed to zero entries (or did
    /// not parse), the feed is fetched directly once more and parsed again.
    /// Proxied and fetch-service requests never fall back, since a direct
    /// retry would bypass the configured route.
    pub async fn fetch_feed(&self, url: &str, options: &FetchOptions) -> Result<RawFeed, FetchError> {
        let fetched = self.fetch(url, options).await?;
        let parsed = parse_feed(&fetched.body);

        if !options.is_direct() {
            return Ok(parsed?);
        }

        match parsed {
            Ok(feed) if !feed.entries.is_empty() => return Ok(feed),
            Ok(_) => tracing::debug!(%url, "Feed had no entries, retrying direct fetch"),
            Err(e) => tracing::debug!(%url, error = %e, "Feed did not parse, retrying direct fetch"),
        }

        let retry = self.fetch(url, &FetchOptions::default()).await?;
        Ok(parse_feed(&retry.body)?)
    }
}

async fn send(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, FetchError> {
    tokio::time::timeout(REQUEST_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

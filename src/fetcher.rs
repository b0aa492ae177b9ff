use crate::ResolveError;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

const DEFAULT_USER_AGENT: &str = "video-unfurl/0.3.0";

/// Standard oEmbed document as served by the YouTube and Vimeo endpoints.
/// Vimeo additionally fills `description` and `duration`; every field is
/// optional because the two providers disagree on the exact set.
#[derive(Debug, Clone, Deserialize)]
pub struct OEmbedResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider_name: String,
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        let timeout = Duration::from_secs(10);
        debug!("Fetcher initialized with default configuration");

        Self::new_with_custom_config(timeout, DEFAULT_USER_AGENT)
    }

    pub fn new_with_custom_config(timeout: Duration, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to create HTTP client");
                panic!("Failed to initialize HTTP client: {}", e);
            });
        Fetcher { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Creates a Fetcher with custom configuration
    /// This method allows users to provide their own configuration options
    pub fn new_with_config(config: FetcherConfig) -> Self {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if let Some(redirect_policy) = config.redirect_policy {
            client_builder = client_builder.redirect(redirect_policy);
        }

        let client = client_builder
            .build()
            .expect("Failed to create HTTP client with custom config");

        Self { client }
    }

    /// GET a JSON document and decode it into `T`, mapping HTTP status codes
    /// onto the error taxonomy.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        platform: &str,
    ) -> Result<T, ResolveError> {
        debug!(url = %url, "Sending JSON GET request");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Request failed");
            map_reqwest_error(e, platform)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Non-success status from remote API");
            return Err(status_error(status, platform, url));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to decode JSON body");
            ResolveError::RemoteApiError {
                platform: platform.to_string(),
                message: format!("invalid JSON body: {e}"),
            }
        })
    }

    /// POST a JSON body and return the decoded JSON response.
    #[instrument(level = "debug", skip(self, body), err)]
    pub async fn post_json_value(
        &self,
        url: &str,
        body: &serde_json::Value,
        platform: &str,
    ) -> Result<serde_json::Value, ResolveError> {
        debug!(url = %url, "Sending JSON POST request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Request failed");
                map_reqwest_error(e, platform)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Non-success status from remote API");
            return Err(status_error(status, platform, url));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to decode JSON body");
            ResolveError::RemoteApiError {
                platform: platform.to_string(),
                message: format!("invalid JSON body: {e}"),
            }
        })
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_oembed(
        &self,
        oembed_url: &str,
        platform: &str,
    ) -> Result<OEmbedResponse, ResolveError> {
        debug!(url = %oembed_url, "Fetching oEmbed document");
        self.fetch_json(oembed_url, platform).await
    }

    /// Follow one redirect hop by hand and return the target URL.
    ///
    /// Only meaningful on a client built with redirects disabled; a client
    /// that follows redirects internally will always yield `Ok(None)`.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn resolve_redirect(&self, url: &str) -> Result<Option<String>, ResolveError> {
        debug!(url = %url, "Resolving short link redirect");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, "short-link"))?;

        if response.status().is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            match target {
                Some(target) => {
                    debug!(target = %target, "Short link redirected");
                    return Ok(Some(target));
                }
                None => {
                    warn!(url = %url, "Redirect status without a Location header");
                    return Ok(None);
                }
            }
        }

        debug!(status = %response.status(), "No redirect returned");
        Ok(None)
    }
}

// for Bilibili
impl Fetcher {
    /// The view APIs reject requests without a browser user agent and a
    /// bilibili.com referer. Redirects stay disabled so b23.tv short links
    /// can be resolved by reading the Location header.
    #[instrument(level = "debug")]
    pub fn new_bilibili_client() -> Self {
        debug!("Creating Bilibili-specific fetcher");

        let mut headers = HeaderMap::new();
        headers.insert("Referer", "https://www.bilibili.com".parse().unwrap());
        headers.insert("Origin", "https://www.bilibili.com".parse().unwrap());
        headers.insert("Accept", "application/json, text/plain, */*".parse().unwrap());

        let client = Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                AppleWebKit/537.36 (KHTML, like Gecko) \
                Chrome/91.0.4472.124 Safari/537.36",
            )
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()
            .expect("Failed to create Bilibili HTTP client");

        debug!("Bilibili-specific fetcher created successfully");
        Self { client }
    }
}

// for Douyin
impl Fetcher {
    /// Only used to expand v.douyin.com short links, so redirects are
    /// disabled here as well.
    #[instrument(level = "debug")]
    pub fn new_douyin_client() -> Self {
        debug!("Creating Douyin-specific fetcher");

        let mut headers = HeaderMap::new();
        headers.insert("Accept-Language", "zh-CN,zh;q=0.9".parse().unwrap());

        let client = Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                AppleWebKit/537.36 (KHTML, like Gecko) \
                Chrome/120.0.0.0 Safari/537.36",
            )
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()
            .expect("Failed to create Douyin HTTP client");

        debug!("Douyin-specific fetcher created successfully");
        Self { client }
    }
}

// for plain JSON APIs (YouTube Data API, oEmbed endpoints, relay servers)
impl Fetcher {
    #[instrument(level = "debug")]
    pub fn new_json_api_client() -> Self {
        debug!("Creating JSON API fetcher");

        let mut headers = HeaderMap::new();
        headers.insert("Accept", "application/json".parse().unwrap());

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .expect("Failed to create JSON API HTTP client");

        Self { client }
    }
}

fn map_reqwest_error(e: reqwest::Error, platform: &str) -> ResolveError {
    if e.is_timeout() {
        ResolveError::TimeoutError(e.to_string())
    } else {
        ResolveError::RemoteApiError {
            platform: platform.to_string(),
            message: e.to_string(),
        }
    }
}

fn status_error(status: StatusCode, platform: &str, url: &str) -> ResolveError {
    match status {
        StatusCode::NOT_FOUND => ResolveError::NotFoundError(format!("{url} returned 404")),
        StatusCode::TOO_MANY_REQUESTS => {
            ResolveError::RateLimitError(format!("{platform} returned 429 for {url}"))
        }
        _ => ResolveError::RemoteApiError {
            platform: platform.to_string(),
            message: format!("HTTP status {status} from {url}"),
        },
    }
}

/// Per-client knobs for callers that need something beyond the built-in
/// platform clients.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new();
///
/// // Using the Bilibili-specific configuration
/// let bilibili_fetcher = Fetcher::new_bilibili_client();
///
/// // Using custom configuration
/// let custom_fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     timeout: Duration::from_secs(20),
///     headers: Some(my_custom_headers),
///     redirect_policy: Some(my_redirect_policy),
/// });
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            redirect_policy: None,
        }
    }
}

//! Public entry point. Owns the resolver registry, the cascade
//! orchestrator, the concurrency gate, and the batch/analysis helpers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};
use url::Url;

use crate::classify::{classify, Platform, PlatformFamily};
use crate::error::ResolveError;
use crate::extract::extract;
use crate::generic::GenericExtractor;
use crate::orchestrator::{ResolutionOrchestrator, ResolveMode, ResolveOptions};
use crate::record::{ContentKind, VideoRecord};
use crate::resolver::ResolverRegistry;
use crate::PlatformResolver;

/// Upper bound on in-flight resolutions across all callers of one service.
pub const MAX_CONCURRENT_REQUESTS: usize = 500;
/// Upper bound on URLs accepted by a single batch call.
pub const MAX_BATCH_URLS: usize = 10;

#[derive(Clone)]
pub struct UnfurlService {
    registry: Arc<ResolverRegistry>,
    orchestrator: Arc<ResolutionOrchestrator>,
    defaults: ResolveOptions,
    semaphore: Arc<Semaphore>,
}

impl Default for UnfurlService {
    fn default() -> Self {
        Self::new()
    }
}

impl UnfurlService {
    pub fn new() -> Self {
        Self::new_with_config(UnfurlServiceConfig::default())
    }

    pub fn new_with_config(config: UnfurlServiceConfig) -> Self {
        debug!("Initializing UnfurlService with custom configuration");

        let mut registry = ResolverRegistry::with_default_resolvers();
        for resolver in config.extra_resolvers {
            registry.register(resolver);
        }
        let registry = Arc::new(registry);

        let orchestrator = Arc::new(ResolutionOrchestrator::new(
            Arc::clone(&registry),
            GenericExtractor::new(config.generic_program),
            config.generic_timeout,
        ));

        let defaults = ResolveOptions {
            mode: config.mode,
            relay_endpoint: config.relay_endpoint,
            youtube_api_key: config.youtube_api_key,
        };

        Self {
            registry,
            orchestrator,
            defaults,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        }
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Resolves one link with the service defaults.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, url: &str) -> Result<VideoRecord, ResolveError> {
        self.resolve_with_options(url, self.defaults.clone()).await
    }

    /// Resolves one link with per-call options overriding the defaults.
    #[instrument(level = "debug", skip(self, opts))]
    pub async fn resolve_with_options(
        &self,
        url: &str,
        opts: ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ResolveError::ConcurrencyLimitError)?;

        Url::parse(url)?;
        let classification =
            classify(url).ok_or_else(|| ResolveError::UnsupportedLink(url.to_string()))?;
        let ident = extract(url, classification.platform)?;

        self.orchestrator.run(url, &ident, &opts).await
    }

    /// Resolves up to [`MAX_BATCH_URLS`] links concurrently. Individual
    /// failures land in their entry instead of failing the batch.
    pub async fn resolve_batch(&self, urls: Vec<&str>) -> Result<BatchOutcome, ResolveError> {
        if urls.len() > MAX_BATCH_URLS {
            return Err(ResolveError::BatchTooLarge {
                given: urls.len(),
                max: MAX_BATCH_URLS,
            });
        }
        if urls.is_empty() {
            return Ok(BatchOutcome {
                total: 0,
                successful: 0,
                failed: 0,
                results: Vec::new(),
            });
        }

        info!(count = urls.len(), "Resolving URL batch");

        let tasks = urls.into_iter().enumerate().map(|(index, url)| {
            let service = self.clone();
            let url = url.to_string();
            async move {
                match service.resolve(&url).await {
                    Ok(record) => BatchEntry {
                        index,
                        url,
                        success: true,
                        data: Some(record),
                        error: None,
                    },
                    Err(e) => BatchEntry {
                        index,
                        url,
                        success: false,
                        data: None,
                        error: Some(e.to_string()),
                    },
                }
            }
        });

        let results = futures::future::join_all(tasks).await;
        let successful = results.iter().filter(|entry| entry.success).count();

        Ok(BatchOutcome {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        })
    }

    /// Inspects a link without touching the network or taking a permit.
    pub fn analyze_url(&self, url: &str) -> UrlAnalysis {
        let Some(classification) = classify(url) else {
            return UrlAnalysis {
                url: url.to_string(),
                platform: None,
                platform_name: None,
                family: None,
                content_type: None,
                video_id: None,
                page: None,
                can_embed: false,
                recommended_stage: "generic_extractor".to_string(),
            };
        };

        let platform = classification.platform;
        let ident = extract(url, platform).ok();
        let recommended_stage = match platform {
            Platform::Bilibili | Platform::Youtube | Platform::Vimeo => "platform_api",
            _ => "relay_proxy",
        };

        UrlAnalysis {
            url: url.to_string(),
            platform: Some(platform.key().to_string()),
            platform_name: Some(platform.display_name().to_string()),
            family: Some(platform.family()),
            content_type: Some(classification.kind),
            video_id: ident.as_ref().map(|i| i.id.clone()),
            page: ident.as_ref().and_then(|i| i.page),
            can_embed: platform.supports_embed(),
            recommended_stage: recommended_stage.to_string(),
        }
    }
}

/// One URL's outcome inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub index: usize,
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<VideoRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

/// Offline description of a link: what it is and which stage would
/// probably resolve it best.
#[derive(Debug, Clone, Serialize)]
pub struct UrlAnalysis {
    pub url: String,
    pub platform: Option<String>,
    pub platform_name: Option<String>,
    pub family: Option<PlatformFamily>,
    pub content_type: Option<ContentKind>,
    pub video_id: Option<String>,
    pub page: Option<u32>,
    pub can_embed: bool,
    pub recommended_stage: String,
}

/// Service configuration.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use video_unfurl::{UnfurlService, UnfurlServiceConfig};
///
/// let config = UnfurlServiceConfig::new()
///     .with_relay_endpoint("http://127.0.0.1:3001")
///     .with_generic_timeout(Duration::from_secs(60));
/// let service = UnfurlService::new_with_config(config);
/// ```
#[derive(Clone)]
pub struct UnfurlServiceConfig {
    pub mode: ResolveMode,
    pub relay_endpoint: Option<String>,
    pub youtube_api_key: Option<String>,
    /// Program name or path of a yt-dlp compatible extractor.
    pub generic_program: String,
    pub generic_timeout: Duration,
    pub max_concurrent_requests: usize,
    /// Extra resolvers to register; one per platform, replacing the
    /// built-in resolver for that platform.
    pub extra_resolvers: Vec<Arc<dyn PlatformResolver>>,
}

impl Default for UnfurlServiceConfig {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Auto,
            relay_endpoint: None,
            youtube_api_key: None,
            generic_program: "yt-dlp".to_string(),
            generic_timeout: Duration::from_secs(30),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            extra_resolvers: Vec::new(),
        }
    }
}

impl UnfurlServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_relay_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.relay_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_youtube_api_key(mut self, key: impl Into<String>) -> Self {
        self.youtube_api_key = Some(key.into());
        self
    }

    pub fn with_generic_program(mut self, program: impl Into<String>) -> Self {
        self.generic_program = program.into();
        self
    }

    pub fn with_generic_timeout(mut self, timeout: Duration) -> Self {
        self.generic_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PlatformResolver>) -> Self {
        self.extra_resolvers.push(resolver);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_reports_a_bilibili_bangumi_link() {
        let service = UnfurlService::new();
        let analysis = service.analyze_url("https://www.bilibili.com/bangumi/play/ep374717");

        assert_eq!(analysis.platform.as_deref(), Some("bilibili"));
        assert_eq!(analysis.content_type, Some(ContentKind::Bangumi));
        assert_eq!(analysis.video_id.as_deref(), Some("ep374717"));
        assert_eq!(analysis.recommended_stage, "platform_api");
        assert!(analysis.can_embed);
    }

    #[test]
    fn analyze_routes_douyin_to_the_relay() {
        let service = UnfurlService::new();
        let analysis = service.analyze_url("https://www.douyin.com/video/7123456789012345678");

        assert_eq!(analysis.platform.as_deref(), Some("douyin"));
        assert_eq!(analysis.family, Some(PlatformFamily::Chinese));
        assert_eq!(analysis.recommended_stage, "relay_proxy");
        assert!(!analysis.can_embed);
    }

    #[test]
    fn analyze_handles_unknown_sites() {
        let service = UnfurlService::new();
        let analysis = service.analyze_url("https://example.com/watch/123");

        assert!(analysis.platform.is_none());
        assert!(analysis.video_id.is_none());
        assert_eq!(analysis.recommended_stage, "generic_extractor");
    }

    #[test]
    fn analyze_picks_up_the_page_selector() {
        let service = UnfurlService::new();
        let analysis = service.analyze_url("https://www.bilibili.com/video/BV1GJ411x7h7?p=3");
        assert_eq!(analysis.page, Some(3));
    }

    #[tokio::test]
    async fn malformed_urls_are_rejected_before_any_network() {
        let service = UnfurlService::new();
        match service.resolve("not a url").await.unwrap_err() {
            ResolveError::UrlParseError(_) => {}
            other => panic!("Expected UrlParseError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_sites_are_rejected() {
        let service = UnfurlService::new();
        match service.resolve("https://example.com/video/1").await.unwrap_err() {
            ResolveError::UnsupportedLink(url) => {
                assert!(url.contains("example.com"));
            }
            other => panic!("Expected UnsupportedLink, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_batches_are_rejected_up_front() {
        let service = UnfurlService::new();
        let urls: Vec<&str> = std::iter::repeat("https://www.bilibili.com/video/BV1GJ411x7h7")
            .take(MAX_BATCH_URLS + 1)
            .collect();

        match service.resolve_batch(urls).await.unwrap_err() {
            ResolveError::BatchTooLarge { given, max } => {
                assert_eq!(given, MAX_BATCH_URLS + 1);
                assert_eq!(max, MAX_BATCH_URLS);
            }
            other => panic!("Expected BatchTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_batches_short_circuit() {
        let service = UnfurlService::new();
        let outcome = service.resolve_batch(Vec::new()).await.unwrap();
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.successful, 0);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.results.is_empty());
    }
}

//! Drives a link through the resolution cascade: platform API first, then
//! the relay proxy, then the generic extractor, and finally a synthetic
//! record that cannot fail. Which stages run is controlled by [`ResolveMode`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::enrich::enrich;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::generic::GenericExtractor;
use crate::record::{VideoFormat, VideoRecord};
use crate::relay::RelayClient;
use crate::resolver::ResolverRegistry;
use crate::utils::today_compact;

/// How far the cascade is allowed to reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Try everything in order until one stage produces a record.
    #[default]
    Auto,
    /// Platform API only. Its failure is the caller's to handle.
    FrontendOnly,
    /// Skip the platform API and go straight to the relay (or the generic
    /// extractor when no relay is configured).
    BackendOnly,
}

impl ResolveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveMode::Auto => "auto",
            ResolveMode::FrontendOnly => "frontend_only",
            ResolveMode::BackendOnly => "backend_only",
        }
    }
}

/// Per-request knobs. The service holds a default set and callers may
/// override them per call.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub mode: ResolveMode,
    /// Base URL of a relay proxy service, e.g. `http://127.0.0.1:3001`.
    pub relay_endpoint: Option<String>,
    /// YouTube Data API v3 key. Without it the YouTube resolver starts at
    /// oEmbed.
    pub youtube_api_key: Option<String>,
}

impl ResolveOptions {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Resolved,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    NotStarted,
    TryingPrimary,
    TryingProxy,
    TryingGeneric,
    TryingFallback,
    Done(StageOutcome),
}

impl ResolveStage {
    pub fn label(&self) -> &'static str {
        match self {
            ResolveStage::NotStarted => "not_started",
            ResolveStage::TryingPrimary => "platform_api",
            ResolveStage::TryingProxy => "relay_proxy",
            ResolveStage::TryingGeneric => "generic_extractor",
            ResolveStage::TryingFallback => "fallback",
            ResolveStage::Done(_) => "done",
        }
    }
}

/// Next stage after a failure at `stage`. Success never advances; the
/// caller returns the record directly. `Done` is terminal.
pub fn advance(stage: ResolveStage, mode: ResolveMode, has_relay: bool) -> ResolveStage {
    match (stage, mode) {
        (ResolveStage::Done(outcome), _) => ResolveStage::Done(outcome),
        (ResolveStage::NotStarted, ResolveMode::BackendOnly) => {
            if has_relay {
                ResolveStage::TryingProxy
            } else {
                ResolveStage::TryingGeneric
            }
        }
        (ResolveStage::NotStarted, _) => ResolveStage::TryingPrimary,
        (ResolveStage::TryingPrimary, ResolveMode::FrontendOnly) => {
            ResolveStage::Done(StageOutcome::Exhausted)
        }
        (ResolveStage::TryingPrimary, _) => {
            if has_relay {
                ResolveStage::TryingProxy
            } else {
                ResolveStage::TryingGeneric
            }
        }
        (ResolveStage::TryingProxy, _) => ResolveStage::TryingGeneric,
        (ResolveStage::TryingGeneric, _) => ResolveStage::TryingFallback,
        (ResolveStage::TryingFallback, _) => ResolveStage::Done(StageOutcome::Exhausted),
    }
}

/// One failed stage, kept for the error trail.
#[derive(Debug, Clone)]
pub struct ResolutionAttempt {
    pub stage: &'static str,
    pub platform: String,
    pub error: String,
}

pub struct ResolutionOrchestrator {
    registry: Arc<ResolverRegistry>,
    generic: GenericExtractor,
    generic_timeout: Duration,
}

impl ResolutionOrchestrator {
    pub fn new(
        registry: Arc<ResolverRegistry>,
        generic: GenericExtractor,
        generic_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            generic,
            generic_timeout,
        }
    }

    /// Walks the cascade until a stage yields a record. Every success path
    /// passes through [`enrich`], so callers always see derived fields.
    #[instrument(
        level = "debug",
        skip(self, ident, opts),
        fields(platform = ident.platform.key(), mode = opts.mode.as_str())
    )]
    pub async fn run(
        &self,
        url: &str,
        ident: &ExtractedId,
        opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let started = Instant::now();
        let has_relay = opts.relay_endpoint.is_some();
        let mut attempts: Vec<ResolutionAttempt> = Vec::new();
        let mut stage = advance(ResolveStage::NotStarted, opts.mode, has_relay);

        loop {
            let outcome = match stage {
                ResolveStage::TryingPrimary => self.try_primary(url, ident, opts).await,
                ResolveStage::TryingProxy => self.try_proxy(url, opts).await,
                ResolveStage::TryingGeneric => self.try_generic(url).await,
                ResolveStage::TryingFallback => {
                    info!(
                        attempts = attempts.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "All resolution stages failed, emitting basic fallback record"
                    );
                    return Ok(enrich(basic_fallback_record(url, ident)));
                }
                ResolveStage::NotStarted | ResolveStage::Done(_) => {
                    return Err(exhausted_error(&attempts, started));
                }
            };

            match outcome {
                Ok(record) => {
                    debug!(
                        stage = stage.label(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Resolution stage succeeded"
                    );
                    return Ok(enrich(record));
                }
                Err(e) => {
                    warn!(stage = stage.label(), error = %e, "Resolution stage failed");
                    attempts.push(ResolutionAttempt {
                        stage: stage.label(),
                        platform: ident.platform.key().to_string(),
                        error: e.to_string(),
                    });
                    stage = advance(stage, opts.mode, has_relay);
                }
            }
        }
    }

    async fn try_primary(
        &self,
        url: &str,
        ident: &ExtractedId,
        opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let resolver = self.registry.for_platform(ident.platform).ok_or_else(|| {
            ResolveError::UnsupportedLink(format!(
                "no resolver registered for {}",
                ident.platform.key()
            ))
        })?;
        resolver.resolve(url, ident, opts).await
    }

    async fn try_proxy(&self, url: &str, opts: &ResolveOptions) -> Result<VideoRecord, ResolveError> {
        // advance() only routes here when an endpoint is configured
        let endpoint = opts
            .relay_endpoint
            .as_deref()
            .ok_or_else(|| ResolveError::RemoteApiError {
                platform: "relay".to_string(),
                message: "no relay endpoint configured".to_string(),
            })?;
        RelayClient::new(endpoint).resolve(url).await
    }

    async fn try_generic(&self, url: &str) -> Result<VideoRecord, ResolveError> {
        match tokio::time::timeout(self.generic_timeout, self.generic.extract(url)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::TimeoutError(format!(
                "generic extractor exceeded {}s",
                self.generic_timeout.as_secs()
            ))),
        }
    }
}

fn exhausted_error(attempts: &[ResolutionAttempt], started: Instant) -> ResolveError {
    let detail = attempts
        .iter()
        .map(|a| format!("{}: {}", a.stage, a.error))
        .collect::<Vec<_>>()
        .join("; ");
    ResolveError::ResolutionExhausted {
        attempts: attempts.len(),
        trail: format!("{}ms elapsed; {}", started.elapsed().as_millis(), detail),
    }
}

/// Terminal stage of the cascade. Purely synthetic, so it always succeeds:
/// the link itself already proved there is a video behind it.
pub fn basic_fallback_record(url: &str, ident: &ExtractedId) -> VideoRecord {
    let platform = ident.platform;
    let mut record = VideoRecord::for_platform(platform, url);
    record.id = ident.id.clone();
    record.content_type = ident.kind;
    record.title = format!("{}视频", platform.display_name());
    record.description = "视频解析失败，但检测到有效的视频链接".to_string();
    record.uploader = format!("{}用户", platform.display_name());
    record.upload_date = today_compact();
    record.thumbnail = platform.placeholder_thumbnail();
    record.formats = vec![VideoFormat {
        format_id: "fallback".to_string(),
        url: url.to_string(),
        ext: "unknown".to_string(),
        quality: 0,
        note: "需要支持的播放器".to_string(),
        ..VideoFormat::default()
    }];
    record.extractor = "fallback_basic".to_string();
    record.mark_fallback("所有高级解析方法均失败");
    record.needs_backend_resolution = false;
    record
}

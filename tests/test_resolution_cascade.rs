use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use video_unfurl::{
    ExtractedId, Platform, PlatformResolver, ResolveError, ResolveMode, ResolveOptions,
    UnfurlService, UnfurlServiceConfig, VideoRecord,
};

/// Stands in for a platform API that is down. Counts how often the
/// cascade knocks on its door.
struct FailingResolver {
    platform: Platform,
    calls: Arc<AtomicUsize>,
}

impl FailingResolver {
    fn new(platform: Platform) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Arc::new(Self {
            platform,
            calls: Arc::clone(&calls),
        });
        (resolver, calls)
    }
}

#[async_trait]
impl PlatformResolver for FailingResolver {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn resolve(
        &self,
        _url: &str,
        _ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ResolveError::RemoteApiError {
            platform: self.platform.key().to_string(),
            message: "simulated outage".to_string(),
        })
    }
}

// Points the generic stage at a binary that does not exist, so the stage
// fails immediately instead of invoking a real extractor.
fn offline_config() -> UnfurlServiceConfig {
    UnfurlServiceConfig::new().with_generic_program("video-unfurl-missing-binary")
}

#[tokio::test]
async fn test_frontend_only_fails_after_one_attempt() {
    let (resolver, calls) = FailingResolver::new(Platform::Bilibili);
    let service = UnfurlService::new_with_config(
        offline_config()
            .with_mode(ResolveMode::FrontendOnly)
            .with_resolver(resolver),
    );

    let result = service
        .resolve("https://www.bilibili.com/video/BV1GJ411x7h7")
        .await;

    assert!(result.is_err());
    match result.unwrap_err() {
        ResolveError::ResolutionExhausted { attempts, trail } => {
            assert_eq!(attempts, 1);
            assert!(trail.contains("platform_api"));
            assert!(trail.contains("simulated outage"));
        }
        _ => panic!("Expected ResolutionExhausted"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auto_mode_lands_on_the_fallback_record() {
    let (resolver, calls) = FailingResolver::new(Platform::Bilibili);
    let service = UnfurlService::new_with_config(offline_config().with_resolver(resolver));

    let record = service
        .resolve("https://www.bilibili.com/video/BV1GJ411x7h7")
        .await
        .unwrap();

    // With no relay configured, Auto walks primary -> generic -> fallback
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(record.is_fallback);
    assert!(!record.needs_backend_resolution);
    assert_eq!(record.extractor, "fallback_basic");
    assert_eq!(record.platform, "bilibili");
    assert_eq!(record.id, "BV1GJ411x7h7");
    assert_eq!(record.title, "B站视频");
    assert_eq!(record.formats.len(), 1);
    assert_eq!(record.formats[0].format_id, "fallback");

    // The fallback path still runs through enrichment
    assert!(record.seo.is_some());
    assert!(record.embed.is_some());
    assert_eq!(record.duration_formatted.as_deref(), Some("0:00"));
}

#[tokio::test]
async fn test_backend_only_never_touches_the_platform_resolver() {
    let (resolver, calls) = FailingResolver::new(Platform::Bilibili);
    let service = UnfurlService::new_with_config(
        offline_config()
            .with_mode(ResolveMode::BackendOnly)
            .with_resolver(resolver),
    );

    let record = service
        .resolve("https://www.bilibili.com/video/BV1GJ411x7h7")
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(record.is_fallback);
    assert_eq!(record.extractor, "fallback_basic");
}

#[tokio::test]
async fn test_douyin_degrades_without_any_network() {
    let service = UnfurlService::new();

    let record = service
        .resolve("https://www.douyin.com/video/7123456789012345678")
        .await
        .unwrap();

    assert_eq!(record.platform, "douyin");
    assert_eq!(record.id, "7123456789012345678");
    assert_eq!(record.extractor, "douyin_fallback");
    assert!(record.is_fallback);
    assert!(record.needs_backend_resolution);
    assert!(record.fallback_reason.is_some());

    // Enrichment filled the derived fields
    assert!(record.duration_formatted.is_some());
    assert!(record.seo.is_some());
    assert!(record.upload_date_formatted.is_some());
}

#[tokio::test]
async fn test_tencent_emits_its_embed_card_offline() {
    let service = UnfurlService::new();

    let record = service
        .resolve("https://v.qq.com/x/cover/mzc00200mp8vo9b/n0041aa087e.html")
        .await
        .unwrap();

    assert_eq!(record.platform, "tencent");
    assert_eq!(record.id, "n0041aa087e");
    assert_eq!(record.extractor, "tencent_fallback");
    assert!(record.is_fallback);
    assert!(record.needs_backend_resolution);

    let embed = record.embed.expect("tencent degraded record carries an iframe");
    assert!(embed.url.contains("n0041aa087e"));
}

#[tokio::test]
async fn test_xigua_and_kuaishou_degrade_gracefully() {
    let service = UnfurlService::new();

    let xigua = service
        .resolve("https://www.ixigua.com/7123456789012345678/")
        .await
        .unwrap();
    assert_eq!(xigua.platform, "xigua");
    assert_eq!(xigua.extractor, "xigua_fallback");
    assert!(xigua.is_fallback);
    assert!(xigua.needs_backend_resolution);

    let kuaishou = service
        .resolve("https://www.kuaishou.com/short-video/3xf8n9qmkwpnvhk")
        .await
        .unwrap();
    assert_eq!(kuaishou.platform, "kuaishou");
    assert_eq!(kuaishou.extractor, "kuaishou_fallback");
    assert!(kuaishou.is_fallback);
    assert!(kuaishou.needs_backend_resolution);
}

#[tokio::test]
async fn test_per_call_options_override_the_service_defaults() {
    let (resolver, calls) = FailingResolver::new(Platform::Bilibili);
    let service = UnfurlService::new_with_config(offline_config().with_resolver(resolver));

    // Defaults are Auto; this call narrows the cascade to the platform API
    let result = service
        .resolve_with_options(
            "https://www.bilibili.com/video/BV1GJ411x7h7",
            ResolveOptions::new().with_mode(ResolveMode::FrontendOnly),
        )
        .await;

    match result.unwrap_err() {
        ResolveError::ResolutionExhausted { attempts, .. } => assert_eq!(attempts, 1),
        _ => panic!("Expected ResolutionExhausted"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

use async_trait::async_trait;

mod classify;
mod enrich;
mod error;
mod extract;
mod fetcher;
mod generic;
mod logging;
mod orchestrator;
mod record;
mod relay;
mod resolver;
mod service;
mod utils;

pub use classify::{classify, Classification, Platform, PlatformFamily};
pub use enrich::{enrich, format_duration, format_file_size, format_upload_date, quality_label};
pub use error::{FailureReport, ResolveError};
pub use extract::{extract, ExtractedId};
pub use fetcher::{Fetcher, FetcherConfig, OEmbedResponse};
pub use generic::GenericExtractor;
pub use logging::{log_error_card, log_record_card, setup_logging, LogConfig, LogLevelGuard};
pub use orchestrator::{
    advance, basic_fallback_record, ResolutionOrchestrator, ResolveMode, ResolveOptions,
    ResolveStage, StageOutcome,
};
pub use record::{
    BilibiliExtra, ContentKind, DouyinExtra, DouyinMusic, EmbedInfo, EmbedKind, Engagement,
    PageDimension, Seo, VideoFormat, VideoPage, VideoRecord,
};
pub use relay::RelayClient;
pub use resolver::{
    BilibiliResolver, DouyinResolver, KuaishouResolver, ResolverRegistry, TencentResolver,
    VimeoResolver, XiguaResolver, YoutubeResolver,
};
pub use service::{
    BatchEntry, BatchOutcome, UnfurlService, UnfurlServiceConfig, UrlAnalysis, MAX_BATCH_URLS,
    MAX_CONCURRENT_REQUESTS,
};

/// One platform's direct resolution strategy. Implementations talk to the
/// platform's own API (or synthesize a degraded record when the platform
/// blocks server-side callers) and never reach for the relay or the
/// generic extractor.
#[async_trait]
pub trait PlatformResolver: Send + Sync {
    fn platform(&self) -> Platform;

    fn can_handle(&self, url: &str) -> bool {
        classify::classify(url).map(|c| c.platform) == Some(self.platform())
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError>;
}

pub fn is_short_link(url: &str) -> bool {
    url.contains("b23.tv") || url.contains("v.douyin.com")
}

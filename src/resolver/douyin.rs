//! Douyin resolver. The platform blocks anonymous API access, so the direct
//! stage only normalizes the link (expanding v.douyin.com short codes) and
//! returns a degraded record; full metadata comes through a relay server.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::{extract, ExtractedId};
use crate::fetcher::Fetcher;
use crate::orchestrator::ResolveOptions;
use crate::record::{VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

pub struct DouyinResolver {
    fetcher: Fetcher,
}

impl Default for DouyinResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DouyinResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_douyin_client(),
        }
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Best effort: a dead short link still yields a degraded record keyed
    /// by the short code itself.
    async fn expand_short_link(&self, url: &str, code: &str) -> String {
        match self.fetcher.resolve_redirect(url).await {
            Ok(Some(target)) => match extract(&target, Platform::Douyin) {
                Ok(expanded) if !expanded.needs_redirect => {
                    debug!(id = %expanded.id, "Expanded v.douyin.com short link");
                    expanded.id
                }
                _ => {
                    warn!(target = %target, "Short link target has no recognizable id");
                    code.to_string()
                }
            },
            Ok(None) => {
                warn!(url = %url, "Short link did not redirect");
                code.to_string()
            }
            Err(e) => {
                warn!(error = %e, url = %url, "Short link expansion failed");
                code.to_string()
            }
        }
    }
}

#[async_trait]
impl PlatformResolver for DouyinResolver {
    fn platform(&self) -> Platform {
        Platform::Douyin
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let video_id = if ident.needs_redirect {
            self.expand_short_link(url, &ident.id).await
        } else {
            ident.id.clone()
        };
        Ok(degraded_record(url, video_id))
    }
}

fn degraded_record(url: &str, video_id: String) -> VideoRecord {
    let mut record = VideoRecord::for_platform(Platform::Douyin, url);
    record.id = video_id;
    record.title = "抖音视频（需要后端解析获取完整信息）".to_string();
    record.description = "由于抖音的反爬虫机制，建议使用后端解析获取完整视频信息".to_string();
    record.thumbnail = Platform::Douyin.placeholder_thumbnail();
    record.uploader = "抖音用户".to_string();
    record.uploader_id = "unknown".to_string();
    record.upload_date = today_compact();
    record.formats = vec![VideoFormat {
        format_id: "douyin_fallback".to_string(),
        url: url.to_string(),
        ext: "mp4".to_string(),
        quality: 720,
        width: Some(720),
        height: Some(1280),
        vcodec: Some("h264".to_string()),
        acodec: Some("aac".to_string()),
        note: "需要后端解析获取真实播放地址".to_string(),
        ..VideoFormat::default()
    }];
    record.extractor = "douyin_fallback".to_string();
    record.needs_backend_resolution = true;
    record.mark_fallback("抖音平台限制，直连解析无法获取完整信息");
    record
}

//! Xigua resolver. Anti-crawler measures rule out direct metadata access,
//! so the direct stage returns a degraded record for the relay to improve
//! on.

use async_trait::async_trait;

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::orchestrator::ResolveOptions;
use crate::record::{VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

#[derive(Default)]
pub struct XiguaResolver;

impl XiguaResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformResolver for XiguaResolver {
    fn platform(&self) -> Platform {
        Platform::Xigua
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let mut record = VideoRecord::for_platform(Platform::Xigua, url);
        record.id = ident.id.clone();
        record.title = "西瓜视频（需要后端解析获取完整信息）".to_string();
        record.description = "由于西瓜视频的反爬虫机制，建议使用后端解析获取完整视频信息".to_string();
        record.thumbnail = Platform::Xigua.placeholder_thumbnail();
        record.uploader = "西瓜视频用户".to_string();
        record.uploader_id = "unknown".to_string();
        record.upload_date = today_compact();
        record.formats = vec![VideoFormat {
            format_id: "xigua_fallback".to_string(),
            url: url.to_string(),
            ext: "mp4".to_string(),
            quality: 720,
            width: Some(1280),
            height: Some(720),
            vcodec: Some("h264".to_string()),
            acodec: Some("aac".to_string()),
            note: "需要西瓜视频播放器或后端解析".to_string(),
            ..VideoFormat::default()
        }];
        record.extractor = "xigua_fallback".to_string();
        record.needs_backend_resolution = true;
        record.mark_fallback("西瓜视频反爬虫限制，直连无法获取详细信息");
        Ok(record)
    }
}

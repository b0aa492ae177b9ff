//! Kuaishou resolver. Same situation as Xigua: no anonymous API, degraded
//! record only, portrait-first like Douyin.

use async_trait::async_trait;

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::orchestrator::ResolveOptions;
use crate::record::{VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

#[derive(Default)]
pub struct KuaishouResolver;

impl KuaishouResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformResolver for KuaishouResolver {
    fn platform(&self) -> Platform {
        Platform::Kuaishou
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let mut record = VideoRecord::for_platform(Platform::Kuaishou, url);
        record.id = ident.id.clone();
        record.title = "快手视频（需要后端解析获取完整信息）".to_string();
        record.description = "由于快手的反爬虫机制，建议使用后端解析获取完整视频信息".to_string();
        record.thumbnail = Platform::Kuaishou.placeholder_thumbnail();
        record.uploader = "快手用户".to_string();
        record.uploader_id = "unknown".to_string();
        record.upload_date = today_compact();
        record.formats = vec![VideoFormat {
            format_id: "kuaishou_fallback".to_string(),
            url: url.to_string(),
            ext: "mp4".to_string(),
            quality: 720,
            width: Some(720),
            height: Some(1280),
            vcodec: Some("h264".to_string()),
            acodec: Some("aac".to_string()),
            note: "需要快手播放器或后端解析".to_string(),
            ..VideoFormat::default()
        }];
        record.extractor = "kuaishou_fallback".to_string();
        record.needs_backend_resolution = true;
        record.mark_fallback("快手反爬虫限制，直连无法获取详细信息");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[tokio::test]
    async fn resolves_offline_to_a_portrait_degraded_record() {
        let resolver = KuaishouResolver::new();
        let url = "https://www.kuaishou.com/short-video/3xf8vnm2k7gq9ce";
        let ident = extract(url, Platform::Kuaishou).unwrap();

        let record = resolver
            .resolve(url, &ident, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(record.id, "3xf8vnm2k7gq9ce");
        assert!(record.thumbnail.contains("720x1280"));
        assert!(record.is_fallback);
        assert!(record.needs_backend_resolution);
        assert_eq!(record.formats[0].width, Some(720));
    }
}

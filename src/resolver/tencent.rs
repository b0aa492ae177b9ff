//! Tencent Video resolver. The platform exposes no open metadata API, but
//! its iframe player and cover artwork are addressable from the vid alone,
//! so the degraded record still embeds and shows a real thumbnail.

use async_trait::async_trait;

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::orchestrator::ResolveOptions;
use crate::record::{EmbedInfo, VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

#[derive(Default)]
pub struct TencentResolver;

impl TencentResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformResolver for TencentResolver {
    fn platform(&self) -> Platform {
        Platform::Tencent
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let mut record = VideoRecord::for_platform(Platform::Tencent, url);
        record.id = ident.id.clone();
        record.title = "腾讯视频（需要完整解析请使用后端）".to_string();
        record.description = "由于腾讯视频的访问限制，建议使用后端解析获取完整视频信息".to_string();
        record.thumbnail = format!(
            "https://puui.qpic.cn/qqvideo_ori/0/{}_496_280/0",
            ident.id
        );
        record.uploader = "腾讯视频".to_string();
        record.uploader_id = "tencent".to_string();
        record.upload_date = today_compact();
        record.embed = Some(EmbedInfo::iframe(
            format!(
                "https://v.qq.com/txp/iframe/player.html?vid={}&autoplay=0",
                ident.id
            ),
            1280,
            720,
        ));
        record.formats = vec![VideoFormat {
            format_id: "tencent_embed".to_string(),
            url: url.to_string(),
            ext: "mp4".to_string(),
            quality: 720,
            width: Some(1280),
            height: Some(720),
            vcodec: Some("h264".to_string()),
            acodec: Some("aac".to_string()),
            note: "需要腾讯视频播放器".to_string(),
            ..VideoFormat::default()
        }];
        record.extractor = "tencent_fallback".to_string();
        record.needs_backend_resolution = true;
        record.mark_fallback("腾讯视频接口限制，直连无法获取详细信息");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[tokio::test]
    async fn resolves_offline_with_embed_and_cover() {
        let resolver = TencentResolver::new();
        let url = "https://v.qq.com/x/cover/mzc00200vkqr54v/n4100a3yqog.html";
        let ident = extract(url, Platform::Tencent).unwrap();

        let record = resolver
            .resolve(url, &ident, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(record.id, "n4100a3yqog");
        assert!(record.thumbnail.contains("puui.qpic.cn"));
        let embed = record.embed.unwrap();
        assert!(embed.url.contains("vid=n4100a3yqog"));
        assert!(record.is_fallback);
        assert!(record.needs_backend_resolution);
    }
}

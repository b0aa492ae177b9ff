//! Vimeo resolver. The keyless oEmbed endpoint carries full metadata
//! including duration; when it is unreachable a basic embed record is
//! returned instead.

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::fetcher::Fetcher;
use crate::orchestrator::ResolveOptions;
use crate::record::{EmbedInfo, VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

const OEMBED_API: &str = "https://vimeo.com/api/oembed.json";

pub struct VimeoResolver {
    fetcher: Fetcher,
}

impl Default for VimeoResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VimeoResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_json_api_client(),
        }
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn resolve_with_oembed(&self, url: &str, id: &str) -> Result<VideoRecord, ResolveError> {
        let oembed_url = format!("{OEMBED_API}?url=https://vimeo.com/{id}");
        let oembed = self.fetcher.fetch_oembed(&oembed_url, "vimeo").await?;

        let width = if oembed.width > 0 { oembed.width } else { 1280 };
        let height = if oembed.height > 0 { oembed.height } else { 720 };

        let mut record = VideoRecord::for_platform(Platform::Vimeo, url);
        record.id = id.to_string();
        record.title = oembed.title;
        record.description = oembed.description;
        record.thumbnail = oembed.thumbnail_url;
        record.duration = oembed.duration;
        record.uploader = oembed.author_name;
        record.uploader_id = oembed.author_url;
        record.embed = Some(EmbedInfo::iframe(player_url(id), width, height));
        record.formats = vec![VideoFormat {
            format_id: "vimeo_embed".to_string(),
            url: url.to_string(),
            ext: "mp4".to_string(),
            quality: height.min(1080) as i64,
            width: Some(width),
            height: Some(height),
            vcodec: Some("h264".to_string()),
            acodec: Some("aac".to_string()),
            note: "通过Vimeo嵌入播放器".to_string(),
            ..VideoFormat::default()
        }];
        record.extractor = "vimeo_oembed".to_string();
        Ok(record)
    }

    fn basic_embed_record(&self, url: &str, id: &str) -> VideoRecord {
        let mut record = VideoRecord::for_platform(Platform::Vimeo, url);
        record.id = id.to_string();
        record.title = "Vimeo视频（基础嵌入）".to_string();
        record.description = "无法获取详细信息，仅提供嵌入播放".to_string();
        record.thumbnail = Platform::Vimeo.placeholder_thumbnail();
        record.uploader = "未知".to_string();
        record.upload_date = today_compact();
        record.embed = Some(EmbedInfo::iframe(player_url(id), 1280, 720));
        record.extractor = "vimeo_basic".to_string();
        record.mark_fallback("无法访问Vimeo API，仅提供基础嵌入信息");
        record
    }
}

#[async_trait]
impl PlatformResolver for VimeoResolver {
    fn platform(&self) -> Platform {
        Platform::Vimeo
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        match self.resolve_with_oembed(url, &ident.id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(error = %e, "Vimeo oEmbed failed, returning a basic embed record");
                Ok(self.basic_embed_record(url, &ident.id))
            }
        }
    }
}

fn player_url(id: &str) -> String {
    format!("https://player.vimeo.com/video/{id}?autoplay=0&controls=1")
}

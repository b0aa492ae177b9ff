//! YouTube resolver. Three tiers: the Data API v3 when a key is configured,
//! the keyless oEmbed endpoint, and a basic embed record that always works.
//! Each tier falls through to the next on failure, so this resolver never
//! fails outright.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::ExtractedId;
use crate::fetcher::Fetcher;
use crate::orchestrator::ResolveOptions;
use crate::record::{EmbedInfo, VideoFormat, VideoRecord};
use crate::utils::today_compact;
use crate::PlatformResolver;

const DATA_API: &str = "https://www.googleapis.com/youtube/v3/videos";
const OEMBED_API: &str = "https://www.youtube.com/oembed";

static RE_ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("invalid duration pattern")
});

pub struct YoutubeResolver {
    fetcher: Fetcher,
}

#[derive(Debug, Deserialize)]
struct DataApiResponse {
    #[serde(default)]
    items: Vec<DataApiItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataApiItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumb>,
    high: Option<Thumb>,
    medium: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    url: String,
}

/// The Data API serializes every counter as a string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    view_count: String,
    #[serde(default)]
    like_count: String,
    #[serde(default)]
    comment_count: String,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

impl Default for YoutubeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_json_api_client(),
        }
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    #[instrument(level = "debug", skip(self, api_key), err)]
    async fn resolve_with_data_api(
        &self,
        url: &str,
        id: &str,
        api_key: &str,
    ) -> Result<VideoRecord, ResolveError> {
        let query = format!(
            "{DATA_API}?id={id}&part=snippet,statistics,contentDetails&key={api_key}"
        );
        let response: DataApiResponse = self.fetcher.fetch_json(&query, "youtube").await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFoundError("视频不存在或不可访问".to_string()))?;

        let mut record = VideoRecord::for_platform(Platform::Youtube, url);
        record.id = item.id.clone();
        record.title = item.snippet.title;
        record.description = item.snippet.description;
        record.thumbnail = pick_thumbnail(item.snippet.thumbnails, &item.id);
        record.duration = parse_iso8601_duration(&item.content_details.duration);
        record.uploader = item.snippet.channel_title;
        record.uploader_id = item.snippet.channel_id;
        record.upload_date = iso_date_to_compact(&item.snippet.published_at);
        record.view_count = item.statistics.view_count.parse().unwrap_or(0);
        record.like_count = item.statistics.like_count.parse().unwrap_or(0);
        record.comment_count = item.statistics.comment_count.parse().unwrap_or(0);
        record.tags = item.snippet.tags;
        record.embed = Some(standard_embed(&item.id));
        record.formats = vec![embed_player_format(url)];
        record.extractor = "youtube_data_api".to_string();
        Ok(record)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn resolve_with_oembed(&self, url: &str, id: &str) -> Result<VideoRecord, ResolveError> {
        let oembed_url = format!(
            "{OEMBED_API}?url=https://www.youtube.com/watch?v={id}&format=json"
        );
        let oembed = self.fetcher.fetch_oembed(&oembed_url, "youtube").await?;

        let mut record = VideoRecord::for_platform(Platform::Youtube, url);
        record.id = id.to_string();
        record.title = oembed.title;
        record.description = "通过YouTube oEmbed API获取".to_string();
        record.thumbnail = oembed.thumbnail_url;
        record.uploader = oembed.author_name;
        record.uploader_id = oembed.author_url;
        record.embed = Some(standard_embed(id));
        record.formats = vec![embed_player_format(url)];
        record.extractor = "youtube_oembed".to_string();
        Ok(record)
    }

    fn basic_embed_record(&self, url: &str, id: &str) -> VideoRecord {
        let mut record = VideoRecord::for_platform(Platform::Youtube, url);
        record.id = id.to_string();
        record.title = "YouTube视频（基础嵌入）".to_string();
        record.description = "无法获取详细信息，仅提供嵌入播放".to_string();
        record.thumbnail = format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg");
        record.uploader = "未知".to_string();
        record.upload_date = today_compact();
        record.embed = Some(standard_embed(id));
        record.formats = vec![embed_player_format(url)];
        record.extractor = "youtube_basic".to_string();
        record.mark_fallback("无法访问YouTube API，仅提供基础嵌入信息");
        record
    }
}

#[async_trait]
impl PlatformResolver for YoutubeResolver {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        if let Some(api_key) = opts.youtube_api_key.as_deref() {
            match self.resolve_with_data_api(url, &ident.id, api_key).await {
                Ok(record) => return Ok(record),
                Err(e) => warn!(error = %e, "YouTube Data API failed, trying oEmbed"),
            }
        }
        match self.resolve_with_oembed(url, &ident.id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(error = %e, "YouTube oEmbed failed, returning a basic embed record");
                Ok(self.basic_embed_record(url, &ident.id))
            }
        }
    }
}

fn standard_embed(id: &str) -> EmbedInfo {
    EmbedInfo::iframe(
        format!("https://www.youtube.com/embed/{id}?autoplay=0&controls=1"),
        1280,
        720,
    )
}

fn embed_player_format(url: &str) -> VideoFormat {
    VideoFormat {
        format_id: "youtube_embed".to_string(),
        url: url.to_string(),
        ext: "mp4".to_string(),
        quality: 720,
        width: Some(1280),
        height: Some(720),
        fps: Some(30.0),
        vcodec: Some("h264".to_string()),
        acodec: Some("aac".to_string()),
        note: "通过YouTube嵌入播放器".to_string(),
        ..VideoFormat::default()
    }
}

fn pick_thumbnail(thumbnails: Thumbnails, id: &str) -> String {
    thumbnails
        .maxres
        .or(thumbnails.high)
        .or(thumbnails.medium)
        .map(|t| t.url)
        .unwrap_or_else(|| format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"))
}

/// `PT#H#M#S` to whole seconds, 0 when the shape is unrecognized.
fn parse_iso8601_duration(raw: &str) -> u64 {
    let Some(caps) = RE_ISO8601_DURATION.captures(raw) else {
        return 0;
    };
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    part(1) * 3600 + part(2) * 60 + part(3)
}

fn iso_date_to_compact(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|date| date.format("%Y%m%d").to_string())
        .unwrap_or_default()
}

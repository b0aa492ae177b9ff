use serde::{Deserialize, Serialize};

use crate::classify::Platform;

/// Content category a record describes. Everything except Bilibili is plain
/// `Video`; Bilibili links additionally split into bangumi episodes, live
/// rooms and media collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Video,
    Bangumi,
    Live,
    Medialist,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Bangumi => "bangumi",
            ContentKind::Live => "live",
            ContentKind::Medialist => "medialist",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    #[default]
    Iframe,
    Link,
}

/// Embeddable player reference. The discriminant serializes as `"type"` to
/// stay byte-compatible with the relay payload shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedInfo {
    #[serde(rename = "type")]
    pub kind: EmbedKind,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl EmbedInfo {
    pub fn iframe(url: String, width: u32, height: u32) -> Self {
        Self {
            kind: EmbedKind::Iframe,
            url,
            width,
            height,
        }
    }
}

/// One playable format descriptor. `quality_label`, `file_size_formatted`,
/// `is_video`/`is_audio` and `resolution` are derived during enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormat {
    pub format_id: String,
    pub url: String,
    pub ext: String,
    pub quality: i64,
    pub quality_label: Option<String>,
    pub filesize: Option<u64>,
    pub file_size_formatted: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    #[serde(alias = "format_note")]
    pub note: String,
    pub is_video: bool,
    pub is_audio: bool,
    pub resolution: Option<String>,
}

/// Aggregate interaction stats derived from the raw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engagement {
    pub total_interactions: u64,
    /// like/view ratio as a percentage, rounded to two decimals; 0 when the
    /// view count is unknown.
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seo {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// Multi-part ("分P") entry of a Bilibili video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPage {
    pub cid: u64,
    pub page: u32,
    pub part: String,
    pub duration: u64,
    pub dimension: Option<PageDimension>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDimension {
    pub width: u32,
    pub height: u32,
    pub rotate: u8,
}

/// Bilibili-only counters and structure, kept off the common record so other
/// platforms never carry empty placeholders for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliExtra {
    pub aid: u64,
    pub coin_count: u64,
    pub favorite_count: u64,
    pub danmaku_count: u64,
    pub pages: Vec<VideoPage>,
    pub tid: Option<u32>,
    pub tname: Option<String>,
    pub copyright: String,
    /// Number of videos in a medialist; absent on single-video records.
    pub media_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DouyinMusic {
    pub title: String,
    pub author: String,
    pub duration: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DouyinExtra {
    pub music: Option<DouyinMusic>,
    pub hashtags: Vec<String>,
}

/// The canonical resolution output.
///
/// Invariants: `id` and `platform` are non-empty on every record a resolver
/// returns; counts and `duration` default to 0 instead of being absent;
/// `formats` may be empty but is never null; `is_fallback == true` implies a
/// non-empty `fallback_reason`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoRecord {
    pub id: String,
    pub content_type: ContentKind,
    /// Machine key, e.g. `bilibili`.
    pub platform: String,
    /// Display name, e.g. `B站`.
    pub platform_name: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    /// Whole seconds.
    pub duration: u64,
    pub uploader: String,
    pub uploader_id: String,
    pub uploader_avatar: String,
    /// 8-digit `YYYYMMDD`, or empty when the platform gave nothing.
    pub upload_date: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub webpage_url: String,
    pub embed: Option<EmbedInfo>,
    pub formats: Vec<VideoFormat>,
    pub tags: Vec<String>,
    /// Which resolver produced this record.
    pub extractor: String,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(alias = "needs_backend_parsing", alias = "needsBackendParsing")]
    pub needs_backend_resolution: bool,

    // Derived by the enricher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<Seo>,

    // Platform extras, omitted entirely for the platforms they don't apply to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bilibili: Option<BilibiliExtra>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub douyin: Option<DouyinExtra>,
}

impl VideoRecord {
    /// Blank record pre-filled with the platform pair and the source URL.
    pub fn for_platform(platform: Platform, url: &str) -> Self {
        Self {
            platform: platform.key().to_string(),
            platform_name: platform.display_name().to_string(),
            webpage_url: url.to_string(),
            ..Self::default()
        }
    }

    /// Flags the record as degraded with an explanation.
    pub fn mark_fallback(&mut self, reason: impl Into<String>) {
        self.is_fallback = true;
        self.fallback_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_discriminant_serializes_as_type() {
        let embed = EmbedInfo::iframe("https://player.example/v/1".into(), 1280, 720);
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["type"], "iframe");
        assert_eq!(json["width"], 1280);
    }

    #[test]
    fn extras_are_omitted_when_absent() {
        let record = VideoRecord {
            id: "BV1xx411c7mD".into(),
            platform: "bilibili".into(),
            ..VideoRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("bilibili").is_none());
        assert!(json.get("douyin").is_none());
        assert!(json.get("fallback_reason").is_none());
    }

    #[test]
    fn relay_shape_round_trips() {
        let blob = serde_json::json!({
            "id": "7254810521205452343",
            "platform": "douyin",
            "platform_name": "抖音",
            "title": "测试视频",
            "view_count": 1024,
            "is_fallback": true,
            "fallback_reason": "测试",
            "needs_backend_parsing": true,
            "formats": [{"format_id": "douyin_web", "url": "https://example.com", "ext": "mp4"}]
        });
        let record: VideoRecord = serde_json::from_value(blob).unwrap();
        assert_eq!(record.view_count, 1024);
        assert!(record.needs_backend_resolution);
        assert_eq!(record.formats.len(), 1);
        assert_eq!(record.content_type, ContentKind::Video);
    }
}

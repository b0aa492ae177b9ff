//! Final pipeline stage: derive display and aggregate fields on a resolved
//! record. Every function here is pure and the whole pass is idempotent, so
//! records can safely be re-enriched after a round trip through storage or a
//! relay.

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::Platform;
use crate::record::{ContentKind, EmbedInfo, Engagement, Seo, VideoFormat, VideoRecord};
use crate::utils::clip_str;

const MAX_FORMATS: usize = 10;
const MAX_KEYWORDS: usize = 10;
const SEO_TITLE_WIDTH: usize = 60;
const SEO_DESCRIPTION_WIDTH: usize = 160;

static RE_WORD_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,，。！？\-_]+").expect("invalid word split pattern"));

/// Derives `duration_formatted`, `upload_date_formatted`, engagement stats,
/// per-format display fields, a synthesized embed where possible, and the SEO
/// block. Base fields are never modified.
pub fn enrich(mut record: VideoRecord) -> VideoRecord {
    record.duration_formatted = Some(format_duration(record.duration));
    if let Some(formatted) = format_upload_date(&record.upload_date) {
        record.upload_date_formatted = Some(formatted);
    }

    record.engagement = Some(Engagement {
        total_interactions: record.like_count + record.comment_count + record.share_count,
        engagement_rate: engagement_rate(record.like_count, record.view_count),
    });

    record.formats = enrich_formats(std::mem::take(&mut record.formats));

    if record.embed.is_none()
        && record.content_type == ContentKind::Video
        && !record.id.is_empty()
    {
        if let Some(url) = Platform::from_key(&record.platform)
            .and_then(|platform| platform.embed_template(&record.id))
        {
            record.embed = Some(EmbedInfo::iframe(url, 1280, 720));
        }
    }

    record.seo = Some(build_seo(&record));
    record
}

/// `H:MM:SS` above one hour, `M:SS` below, `0:00` for unknown durations.
/// The leading unit is not zero-padded.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0:00".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// `YYYY-MM-DD` from an 8-digit compact date or a unix timestamp string.
pub fn format_upload_date(raw: &str) -> Option<String> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return Some(format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8]));
    }
    let ts: i64 = raw.parse().ok()?;
    let date = chrono::DateTime::from_timestamp(ts, 0)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Human-readable byte count with one decimal, from B up to TB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Short display label for a format, preferring the pixel height.
pub fn quality_label(format: &VideoFormat) -> String {
    match format.height {
        Some(h) if h >= 2160 => "4K".to_string(),
        Some(h) if h >= 1440 => "2K".to_string(),
        Some(h) if h >= 1080 => "1080p".to_string(),
        Some(h) if h >= 720 => "720p".to_string(),
        Some(h) if h >= 480 => "480p".to_string(),
        Some(h) if h >= 360 => "360p".to_string(),
        Some(h) if h >= 240 => "240p".to_string(),
        Some(h) => format!("{h}p"),
        None if format.quality > 0 => format!("质量 {}", format.quality),
        None => "未知质量".to_string(),
    }
}

fn engagement_rate(likes: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    let rate = likes as f64 / views as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

fn enrich_formats(formats: Vec<VideoFormat>) -> Vec<VideoFormat> {
    let mut kept: Vec<VideoFormat> = formats
        .into_iter()
        .filter(|f| {
            !f.url.is_empty()
                && (f.vcodec.as_deref() != Some("none") || f.acodec.as_deref() != Some("none"))
        })
        .map(|mut f| {
            f.quality_label = Some(quality_label(&f));
            f.file_size_formatted = f.filesize.filter(|&n| n > 0).map(format_file_size);
            f.is_video = f.vcodec.as_deref().is_some_and(|v| v != "none");
            f.is_audio = f.acodec.as_deref().is_some_and(|a| a != "none");
            f.resolution = match (f.width, f.height) {
                (Some(w), Some(h)) => Some(format!("{w}x{h}")),
                _ => None,
            };
            f
        })
        .collect();

    kept.sort_by(|a, b| {
        b.height
            .unwrap_or(0)
            .cmp(&a.height.unwrap_or(0))
            .then_with(|| b.quality.cmp(&a.quality))
            .then_with(|| b.filesize.unwrap_or(0).cmp(&a.filesize.unwrap_or(0)))
    });
    kept.truncate(MAX_FORMATS);
    kept
}

fn build_seo(record: &VideoRecord) -> Seo {
    Seo {
        title: clip_str(&record.title, SEO_TITLE_WIDTH),
        description: clip_str(&record.description, SEO_DESCRIPTION_WIDTH),
        keywords: extract_keywords(record),
    }
}

fn extract_keywords(record: &VideoRecord) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !keywords.contains(&candidate) {
            keywords.push(candidate);
        }
    };

    for word in RE_WORD_SPLIT
        .split(&record.title)
        .filter(|w| w.chars().count() > 1)
        .take(5)
    {
        push(word.to_lowercase());
    }
    for tag in record.tags.iter().take(5) {
        push(tag.to_lowercase());
    }
    push(record.platform.to_lowercase());
    push(record.uploader.to_lowercase());

    keywords.truncate(MAX_KEYWORDS);
    keywords
}

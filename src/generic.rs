//! Last real resolution stage: shell out to a yt-dlp compatible extractor
//! and map its JSON dump onto a record. Handles the long tail of sites and
//! link shapes the platform resolvers and the relay cannot.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::classify::classify;
use crate::error::ResolveError;
use crate::record::{VideoFormat, VideoRecord};

const DEFAULT_PROGRAM: &str = "yt-dlp";

pub struct GenericExtractor {
    program: String,
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl GenericExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn extract(&self, url: &str) -> Result<VideoRecord, ResolveError> {
        debug!(program = %self.program, "Spawning generic extractor");

        let output = tokio::process::Command::new(&self.program)
            .arg("--dump-single-json")
            .arg("--no-warnings")
            .arg("--skip-download")
            .arg("--no-check-certificate")
            .arg("--prefer-free-formats")
            .arg(url)
            .output()
            .await
            .map_err(|e| ResolveError::RemoteApiError {
                platform: "generic".to_string(),
                message: format!("failed to launch {}: {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let blob: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            ResolveError::RemoteApiError {
                platform: "generic".to_string(),
                message: format!("extractor produced invalid JSON: {e}"),
            }
        })?;
        Ok(record_from_blob(&blob, url))
    }
}

fn classify_failure(stderr: &str) -> ResolveError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("extractor failed without output")
        .trim()
        .to_string();
    let lower = message.to_lowercase();

    if lower.contains("429") || lower.contains("too many requests") {
        ResolveError::RateLimitError(message)
    } else if lower.contains("404")
        || lower.contains("not found")
        || lower.contains("video unavailable")
    {
        ResolveError::NotFoundError(message)
    } else {
        ResolveError::RemoteApiError {
            platform: "generic".to_string(),
            message,
        }
    }
}

/// Field-picking against the yt-dlp JSON dump. Everything is optional over
/// there, and `duration` may arrive as a float.
fn record_from_blob(v: &Value, url: &str) -> VideoRecord {
    let mut record = match classify(url) {
        Some(c) => VideoRecord::for_platform(c.platform, url),
        None => VideoRecord {
            platform: "unknown".to_string(),
            platform_name: "未知平台".to_string(),
            webpage_url: url.to_string(),
            ..VideoRecord::default()
        },
    };

    record.id = v["id"].as_str().unwrap_or("unknown").to_string();
    record.title = v["title"].as_str().unwrap_or("未知标题").to_string();
    record.description = v["description"].as_str().unwrap_or("").to_string();
    record.thumbnail = v["thumbnail"].as_str().unwrap_or("").to_string();
    record.duration = v["duration"].as_f64().unwrap_or(0.0).max(0.0) as u64;
    record.uploader = v["uploader"].as_str().unwrap_or("").to_string();
    record.uploader_id = v["uploader_id"].as_str().unwrap_or("").to_string();
    record.upload_date = v["upload_date"].as_str().unwrap_or("").to_string();
    record.view_count = v["view_count"].as_u64().unwrap_or(0);
    record.like_count = v["like_count"].as_u64().unwrap_or(0);
    record.comment_count = v["comment_count"].as_u64().unwrap_or(0);
    if let Some(webpage) = v["webpage_url"].as_str() {
        record.webpage_url = webpage.to_string();
    }
    record.tags = v["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    record.formats = v["formats"]
        .as_array()
        .map(|formats| formats.iter().map(format_from_blob).collect())
        .unwrap_or_default();
    record.extractor = v["extractor"].as_str().unwrap_or("generic").to_string();
    record
}

fn format_from_blob(v: &Value) -> VideoFormat {
    VideoFormat {
        format_id: v["format_id"].as_str().unwrap_or("").to_string(),
        url: v["url"].as_str().unwrap_or("").to_string(),
        ext: v["ext"].as_str().unwrap_or("").to_string(),
        quality: v["quality"]
            .as_i64()
            .or_else(|| v["quality"].as_f64().map(|q| q as i64))
            .unwrap_or(0),
        filesize: v["filesize"]
            .as_u64()
            .or_else(|| v["filesize_approx"].as_u64()),
        width: v["width"].as_u64().map(|w| w as u32),
        height: v["height"].as_u64().map(|h| h as u32),
        fps: v["fps"].as_f64(),
        vcodec: v["vcodec"].as_str().map(String::from),
        acodec: v["acodec"].as_str().map(String::from),
        note: v["format_note"].as_str().unwrap_or("").to_string(),
        ..VideoFormat::default()
    }
}

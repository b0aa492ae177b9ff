//! Client for a resolution relay server. The relay runs server-side
//! extractors the direct stage cannot (Douyin, Tencent, Xigua, Kuaishou) and
//! answers on `POST /api/video/parse` with `{success, data, message}`.

use serde_json::json;
use tracing::{debug, instrument};

use crate::classify::{classify, Platform};
use crate::error::ResolveError;
use crate::extract::extract;
use crate::fetcher::Fetcher;
use crate::record::VideoRecord;

pub struct RelayClient {
    fetcher: Fetcher,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            fetcher: Fetcher::new_json_api_client(),
            base_url: base_url.into(),
        }
    }

    pub fn with_fetcher(base_url: impl Into<String>, fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn resolve(&self, url: &str) -> Result<VideoRecord, ResolveError> {
        let endpoint = parse_endpoint(&self.base_url);
        let body = json!({ "url": url });
        let v = self.fetcher.post_json_value(&endpoint, &body, "relay").await?;

        if v["success"].as_bool() != Some(true) {
            let message = v["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .unwrap_or("代理解析失败")
                .to_string();
            return Err(ResolveError::RemoteApiError {
                platform: "relay".to_string(),
                message,
            });
        }

        let mut record: VideoRecord =
            serde_json::from_value(v["data"].clone()).map_err(|e| {
                ResolveError::RemoteApiError {
                    platform: "relay".to_string(),
                    message: format!("invalid payload: {e}"),
                }
            })?;
        normalize(&mut record, url);
        debug!(platform = %record.platform, id = %record.id, "Relay resolved the link");
        Ok(record)
    }
}

fn parse_endpoint(base_url: &str) -> String {
    format!("{}/api/video/parse", base_url.trim_end_matches('/'))
}

/// Relay payloads come from heterogeneous server-side extractors; fill the
/// invariant fields they sometimes leave blank.
fn normalize(record: &mut VideoRecord, url: &str) {
    if record.webpage_url.is_empty() {
        record.webpage_url = url.to_string();
    }
    if record.platform.is_empty() {
        if let Some(c) = classify(url) {
            record.platform = c.platform.key().to_string();
            record.platform_name = c.platform.display_name().to_string();
        }
    }
    if record.platform_name.is_empty() {
        if let Some(platform) = Platform::from_key(&record.platform) {
            record.platform_name = platform.display_name().to_string();
        }
    }
    if record.id.is_empty() {
        record.id = Platform::from_key(&record.platform)
            .and_then(|platform| extract(url, platform).ok())
            .map(|ident| ident.id)
            .unwrap_or_else(|| url.to_string());
    }
    if record.extractor.is_empty() {
        record.extractor = "relay".to_string();
    }
}

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::classify::Platform;
use crate::orchestrator::ResolveMode;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unsupported link: {0}")]
    UnsupportedLink(String),

    #[error("Invalid link format: {0}")]
    InvalidLinkFormat(String),

    #[error("Remote API error: {platform} - {message}")]
    RemoteApiError { platform: String, message: String },

    #[error("Resource not found: {0}")]
    NotFoundError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("All resolution stages failed after {attempts} attempt(s): {trail}")]
    ResolutionExhausted { attempts: usize, trail: String },

    #[error("Batch too large: {given} URLs exceeds the limit of {max}")]
    BatchTooLarge { given: usize, max: usize },

    #[error("Concurrency limit reached")]
    ConcurrencyLimitError,
}

impl ResolveError {
    /// Stable machine-readable tag carried into failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UrlParseError(_) => "InvalidLinkFormat",
            ResolveError::UnsupportedLink(_) => "UnsupportedLink",
            ResolveError::InvalidLinkFormat(_) => "InvalidLinkFormat",
            ResolveError::RemoteApiError { .. } => "RemoteApiError",
            ResolveError::NotFoundError(_) => "NotFoundError",
            ResolveError::RateLimitError(_) => "RateLimitError",
            ResolveError::TimeoutError(_) => "TimeoutError",
            ResolveError::ResolutionExhausted { .. } => "ResolutionExhausted",
            ResolveError::BatchTooLarge { .. } => "BatchTooLarge",
            ResolveError::ConcurrencyLimitError => "ConcurrencyLimitError",
        }
    }

    pub fn log(&self) {
        match self {
            ResolveError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            ResolveError::UnsupportedLink(url) => {
                warn!(url = %url, "No supported platform matched the link");
            }
            ResolveError::InvalidLinkFormat(msg) => {
                warn!(error = %msg, "Link matched a platform but no identifier pattern");
            }
            ResolveError::RemoteApiError { platform, message } => {
                error!(
                    platform = %platform,
                    error = %message,
                    "Platform API call failed"
                );
            }
            ResolveError::NotFoundError(e) => {
                warn!(error = %e, "Requested resource does not exist");
            }
            ResolveError::RateLimitError(e) => {
                warn!(error = %e, "Rate limit exceeded");
            }
            ResolveError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            ResolveError::ResolutionExhausted { attempts, trail } => {
                error!(
                    attempts = attempts,
                    trail = %trail,
                    "Every resolution stage failed"
                );
            }
            ResolveError::BatchTooLarge { given, max } => {
                warn!(given = given, max = max, "Batch request over the URL limit");
            }
            ResolveError::ConcurrencyLimitError => {
                warn!("Concurrency limit reached");
            }
        }
    }

    /// Packages the error for display: kind tag, message, and suggestions
    /// matching the mode the caller was running in.
    pub fn report(&self, platform: Option<Platform>, mode: ResolveMode) -> FailureReport {
        FailureReport {
            error_kind: self.kind().to_string(),
            message: self.to_string(),
            suggestions: self.suggestions(platform, mode),
        }
    }

    fn suggestions(&self, platform: Option<Platform>, mode: ResolveMode) -> Vec<String> {
        let mut suggestions: Vec<String> = match self {
            ResolveError::UrlParseError(_)
            | ResolveError::UnsupportedLink(_)
            | ResolveError::InvalidLinkFormat(_) => vec![
                "检查视频链接是否正确".into(),
                "确认视频是否存在且可访问".into(),
                "某些平台可能需要特殊处理".into(),
            ],
            ResolveError::BatchTooLarge { max, .. } => {
                vec![format!("每批最多解析 {max} 个链接，请拆分后重试")]
            }
            ResolveError::RateLimitError(_) => vec!["请求过于频繁，请稍后重试".into()],
            _ => match mode {
                ResolveMode::FrontendOnly => {
                    let mut list = vec!["尝试切换到智能模式或代理解析".into()];
                    match platform {
                        Some(Platform::Bilibili) | Some(Platform::Youtube) => {
                            list.push("检查网络连接和接口可达性".into());
                        }
                        _ => list.push("此平台可能需要代理服务支持".into()),
                    }
                    list
                }
                ResolveMode::BackendOnly => vec![
                    "确认代理服务器正在运行".into(),
                    "检查代理服务地址配置".into(),
                    "尝试切换到直连解析模式".into(),
                ],
                ResolveMode::Auto => vec![
                    "尝试手动切换到直连解析或代理解析".into(),
                    "检查网络连接和服务器状态".into(),
                ],
            },
        };
        suggestions.push("确认视频链接格式正确且视频存在".into());
        suggestions
    }
}

/// Serializable failure summary handed to API layers.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub error_kind: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        let err = ResolveError::UnsupportedLink("https://example.com".into());
        assert_eq!(err.kind(), "UnsupportedLink");

        let err = ResolveError::ResolutionExhausted {
            attempts: 3,
            trail: "platform_api: boom".into(),
        };
        assert_eq!(err.kind(), "ResolutionExhausted");
    }

    #[test]
    fn link_errors_suggest_checking_the_url() {
        let err = ResolveError::UnsupportedLink("https://example.com".into());
        let report = err.report(None, ResolveMode::Auto);
        assert_eq!(report.error_kind, "UnsupportedLink");
        assert!(report.suggestions.iter().any(|s| s.contains("检查视频链接")));
    }

    #[test]
    fn mode_shapes_cascade_failure_suggestions() {
        let err = ResolveError::ResolutionExhausted {
            attempts: 1,
            trail: "platform_api: boom".into(),
        };

        let frontend = err.report(Some(Platform::Douyin), ResolveMode::FrontendOnly);
        assert!(frontend.suggestions.iter().any(|s| s.contains("代理服务支持")));

        let backend = err.report(Some(Platform::Douyin), ResolveMode::BackendOnly);
        assert!(backend.suggestions.iter().any(|s| s.contains("代理服务器")));

        for report in [frontend, backend] {
            assert_eq!(
                report.suggestions.last().map(String::as_str),
                Some("确认视频链接格式正确且视频存在")
            );
        }
    }
}

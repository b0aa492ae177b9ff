use video_unfurl::{ResolveError, ResolveMode, UnfurlService};

#[tokio::test]
async fn test_malformed_url_is_rejected() {
    let service = UnfurlService::new();

    let result = service.resolve("not a url at all").await;

    assert!(result.is_err());
    match result.unwrap_err() {
        ResolveError::UrlParseError(_) => {}
        _ => panic!("Expected UrlParseError"),
    }
}

#[tokio::test]
async fn test_unrelated_site_is_unsupported() {
    let service = UnfurlService::new();

    let result = service.resolve("https://www.baidu.com/s?wd=video").await;

    assert!(result.is_err());
    match result.unwrap_err() {
        ResolveError::UnsupportedLink(url) => {
            assert!(url.contains("baidu.com"));
        }
        _ => panic!("Expected UnsupportedLink"),
    }
}

#[tokio::test]
async fn test_recognized_platform_without_an_id_pattern() {
    let service = UnfurlService::new();

    // A bilibili article link classifies as bilibili but carries no video id
    let result = service
        .resolve("https://www.bilibili.com/read/cv12345678")
        .await;

    assert!(result.is_err());
    match result.unwrap_err() {
        ResolveError::InvalidLinkFormat(msg) => {
            assert!(msg.contains("bilibili"));
        }
        _ => panic!("Expected InvalidLinkFormat"),
    }
}

#[tokio::test]
async fn test_failure_report_carries_suggestions() {
    let service = UnfurlService::new();

    let err = service
        .resolve("https://example.org/clip/42")
        .await
        .unwrap_err();
    let report = err.report(None, ResolveMode::Auto);

    assert_eq!(report.error_kind, "UnsupportedLink");
    assert!(!report.suggestions.is_empty());
    assert_eq!(
        report.suggestions.last().map(String::as_str),
        Some("确认视频链接格式正确且视频存在")
    );
}

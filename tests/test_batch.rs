use video_unfurl::{ResolveError, UnfurlService, UnfurlServiceConfig, MAX_BATCH_URLS};

fn offline_service() -> UnfurlService {
    UnfurlService::new_with_config(
        UnfurlServiceConfig::new().with_generic_program("video-unfurl-missing-binary"),
    )
}

#[tokio::test]
async fn test_batch_mixes_successes_and_failures() {
    let service = offline_service();

    let urls = vec![
        "https://www.douyin.com/video/7123456789012345678",
        "https://example.com/video/1",
        "https://v.qq.com/x/page/x0032fg3mxk.html",
    ];

    let outcome = service.resolve_batch(urls).await.unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.successful, 2);
    assert_eq!(outcome.failed, 1);

    // Entries keep their input order
    assert_eq!(outcome.results[0].index, 0);
    assert!(outcome.results[0].success);
    assert!(outcome.results[0].data.is_some());

    assert_eq!(outcome.results[1].index, 1);
    assert!(!outcome.results[1].success);
    let error = outcome.results[1].error.as_ref().unwrap();
    assert!(error.contains("example.com"));
    assert!(outcome.results[1].data.is_none());

    assert!(outcome.results[2].success);
    assert_eq!(
        outcome.results[2].data.as_ref().unwrap().platform,
        "tencent"
    );
}

#[tokio::test]
async fn test_batch_over_the_limit_is_rejected() {
    let service = offline_service();

    let urls: Vec<&str> = std::iter::repeat("https://www.douyin.com/video/7123456789012345678")
        .take(MAX_BATCH_URLS + 1)
        .collect();

    let result = service.resolve_batch(urls).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        ResolveError::BatchTooLarge { given, max } => {
            assert_eq!(given, MAX_BATCH_URLS + 1);
            assert_eq!(max, MAX_BATCH_URLS);
        }
        _ => panic!("Expected BatchTooLarge"),
    }
}

#[tokio::test]
async fn test_batch_at_the_limit_is_accepted() {
    let service = offline_service();

    let urls: Vec<&str> = std::iter::repeat("https://www.douyin.com/video/7123456789012345678")
        .take(MAX_BATCH_URLS)
        .collect();

    let outcome = service.resolve_batch(urls).await.unwrap();
    assert_eq!(outcome.total, MAX_BATCH_URLS);
    assert_eq!(outcome.successful, MAX_BATCH_URLS);
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn test_batch_entries_serialize_for_the_wire() {
    let service = offline_service();

    let outcome = service
        .resolve_batch(vec!["https://www.douyin.com/video/7123456789012345678"])
        .await
        .unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["total"], 1);
    assert_eq!(json["results"][0]["success"], true);
    assert_eq!(json["results"][0]["data"]["platform"], "douyin");
    // Failed-entry fields are omitted on success
    assert!(json["results"][0].get("error").is_none());
}

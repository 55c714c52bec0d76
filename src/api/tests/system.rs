use super::*;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn health_reports_version_and_upstream_key() {
    let server = MockServer::start().await;
    let (app, _) = router_for(test_config(&server));

    let response = send(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["api_key_configured"], true);
}

#[tokio::test]
async fn health_without_upstream_key_says_so() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.upstream.api_key = None;
    let (app, _) = router_for(config);

    let body = body_json(send(&app, "/health", None).await).await;
    assert_eq!(body["api_key_configured"], false);
}

#[tokio::test]
async fn stats_include_limits_and_hide_errors_without_api_key() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.batch.max_concurrent_downloads = 4;
    let (app, downloader) = router_for(config);
    downloader
        .stats()
        .record_batch_total_failure(ORDER, 2)
        .await;

    let body = body_json(send(&app, "/api/stats", None).await).await;

    assert_eq!(body["batches_failed"], 1);
    assert_eq!(body["images_failed"], 2);
    assert_eq!(body["limits"]["max_concurrent_downloads"], 4);
    assert_eq!(body["limits"]["max_assets_per_order"], 100);
    assert!(body.get("recent_errors").is_none());
}

#[tokio::test]
async fn stats_include_recent_errors_for_authenticated_callers() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.server.api.api_key = Some("service-key".to_string());
    let (app, downloader) = router_for(config);
    downloader
        .stats()
        .record_batch_complete(ORDER, 3, 2, 1)
        .await;

    let body = body_json(send(&app, "/api/stats", Some("service-key")).await).await;

    let errors = body["recent_errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["order_id"], ORDER);
    assert_eq!(errors[0]["error"], "Partial failure: 1/3 images failed");
}

#[tokio::test]
async fn stats_reflect_a_served_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path(format!("/orders/{ORDER}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Order",
            "images": [{"image_id": "a", "image_name": "a.jpg"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/images/a/enhanced"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&server)
        .await;
    let (app, _) = router_for(test_config(&server));

    let response = send(&app, &format!("/orders/{ORDER}/images"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(send(&app, "/api/stats", None).await).await;
    assert_eq!(body["zips_served"], 1);
    assert_eq!(body["orders_processed"], 1);
    assert_eq!(body["images_downloaded"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = MockServer::start().await;
    let (app, _) = router_for(test_config(&server));

    let response = send(&app, "/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["paths"]["/orders/{order_id}/images"].is_object());
}

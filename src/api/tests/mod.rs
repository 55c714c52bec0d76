use super::*;
use crate::stats::Stats;
use crate::upstream::UpstreamClient;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;

mod system;

const ORDER: &str = "100aefc4-8664-4180-9a97-42f428c6aace";

/// Config pointing at a mock upstream, with a fast retry policy
fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = server.uri();
    config.upstream.api_key = Some("upstream-key".to_string());
    config.upstream.request_timeout = Duration::from_secs(5);
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(10);
    config
}

fn router_for(config: Config) -> (Router, Arc<BatchDownloader>) {
    let config = Arc::new(config);
    let client = Arc::new(UpstreamClient::new(&config.upstream).unwrap());
    let downloader = Arc::new(BatchDownloader::new(client, &config, Stats::new()));
    (create_router(downloader.clone(), config), downloader)
}

async fn send(app: &Router, uri: &str, api_key: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn server_serves_until_shutdown_signal() {
    let server = MockServer::start().await;
    let config = Arc::new(test_config(&server));

    let client = Arc::new(UpstreamClient::new(&config.upstream).unwrap());
    let downloader = Arc::new(BatchDownloader::new(client, &config, Stats::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(serve(listener, downloader, config, async {
        let _ = stop_rx.await;
    }));

    let health: serde_json::Value = reqwest::get(format!("http://{address}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let server = MockServer::start().await;
    let (app, _) = router_for(test_config(&server));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
    let exposed = response
        .headers()
        .get("access-control-expose-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    assert!(exposed.contains("x-total-images"));
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.server.api.cors_enabled = false;
    let (app, _) = router_for(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn security_headers_are_set_on_every_response() {
    let server = MockServer::start().await;
    let (app, _) = router_for(test_config(&server));

    for uri in ["/health", "/orders/not-a-uuid/images"] {
        let response = send(&app, uri, None).await;
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff", "{uri}");
        assert_eq!(headers["x-frame-options"], "DENY", "{uri}");
        assert_eq!(
            headers["referrer-policy"], "strict-origin-when-cross-origin",
            "{uri}"
        );
        assert!(headers.contains_key("permissions-policy"), "{uri}");
    }
}

#[tokio::test]
async fn api_key_protects_orders_and_stats_but_not_health() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.server.api.api_key = Some("service-key".to_string());
    let (app, _) = router_for(config);

    assert_eq!(send(&app, "/health", None).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, "/api/stats", None).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        send(&app, "/api/stats", Some("wrong")).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        send(&app, "/api/stats", Some("service-key")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(&app, &format!("/orders/{ORDER}/images"), None)
            .await
            .status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn swagger_ui_can_be_disabled() {
    let server = MockServer::start().await;

    let (app, _) = router_for(test_config(&server));
    assert_ne!(
        send(&app, "/swagger-ui/", None).await.status(),
        StatusCode::NOT_FOUND
    );

    let mut config = test_config(&server);
    config.server.api.swagger_ui = false;
    let (app, _) = router_for(config);
    assert_eq!(
        send(&app, "/swagger-ui/", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

use super::*;
use crate::config::{FetchFailurePolicy, RetryConfig};
use crate::db::Database;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt; // for oneshot()
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a CommentSync pointed at a mock remote API
async fn create_test_sync(
    server: &MockServer,
    policy: FetchFailurePolicy,
) -> (Arc<CommentSync>, Arc<Config>, NamedTempFile) {
    let mut config = Config::default();
    config.remote.base_url = format!("{}/comments/", server.uri());
    config.retry = RetryConfig {
        max_retries: 1,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config.fetch_failure_policy = policy;
    let config = Arc::new(config);

    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let sync = CommentSync::with_parts(config.clone(), Arc::new(db)).unwrap();
    (Arc::new(sync), config, temp_file)
}

async fn mount_comment(server: &MockServer, id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/comments/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "postId": 1,
            "id": id,
            "name": "quo vero reiciendis velit similique earum",
            "email": "Jayne_Kuhic@sydney.com",
            "body": "est natus enim nihil est dolore omnis voluptatem numquam"
        })))
        .mount(server)
        .await;
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_sync_endpoint_returns_stored_comment() {
    let mock_server = MockServer::start().await;
    mount_comment(&mock_server, 1).await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync.clone(), config);

    let (status, json) = get(app, "/api/v1/external/comments/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["externalId"], 1);
    assert_eq!(json["groupId"], 1);
    assert_eq!(json["email"], "Jayne_Kuhic@sydney.com");
    assert_eq!(json["createdAt"], json["updatedAt"]);
    assert!(json["id"].as_i64().unwrap() > 0);
    assert_eq!(sync.db().count_comments().await.unwrap(), 1);
}

#[tokio::test]
async fn test_sync_endpoint_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/external/comments/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
    assert_eq!(json["error"]["details"]["comment_id"], "999");
}

#[tokio::test]
async fn test_sync_endpoint_upstream_unavailable_with_surface_policy() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::Surface).await;
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/external/comments/5").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "upstream_unavailable");
}

#[tokio::test]
async fn test_sync_endpoint_persist_failure() {
    let mock_server = MockServer::start().await;
    mount_comment(&mock_server, 42).await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    sync.db().pool().close().await;
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/external/comments/42").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "persist_failed");
    assert_eq!(json["error"]["message"], "failed to save comment");
}

#[tokio::test]
async fn test_stored_comment_endpoint() {
    let mock_server = MockServer::start().await;
    mount_comment(&mock_server, 7).await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;

    let (status, _) = get(
        create_router(sync.clone(), config.clone()),
        "/api/v1/comments/7",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    sync.get_external_comment_by_id("7").await.unwrap();

    let (status, json) = get(create_router(sync, config), "/api/v1/comments/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["externalId"], 7);
}

#[tokio::test]
async fn test_stored_comment_endpoint_rejects_non_numeric_id() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync, config);

    let (status, _) = get(app, "/api/v1/comments/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shutting_down_returns_503() {
    let mock_server = MockServer::start().await;
    mount_comment(&mock_server, 1).await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    sync.shutdown_token().cancel();
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/external/comments/1").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "shutting_down");
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync, config);

    let (status, json) = get(app, "/api/v1/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/external/comments/{id}"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;

    let mut disabled = (*config).clone();
    disabled.api.swagger_ui = false;
    let (status, _) = get(create_router(sync.clone(), Arc::new(disabled)), "/swagger-ui").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(create_router(sync, config), "/swagger-ui").await;
    assert_ne!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_enabled() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let app = create_router(sync, config);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let mut config = (*config).clone();
    config.api.cors_enabled = false;
    let app = create_router(sync, Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let mock_server = MockServer::start().await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;
    let mut config = (*config).clone();
    config.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(sync, Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://allowed.example")
    );
}

#[tokio::test]
async fn test_server_serves_until_shutdown() {
    let mock_server = MockServer::start().await;
    mount_comment(&mock_server, 2).await;
    let (sync, config, _db_file) = create_test_sync(&mock_server, FetchFailurePolicy::default()).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(listener, sync.clone(), config));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{address}/api/v1/external/comments/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["externalId"], 2);

    sync.shutdown_token().cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

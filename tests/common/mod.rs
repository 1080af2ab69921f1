//! Common test utilities for comment-sync integration tests

use comment_sync::config::{PersistenceConfig, RetryConfig};
use comment_sync::{CommentSync, Config, FetchFailurePolicy};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// JSON body the remote API returns for a comment
pub fn comment_body(id: i64, post_id: i64, body: &str) -> serde_json::Value {
    serde_json::json!({
        "postId": post_id,
        "id": id,
        "name": format!("comment {id}"),
        "email": format!("author{id}@example.com"),
        "body": body
    })
}

/// Serve `comment_body(id, post_id, body)` at `/comments/{id}`
pub async fn mount_comment(server: &MockServer, id: i64, post_id: i64, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/comments/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(comment_body(id, post_id, body)))
        .mount(server)
        .await;
}

/// Config pointing at `server` with a fast retry policy and a store inside `dir`
pub fn test_config(server: &MockServer, dir: &TempDir, policy: FetchFailurePolicy) -> Config {
    let mut config = Config::default();
    config.remote.base_url = format!("{}/comments/", server.uri());
    config.remote.connect_timeout = Duration::from_millis(200);
    config.remote.response_timeout = Duration::from_millis(500);
    config.retry = RetryConfig {
        max_retries: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config.persistence = PersistenceConfig {
        database_path: dir.path().join("comments.db"),
        ..PersistenceConfig::default()
    };
    config.fetch_failure_policy = policy;
    config
}

/// Build a service with the default failure policy
///
/// Returns the service and temp directory (keep temp_dir alive for test duration)
pub async fn create_sync(server: &MockServer) -> (CommentSync, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let sync = CommentSync::new(test_config(server, &dir, FetchFailurePolicy::default()))
        .await
        .expect("service should start");
    (sync, dir)
}

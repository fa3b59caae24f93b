//! HTTP server for reclog.
//!
//! Exposes per-key JSON record logs over a small JSON API. Reads are open;
//! write, append, pop and clear require an HS256 bearer token when a
//! secret is configured.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use api::{ApiResponse, FileRequest, Operation, Reply};
pub use auth::{AllowAllAuth, AuthProvider, Claims, Credentials, Hs256Auth, Identity};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::ReclogServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use reclog_store::{AppendMode, RecordLogStore, StoreConfig};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const SECRET: &str = "test-secret";

    struct Harness {
        _dir: tempfile::TempDir,
        app: Router,
        token: String,
    }

    fn harness_with(append_mode: AppendMode) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.store = StoreConfig {
            append_mode,
            ..StoreConfig::with_root(dir.path())
        };
        config.token_secret = Some(SECRET.into());
        let auth = Hs256Auth::new(SECRET);
        let token = auth.issue("tester", None).unwrap();
        let state = AppState::new(RecordLogStore::open(config.store.clone()), Arc::new(auth));
        let app = ReclogServer::with_state(config, state).router();
        Harness { _dir: dir, app, token }
    }

    fn harness() -> Harness {
        harness_with(AppendMode::Sequence)
    }

    impl Harness {
        async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.send(uri, body.to_string(), Some(&self.token)).await
        }

        async fn post_anonymous(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.send(uri, body.to_string(), None).await
        }

        async fn send(&self, uri: &str, body: String, token: Option<&str>) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let response = self
                .app
                .clone()
                .oneshot(builder.body(Body::from(body)).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    #[tokio::test]
    async fn help_and_health_endpoints() {
        let h = harness();
        for uri in ["/api/help/", "/api/health/", "/"] {
            let response = h
                .app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), 200, "{uri}");
        }
    }

    #[tokio::test]
    async fn read_missing_key_is_404() {
        let h = harness();
        let (status, body) = h.post("/api/read/", json!({"file": "nope"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"content": "Read Error | File path does not exist."}));
    }

    #[tokio::test]
    async fn write_then_append_then_read() {
        let h = harness();
        let (status, body) = h.post("/api/write/", json!({"file": "log", "content": "A"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"content": "Write Success | Wrote to log"}));

        let (status, body) =
            h.post("/api/append/", json!({"file": "log", "content": {"b": 1}})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"content": "Append Success | Appended to log"}));
        h.post("/api/append/", json!({"file": "log", "content": ["c"]})).await;

        let (status, body) = h.post_anonymous("/api/read/", json!({"file": "log"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": ["A", {"b": 1}, ["c"]]}));
    }

    #[tokio::test]
    async fn write_replaces_previous_log() {
        let h = harness();
        h.post("/api/write/", json!({"file": "k", "content": "A"})).await;
        h.post("/api/write/", json!({"file": "k", "content": "B"})).await;
        let (_, body) = h.post("/api/read/", json!({"file": "k"})).await;
        assert_eq!(body, json!({"content": ["B"]}));
    }

    #[tokio::test]
    async fn blank_write_is_rejected() {
        let h = harness();
        h.post("/api/write/", json!({"file": "k", "content": "keep"})).await;
        for blank in [json!({"file": "k", "content": "  "}), json!({"file": "k"})] {
            let (status, body) = h.post("/api/write/", blank).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"content": "Write Error | No write content specified."}));
        }
        let (_, body) = h.post("/api/read/", json!({"file": "k"})).await;
        assert_eq!(body, json!({"content": ["keep"]}));
    }

    #[tokio::test]
    async fn pop_drains_in_order() {
        let h = harness();
        for i in 0..3 {
            h.post("/api/append/", json!({"file": "q", "content": i})).await;
        }
        for i in 0..3 {
            let (status, body) = h.post("/api/pop/", json!({"file": "q"})).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"content": i}));
        }
        let (status, body) = h.post("/api/pop/", json!({"file": "q"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": ""}));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let h = harness();
        let (status, body) = h.post("/api/clear/", json!({"file": "c"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"content": "Clear Success | Cleared c"}));

        h.post("/api/append/", json!({"file": "c", "content": "x"})).await;
        h.post("/api/clear/", json!({"file": "c"})).await;
        let (_, body) = h.post("/api/read/", json!({"file": "c"})).await;
        assert_eq!(body, json!({"content": []}));
    }

    #[tokio::test]
    async fn latest_returns_new_content_once() {
        let h = harness();
        h.post("/api/write/", json!({"file": "l", "content": "hello"})).await;
        let (_, body) = h.post_anonymous("/api/latest/", json!({"file": "l"})).await;
        assert_eq!(body, json!({"content": ["hello"]}));
        let (status, body) = h.post_anonymous("/api/latest/", json!({"file": "l"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": ""}));
    }

    #[tokio::test]
    async fn read_marks_content_as_seen() {
        let h = harness();
        h.post("/api/write/", json!({"file": "l", "content": "a"})).await;
        h.post("/api/append/", json!({"file": "l", "content": "b"})).await;
        let (status, body) = h.post_anonymous("/api/read/", json!({"file": "l"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": ["a", "b"]}));

        let (_, body) = h.post_anonymous("/api/latest/", json!({"file": "l"})).await;
        assert_eq!(body, json!({"content": ""}));

        h.post("/api/append/", json!({"file": "l", "content": "c"})).await;
        let (_, body) = h.post_anonymous("/api/latest/", json!({"file": "l"})).await;
        assert_eq!(body, json!({"content": ["a", "b", "c"]}));
    }

    #[tokio::test]
    async fn legacy_mode_survives_clear_and_pop() {
        let h = harness_with(AppendMode::Legacy);
        h.post("/api/write/", json!({"file": "m", "content": "text"})).await;
        let (status, body) = h.post("/api/pop/", json!({"file": "m"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": "text"}));

        h.post("/api/clear/", json!({"file": "m"})).await;
        let (status, _) = h.post("/api/append/", json!({"file": "m", "content": {"a": 1}})).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = h.post("/api/read/", json!({"file": "m"})).await;
        assert_eq!(body, json!({"content": {"a": 1}}));
    }

    #[tokio::test]
    async fn mutations_require_token() {
        let h = harness();
        for uri in ["/api/write/", "/api/append/", "/api/pop/", "/api/clear/"] {
            let (status, body) = h.post_anonymous(uri, json!({"file": "k", "content": "x"})).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({"content": "Auth Error | Token is missing."}));

            let (status, body) = h
                .send(uri, json!({"file": "k", "content": "x"}).to_string(), Some("bad.token.here"))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({"content": "Auth Error | Token is invalid."}));
        }
        let (status, _) = h.post("/api/read/", json!({"file": "k"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let h = harness();
        let (status, body) =
            h.post("/api/write/", json!({"file": "../escape", "content": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["content"].as_str().unwrap().starts_with("Write Error | InvalidKey:"));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let h = harness();
        let (status, body) = h.send("/api/append/", "{not json".into(), Some(&h.token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["content"].as_str().unwrap().starts_with("Append Error | JsonRejection:"));
    }

    #[tokio::test]
    async fn legacy_mode_merges_and_reports_mismatch() {
        let h = harness_with(AppendMode::Legacy);
        h.post("/api/append/", json!({"file": "m", "content": {"k": 1}})).await;
        h.post("/api/append/", json!({"file": "m", "content": {"k": 2}})).await;
        let (_, body) = h.post("/api/read/", json!({"file": "m"})).await;
        assert_eq!(body, json!({"content": {"k": 1, "k_0": 2}}));

        let (status, body) = h.post("/api/append/", json!({"file": "m", "content": "text"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["content"].as_str().unwrap().starts_with("Append Error | TypeMismatchError:"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_keep_every_record() {
        let h = Arc::new(harness());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let h = Arc::clone(&h);
            tasks.push(tokio::spawn(async move {
                h.post("/api/append/", json!({"file": "race", "content": i})).await
            }));
        }
        for task in tasks {
            let (status, _) = task.await.unwrap();
            assert_eq!(status, StatusCode::CREATED);
        }
        let (_, body) = h.post("/api/read/", json!({"file": "race"})).await;
        assert_eq!(body["content"].as_array().unwrap().len(), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_keys_are_independent() {
        let h = Arc::new(harness());
        let a = {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                for i in 0..5 {
                    h.post("/api/append/", json!({"file": "a", "content": format!("a{i}")})).await;
                }
            })
        };
        let b = {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                for i in 0..5 {
                    h.post("/api/append/", json!({"file": "b", "content": format!("b{i}")})).await;
                }
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        let (_, a_body) = h.post("/api/read/", json!({"file": "a"})).await;
        let (_, b_body) = h.post("/api/read/", json!({"file": "b"})).await;
        assert_eq!(a_body, json!({"content": ["a0", "a1", "a2", "a3", "a4"]}));
        assert_eq!(b_body, json!({"content": ["b0", "b1", "b2", "b3", "b4"]}));
    }
}

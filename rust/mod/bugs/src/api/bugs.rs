use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, put};
use axum::{Json, Router};

use bugtracker_core::ServiceError;

use crate::model::{Bug, BugPatch, CreateBug};
use crate::store::BugStore;

type StoreState = Arc<BugStore>;

pub fn router(store: Arc<BugStore>) -> Router {
    Router::new()
        .route("/bugs", get(list_bugs).post(create_bug))
        .route("/bugs/{id}", put(update_bug).delete(delete_bug))
        .with_state(store)
}

/// Run a store call on the blocking pool; redb commits sync to disk.
async fn blocking<T, F>(store: StoreState, f: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&BugStore) -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ServiceError::Internal(format!("store task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// POST /bugs
// ---------------------------------------------------------------------------

async fn create_bug(
    State(store): State<StoreState>,
    payload: Result<Json<CreateBug>, JsonRejection>,
) -> Result<(StatusCode, Json<Bug>), ServiceError> {
    let Json(input) = payload?;
    let bug = blocking(store, move |store| store.insert(input)).await?;
    Ok((StatusCode::CREATED, Json(bug)))
}

// ---------------------------------------------------------------------------
// GET /bugs
// ---------------------------------------------------------------------------

async fn list_bugs(State(store): State<StoreState>) -> Result<Json<Vec<Bug>>, ServiceError> {
    Ok(Json(blocking(store, |store| store.list()).await?))
}

// ---------------------------------------------------------------------------
// PUT /bugs/{id}
// ---------------------------------------------------------------------------

/// Answers 200 with `null` when the id is unknown, matching the behavior
/// existing clients rely on. An empty body is an empty patch.
async fn update_bug(
    State(store): State<StoreState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Option<Bug>>, ServiceError> {
    let patch = parse_patch(&headers, &body)?;
    Ok(Json(blocking(store, move |store| store.update(&id, patch)).await?))
}

fn parse_patch(headers: &HeaderMap, body: &Bytes) -> Result<BugPatch, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BugPatch::default());
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false);
    if !is_json {
        return Err(ServiceError::Validation(
            "Expected request with `Content-Type: application/json`".into(),
        ));
    }
    let Json(patch) = Json::<BugPatch>::from_bytes(body)?;
    Ok(patch)
}

// ---------------------------------------------------------------------------
// DELETE /bugs/{id}
// ---------------------------------------------------------------------------

async fn delete_bug(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    blocking(store, move |store| store.delete(&id)).await?;
    Ok(Json(serde_json::json!({ "message": "Bug deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use bugtracker_kv::{KVError, KVStore, RedbStore};
    use tower::ServiceExt;

    fn test_router() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RedbStore::open(&dir.path().join("api.redb")).unwrap());
        (dir, router(Arc::new(BugStore::new(kv))))
    }

    /// Backend that fails every call, to exercise the 500 path.
    struct BrokenKv;

    impl KVStore for BrokenKv {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KVError> {
            Err(KVError::Storage("connection refused".into()))
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<(), KVError> {
            Err(KVError::Storage("connection refused".into()))
        }
        fn delete(&self, _key: &str) -> Result<bool, KVError> {
            Err(KVError::Storage("connection refused".into()))
        }
        fn update(
            &self,
            _key: &str,
            _f: &mut dyn FnMut(&[u8]) -> Result<Option<Vec<u8>>, KVError>,
        ) -> Result<Option<Vec<u8>>, KVError> {
            Err(KVError::Storage("connection refused".into()))
        }
        fn scan(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
            Err(KVError::Storage("connection refused".into()))
        }
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn list_empty() {
        let (_dir, router) = test_router();
        let (status, body) = send(&router, "GET", "/bugs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn create_defaults_to_open() {
        let (_dir, router) = test_router();
        let (status, created) = send(
            &router,
            "POST",
            "/bugs",
            Some(serde_json::json!({"title": "Login fails", "description": "500 on submit"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "open");
        assert_eq!(created["title"], "Login fails");
        assert_eq!(created["description"], "500 on submit");
        assert!(!created["id"].as_str().unwrap().is_empty());
        assert!(created["createdAt"].as_str().unwrap().contains('T'));

        let (status, list) = send(&router, "GET", "/bugs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, serde_json::json!([created]));
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let (_dir, router) = test_router();
        let (status, body) = send(
            &router,
            "POST",
            "/bugs",
            Some(serde_json::json!({"title": "x", "status": "closed"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert!(body["error"].as_str().unwrap().contains("closed"));

        let (_, list) = send(&router, "GET", "/bugs", None).await;
        assert_eq!(list, serde_json::json!([]));
    }

    #[tokio::test]
    async fn create_rejects_wrong_field_type() {
        let (_dir, router) = test_router();
        let (status, body) = send(
            &router,
            "POST",
            "/bugs",
            Some(serde_json::json!({"title": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let (_dir, router) = test_router();
        let (_, created) = send(
            &router,
            "POST",
            "/bugs",
            Some(serde_json::json!({"title": "t", "description": "d"})),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, updated) = send(
            &router,
            "PUT",
            &format!("/bugs/{id}"),
            Some(serde_json::json!({"status": "resolved"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let mut expected = created.clone();
        expected["status"] = serde_json::json!("resolved");
        assert_eq!(updated, expected);
    }

    #[tokio::test]
    async fn update_ignores_id_and_created_at() {
        let (_dir, router) = test_router();
        let (_, created) = send(&router, "POST", "/bugs", Some(serde_json::json!({"title": "t"}))).await;
        let id = created["id"].as_str().unwrap();

        let (status, updated) = send(
            &router,
            "PUT",
            &format!("/bugs/{id}"),
            Some(serde_json::json!({
                "id": "hijacked",
                "createdAt": "1970-01-01T00:00:00Z",
                "title": "renamed",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_eq!(updated["title"], "renamed");
    }

    #[tokio::test]
    async fn update_missing_returns_null() {
        let (_dir, router) = test_router();
        let (status, body) = send(
            &router,
            "PUT",
            "/bugs/no-such-id",
            Some(serde_json::json!({"status": "resolved"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let (_dir, router) = test_router();
        let (status, body) = send(&router, "DELETE", "/bugs/no-such-id", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"message": "Bug deleted"}));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (_dir, router) = test_router();
        let (_, a) = send(&router, "POST", "/bugs", Some(serde_json::json!({"title": "a"}))).await;
        let (_, b) = send(&router, "POST", "/bugs", Some(serde_json::json!({"title": "b"}))).await;

        let uri = format!("/bugs/{}", a["id"].as_str().unwrap());
        let (status, _) = send(&router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = send(&router, "GET", "/bugs", None).await;
        assert_eq!(list, serde_json::json!([b]));
    }

    #[tokio::test]
    async fn update_null_description_clears_it() {
        let (_dir, router) = test_router();
        let (_, created) = send(
            &router,
            "POST",
            "/bugs",
            Some(serde_json::json!({"title": "t", "description": "d"})),
        )
        .await;
        let uri = format!("/bugs/{}", created["id"].as_str().unwrap());

        let (_, kept) = send(&router, "PUT", &uri, Some(serde_json::json!({"title": "t2"}))).await;
        assert_eq!(kept["description"], "d");

        let (status, cleared) = send(
            &router,
            "PUT",
            &uri,
            Some(serde_json::json!({"description": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cleared["description"].is_null());
        assert_eq!(cleared["title"], "t2");

        let (_, list) = send(&router, "GET", "/bugs", None).await;
        assert!(list[0]["description"].is_null());
    }

    #[tokio::test]
    async fn update_without_body_returns_record() {
        let (_dir, router) = test_router();
        let (_, created) = send(&router, "POST", "/bugs", Some(serde_json::json!({"title": "t"}))).await;
        let uri = format!("/bugs/{}", created["id"].as_str().unwrap());

        let (status, body) = send(&router, "PUT", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, created);

        let (status, body) = send(&router, "PUT", "/bugs/no-such-id", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn update_non_json_body_is_400() {
        let (_dir, router) = test_router();
        let req = Request::builder()
            .method("PUT")
            .uri("/bugs/abc")
            .header("content-type", "text/plain")
            .body(Body::from("title=x"))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    /// Records the thread each write runs on.
    struct ThreadRecordingKv {
        inner: RedbStore,
        writers: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl ThreadRecordingKv {
        fn record(&self) {
            self.writers.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl KVStore for ThreadRecordingKv {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
            self.record();
            self.inner.set(key, value)
        }
        fn delete(&self, key: &str) -> Result<bool, KVError> {
            self.record();
            self.inner.delete(key)
        }
        fn update(
            &self,
            key: &str,
            f: &mut dyn FnMut(&[u8]) -> Result<Option<Vec<u8>>, KVError>,
        ) -> Result<Option<Vec<u8>>, KVError> {
            self.record();
            self.inner.update(key, f)
        }
        fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
            self.inner.scan(prefix)
        }
    }

    #[tokio::test]
    async fn writes_run_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(ThreadRecordingKv {
            inner: RedbStore::open(&dir.path().join("threads.redb")).unwrap(),
            writers: Default::default(),
        });
        let router = router(Arc::new(BugStore::new(kv.clone())));

        let (_, created) = send(&router, "POST", "/bugs", Some(serde_json::json!({"title": "t"}))).await;
        let uri = format!("/bugs/{}", created["id"].as_str().unwrap());
        send(&router, "PUT", &uri, Some(serde_json::json!({"status": "resolved"}))).await;
        send(&router, "DELETE", &uri, None).await;

        let runtime_thread = std::thread::current().id();
        let writers = kv.writers.lock().unwrap();
        assert_eq!(writers.len(), 3);
        assert!(writers.iter().all(|id| *id != runtime_thread));
    }

    #[tokio::test]
    async fn storage_failure_is_500_with_message() {
        let router = router(Arc::new(BugStore::new(Arc::new(BrokenKv))));

        let cases = [
            ("GET", "/bugs", None),
            ("POST", "/bugs", Some(serde_json::json!({"title": "x"}))),
            ("PUT", "/bugs/abc", Some(serde_json::json!({"title": "x"}))),
            ("DELETE", "/bugs/abc", None),
        ];
        for (method, uri, body) in cases {
            let (status, json) = send(&router, method, uri, body).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
            assert_eq!(json["error"], "storage error: connection refused", "{method} {uri}");
            assert_eq!(json["code"], "STORAGE_ERROR");
        }
    }
}

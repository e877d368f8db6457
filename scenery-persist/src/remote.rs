//! Client for the remote scene row store.
//!
//! The store is a PostgREST-style REST endpoint holding one row per
//! scene: `{id, owner_id, is_public, config, created_at, updated_at}`.
//! Older deployments lack the `owner_id`/`is_public` columns and keep
//! visibility inside `config` itself; requests against such a schema
//! fail with an error body naming the missing column. The client detects
//! that signal, retries with the legacy shape, and memoises legacy mode
//! so later calls skip the failing request entirely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use scenery_core::current_timestamp_ms;

use crate::error::RemoteError;

/// Access columns introduced after the first deployed schema. An error
/// body mentioning one of these is the schema-mismatch signal.
const ACCESS_COLUMNS: [&str; 2] = ["is_public", "owner_id"];

/// Whether an error body names one of the newer access columns.
///
/// String sniffing is the only signal the wire protocol offers; it is
/// contained here so a structured capability probe can replace it in one
/// place.
#[must_use]
pub fn mentions_missing_column(body: &str) -> bool {
    ACCESS_COLUMNS.iter().any(|column| body.contains(column))
}

/// One scene row as returned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneRow {
    /// The stored document, compacted or full shape.
    pub config: Value,
    /// Row-level visibility; absent on legacy schemas.
    #[serde(default)]
    pub is_public: Option<bool>,
}

struct InnerStore {
    http: Client,
    base: Url,
    api_key: Option<String>,
    /// Set after the first schema-mismatch so the session downgrades
    /// once instead of paying a failed request per call.
    legacy_schema: AtomicBool,
}

/// Asynchronous client for the remote scene row store.
#[derive(Clone)]
pub struct RemoteStore {
    inner: Arc<InnerStore>,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("base", &self.inner.base.as_str())
            .field("legacy_schema", &self.inner.legacy_schema.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RemoteStore {
    /// Create a client for the given store base URL. The scenes
    /// collection lives at `{base}/scenes`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if the URL is malformed and
    /// [`RemoteError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>, api_key: Option<String>) -> Result<Self, RemoteError> {
        let mut base =
            Url::parse(base_url.as_ref()).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        // Url::join treats a base without a trailing slash as a file.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(concat!("scenery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner: Arc::new(InnerStore {
                http,
                base,
                api_key,
                legacy_schema: AtomicBool::new(false),
            }),
        })
    }

    /// Whether the client has downgraded to the legacy row shape.
    #[must_use]
    pub fn is_legacy_schema(&self) -> bool {
        self.inner.legacy_schema.load(Ordering::Relaxed)
    }

    fn scenes_url(&self, id: Option<&str>, select: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self
            .inner
            .base
            .join("scenes")
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(id) = id {
                query.append_pair("id", &format!("eq.{id}"));
            }
            if let Some(select) = select {
                query.append_pair("select", select);
            }
        }
        Ok(url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.api_key {
            Some(ref key) => builder
                .header("apikey", key)
                .bearer_auth(key),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn note_schema_mismatch(&self, error: &RemoteError) -> bool {
        if error.is_schema_mismatch() {
            if !self.inner.legacy_schema.swap(true, Ordering::Relaxed) {
                debug!("remote schema lacks access columns, downgrading to legacy shape");
            }
            true
        } else {
            false
        }
    }

    /// Fetch the row for a scene id. Returns `None` when no row exists.
    ///
    /// On a schema mismatch the query is retried without the visibility
    /// column; the mismatch is never surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] on network failures, non-success statuses
    /// other than the schema-mismatch signal, or unparseable payloads.
    pub async fn fetch(&self, id: &str) -> Result<Option<SceneRow>, RemoteError> {
        if !self.is_legacy_schema() {
            match self.fetch_with_select(id, "config,is_public").await {
                Ok(row) => return Ok(row),
                Err(e) if self.note_schema_mismatch(&e) => {}
                Err(e) => return Err(e),
            }
        }
        self.fetch_with_select(id, "config").await
    }

    async fn fetch_with_select(
        &self,
        id: &str,
        select: &str,
    ) -> Result<Option<SceneRow>, RemoteError> {
        let url = self.scenes_url(Some(id), Some(select))?;
        let response = self.request(self.inner.http.get(url)).send().await?;
        let response = Self::check(response).await?;
        let rows: Vec<SceneRow> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    /// Update an existing row with the current document and visibility.
    ///
    /// `legacy_config` is the payload written when the store lacks the
    /// access columns; callers that know the owner fold it in there so
    /// legacy rows keep carrying ownership inside `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when both shapes fail.
    pub async fn update(
        &self,
        id: &str,
        config: &Value,
        legacy_config: &Value,
        is_public: bool,
    ) -> Result<(), RemoteError> {
        let now = current_timestamp_ms();
        if !self.is_legacy_schema() {
            let body = json!({
                "config": config,
                "is_public": is_public,
                "updated_at": now,
            });
            match self.patch_row(id, &body).await {
                Ok(()) => return Ok(()),
                Err(e) if self.note_schema_mismatch(&e) => {}
                Err(e) => return Err(e),
            }
        }
        let body = json!({
            "config": legacy_config,
            "updated_at": now,
        });
        self.patch_row(id, &body).await
    }

    async fn patch_row(&self, id: &str, body: &Value) -> Result<(), RemoteError> {
        let url = self.scenes_url(Some(id), None)?;
        let response = self
            .request(self.inner.http.patch(url))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Insert a fresh row tagged with owner and visibility.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when both shapes fail.
    pub async fn insert(
        &self,
        id: &str,
        owner_id: &str,
        config: &Value,
        legacy_config: &Value,
        is_public: bool,
    ) -> Result<(), RemoteError> {
        let now = current_timestamp_ms();
        if !self.is_legacy_schema() {
            let body = json!([{
                "id": id,
                "owner_id": owner_id,
                "is_public": is_public,
                "config": config,
                "created_at": now,
                "updated_at": now,
            }]);
            match self.post_rows(&body).await {
                Ok(()) => return Ok(()),
                Err(e) if self.note_schema_mismatch(&e) => {}
                Err(e) => return Err(e),
            }
        }
        let body = json!([{
            "id": id,
            "config": legacy_config,
            "created_at": now,
            "updated_at": now,
        }]);
        self.post_rows(&body).await
    }

    async fn post_rows(&self, body: &Value) -> Result<(), RemoteError> {
        let url = self.scenes_url(None, None)?;
        let response = self
            .request(self.inner.http.post(url))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Log-and-continue helper for best-effort remote writes.
pub(crate) fn log_remote_failure(operation: &str, error: &RemoteError) {
    warn!("remote {operation} failed, continuing: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn missing_column_body() -> &'static str {
        r#"{"message": "column scenes.is_public does not exist"}"#
    }

    async fn store_for(server: &MockServer) -> RemoteStore {
        RemoteStore::new(server.uri() + "/", None).expect("store")
    }

    #[test]
    fn test_mentions_missing_column() {
        assert!(mentions_missing_column("column \"is_public\" does not exist"));
        assert!(mentions_missing_column("unknown column owner_id"));
        assert!(!mentions_missing_column("permission denied"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RemoteStore::new("not-a-url", None);
        assert!(matches!(result, Err(RemoteError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn fetch_returns_row_with_visibility() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scenes"))
            .and(query_param("id", "eq.abc123"))
            .and(query_param("select", "config,is_public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "config": { "n": "Shared", "l": [] }, "is_public": true }
            ])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let row = store.fetch("abc123").await.expect("fetch").expect("row");
        assert_eq!(row.is_public, Some(true));
        assert_eq!(row.config["n"], "Shared");
    }

    #[tokio::test]
    async fn fetch_returns_none_for_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scenes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        assert!(store.fetch("gone").await.expect("fetch").is_none());
    }

    #[tokio::test]
    async fn fetch_retries_legacy_select_on_schema_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scenes"))
            .and(query_param("select", "config,is_public"))
            .respond_with(ResponseTemplate::new(400).set_body_string(missing_column_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/scenes"))
            .and(query_param("select", "config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "config": { "n": "Legacy", "l": [] } }
            ])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let row = store.fetch("abc123").await.expect("fetch").expect("row");
        assert_eq!(row.is_public, None);
        assert!(store.is_legacy_schema());
    }

    #[tokio::test]
    async fn legacy_mode_skips_modern_query_on_later_calls() {
        let server = MockServer::start().await;
        let modern = Mock::given(method("GET"))
            .and(path("/scenes"))
            .and(query_param("select", "config,is_public"))
            .respond_with(ResponseTemplate::new(400).set_body_string(missing_column_body()))
            .expect(1)
            .mount_as_scoped(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/scenes"))
            .and(query_param("select", "config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "config": {} }
            ])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        store.fetch("a").await.expect("first fetch");
        store.fetch("a").await.expect("second fetch");
        drop(modern);
    }

    #[tokio::test]
    async fn update_retries_without_visibility_column() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/scenes"))
            .and(body_string_contains("is_public"))
            .respond_with(ResponseTemplate::new(400).set_body_string(missing_column_body()))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/scenes"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let config = serde_json::json!({ "n": "Doc", "p": true, "l": [] });
        store
            .update("abc123", &config, &config, true)
            .await
            .expect("update succeeds via legacy shape");
        assert!(store.is_legacy_schema());
    }

    #[tokio::test]
    async fn update_surfaces_non_schema_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/scenes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let config = serde_json::json!({});
        let err = store
            .update("abc123", &config, &config, false)
            .await
            .expect_err("should fail");
        assert!(matches!(err, RemoteError::Status { status: 500, .. }));
        assert!(!store.is_legacy_schema());
    }

    #[tokio::test]
    async fn insert_uses_owner_column_then_legacy_fold() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scenes"))
            .and(body_string_contains("owner_id"))
            .respond_with(ResponseTemplate::new(400).set_body_string(missing_column_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/scenes"))
            .and(body_string_contains("ownerId"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let config = serde_json::json!({ "n": "Doc" });
        let legacy = serde_json::json!({ "n": "Doc", "ownerId": "user-1" });
        store
            .insert("fresh1", "user-1", &config, &legacy, false)
            .await
            .expect("insert succeeds via legacy shape");
    }
}

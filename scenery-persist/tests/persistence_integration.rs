//! Integration tests for the tiered persistence coordinator.

use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scenery_core::{DocumentStore, MediaType, SceneDocument};
use scenery_persist::{
    spawn_autosave, CompanionClient, LocalCache, PersistenceCoordinator, RemoteStore,
};

fn cache_in(dir: &tempfile::TempDir) -> LocalCache {
    LocalCache::open(dir.path()).expect("cache")
}

fn remote_for(server: &MockServer) -> RemoteStore {
    RemoteStore::new(server.uri() + "/", None).expect("remote")
}

const MISSING_COLUMN: &str = r#"{"message": "column scenes.is_public does not exist"}"#;

#[tokio::test]
async fn load_prefers_remote_and_remembers_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scenes"))
        .and(query_param("id", "eq.abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "config": { "n": "From remote", "l": [] }, "is_public": true }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let mut local = SceneDocument::default();
    local.name = "From cache".to_string();
    cache.store_document(&local).expect("seed cache");

    let coordinator = PersistenceCoordinator::new(cache).with_remote(remote_for(&server));
    let document = coordinator.load(Some("abc123")).await;

    assert_eq!(document.name, "From remote");
    assert!(document.is_public, "row visibility overrides the config");
    assert_eq!(coordinator.scene_id().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn load_retries_legacy_select_transparently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scenes"))
        .and(query_param("select", "config,is_public"))
        .respond_with(ResponseTemplate::new(400).set_body_string(MISSING_COLUMN))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scenes"))
        .and(query_param("select", "config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "config": { "n": "Legacy row", "p": true, "l": [] } }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator =
        PersistenceCoordinator::new(cache_in(&dir)).with_remote(remote_for(&server));
    let document = coordinator.load(Some("abc123")).await;

    assert_eq!(document.name, "Legacy row");
    // Visibility comes from inside the config on legacy schemas.
    assert!(document.is_public);
}

#[tokio::test]
async fn load_falls_back_to_companion_then_cache() {
    let server = MockServer::start().await;
    // Remote tier: row is missing.
    Mock::given(method("GET"))
        .and(path("/scenes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    // Companion tier: serves a document.
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "From companion",
            "canvasSize": { "width": 1280, "height": 720 },
            "layers": []
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator = PersistenceCoordinator::new(cache_in(&dir))
        .with_remote(remote_for(&server))
        .with_companion(CompanionClient::new(server.uri() + "/").expect("companion"));

    let document = coordinator.load(Some("abc123")).await;
    assert_eq!(document.name, "From companion");
}

#[tokio::test]
async fn load_uses_cache_when_remote_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scenes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let mut cached = SceneDocument::default();
    cached.name = "Cached".to_string();
    cache.store_document(&cached).expect("seed");

    let coordinator = PersistenceCoordinator::new(cache).with_remote(remote_for(&server));
    let document = coordinator.load(Some("abc123")).await;
    assert_eq!(document.name, "Cached");
}

#[tokio::test]
async fn load_normalizes_partial_cached_layers() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("scene.json"),
        r#"{
            "name": "Sparse",
            "canvasSize": { "width": 100, "height": 100 },
            "layers": [{ "id": "a", "name": "L", "type": "image", "source": "s",
                         "filters": { "opacity": 10 } }]
        }"#,
    )
    .expect("seed file");

    let coordinator = PersistenceCoordinator::new(cache_in(&dir));
    let document = coordinator.load(None).await;

    let filters = &document.layers[0].filters;
    assert!((filters.opacity - 10.0).abs() < f64::EPSILON);
    assert!(filters.visible, "missing fields come back as defaults");
    assert!((filters.scale - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn load_treats_corrupt_cache_as_absence() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("scene.json"), "{definitely not json").expect("seed");

    let coordinator = PersistenceCoordinator::new(cache_in(&dir));
    let document = coordinator.load(None).await;
    assert_eq!(document.name, scenery_core::document::DEFAULT_DOCUMENT_NAME);
}

#[tokio::test]
async fn save_retries_legacy_write_and_caller_observes_no_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/scenes"))
        .and(body_string_contains("is_public"))
        .respond_with(ResponseTemplate::new(400).set_body_string(MISSING_COLUMN))
        .expect(1)
        .mount(&server)
        .await;
    let legacy_write = Mock::given(method("PATCH"))
        .and(path("/scenes"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator =
        PersistenceCoordinator::new(cache_in(&dir)).with_remote(remote_for(&server));
    coordinator.set_scene_id("abc123");

    coordinator.save(&SceneDocument::default()).await;

    // Cache tier was written regardless of remote schema trouble.
    assert!(dir.path().join("scene.json").exists());
    assert!(dir.path().join("scene.id").exists());
    drop(legacy_write);
}

#[tokio::test]
async fn save_without_known_id_skips_remote() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/scenes"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator =
        PersistenceCoordinator::new(cache_in(&dir)).with_remote(remote_for(&server));

    coordinator.save(&SceneDocument::default()).await;
    assert!(dir.path().join("scene.json").exists());
}

#[tokio::test]
async fn save_swallows_remote_failures() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/scenes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator =
        PersistenceCoordinator::new(cache_in(&dir)).with_remote(remote_for(&server));
    coordinator.set_scene_id("abc123");

    // Must not panic or surface anything.
    coordinator.save(&SceneDocument::default()).await;
}

#[tokio::test]
async fn save_mirrors_to_loopback_companion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator = PersistenceCoordinator::new(cache_in(&dir))
        .with_companion(CompanionClient::new(server.uri() + "/").expect("companion"));

    coordinator.save(&SceneDocument::default()).await;
}

#[tokio::test]
async fn round_trip_through_cache_preserves_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator = PersistenceCoordinator::new(cache_in(&dir));

    let store = DocumentStore::new();
    store.add_layer("Camera", MediaType::Video, "https://cdn.example/cam");
    let saved = store.snapshot();

    coordinator.save(&saved).await;
    let loaded = coordinator.load(None).await;
    assert_eq!(loaded, saved);
}

#[tokio::test]
async fn autosave_bridge_saves_after_mutations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator = Arc::new(PersistenceCoordinator::new(cache_in(&dir)));

    let store = DocumentStore::new();
    let bridge = spawn_autosave(&store, Arc::clone(&coordinator));

    store.add_layer("A", MediaType::Image, "a");
    store.set_background_color("#123456");

    // Give the bridge a moment to drain the queue.
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        if dir.path().join("scene.json").exists() {
            break;
        }
    }

    let loaded = coordinator.load(None).await;
    assert_eq!(loaded.background_color, "#123456");
    bridge.abort();
}

#[tokio::test]
async fn reset_purges_cache_and_forgets_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let coordinator = PersistenceCoordinator::new(cache_in(&dir));
    coordinator.set_scene_id("abc123");
    coordinator.save(&SceneDocument::default()).await;
    assert!(dir.path().join("scene.json").exists());

    coordinator.reset();
    assert!(!dir.path().join("scene.json").exists());
    assert!(!dir.path().join("scene.id").exists());
    assert!(coordinator.scene_id().is_none());

    let document = coordinator.load(None).await;
    assert!(document.is_empty());
}

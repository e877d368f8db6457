//! End-to-end tests for the companion server over a real listener.

use std::path::PathBuf;

use scenery_companion::{router, CompanionState};
use scenery_core::{MediaType, SceneDocument};
use scenery_persist::CompanionClient;

async fn spawn_server(config_path: PathBuf) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = router(CompanionState::new(config_path));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn empty_slot_returns_null() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path().join("config.json")).await;

    let body: serde_json::Value = reqwest::get(base + "api/config")
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert!(body.is_null());
}

#[tokio::test]
async fn post_then_get_round_trips_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path().join("config.json")).await;

    let (document, _) =
        SceneDocument::default().add_layer("Camera", MediaType::Video, "https://cdn.example/cam");

    let client = reqwest::Client::new();
    let response: serde_json::Value = client
        .post(base.clone() + "api/config")
        .json(&document)
        .send()
        .await
        .expect("post")
        .json()
        .await
        .expect("json");
    assert_eq!(response["success"], true);

    let stored: serde_json::Value = client
        .get(base + "api/config")
        .send()
        .await
        .expect("get")
        .json()
        .await
        .expect("json");
    assert_eq!(stored["layers"].as_array().expect("layers").len(), 1);
    assert_eq!(stored["layers"][0]["name"], "Camera");
}

#[tokio::test]
async fn companion_client_speaks_the_same_protocol() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path().join("config.json")).await;

    let client = CompanionClient::new(&base).expect("client");
    assert!(client.is_dev_host());
    assert!(client.fetch().await.expect("fetch").is_none());

    let (document, _) =
        SceneDocument::default().add_layer("Overlay", MediaType::Image, "https://cdn.example/o");
    client.push(&document).await.expect("push");

    let value = client.fetch().await.expect("fetch").expect("stored");
    assert_eq!(value["name"], document.name);
}

#[tokio::test]
async fn corrupt_slot_is_a_server_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, "{not json").expect("seed");
    let base = spawn_server(config_path).await;

    let response = reqwest::get(base + "api/config").await.expect("request");
    assert_eq!(response.status(), 500);
}

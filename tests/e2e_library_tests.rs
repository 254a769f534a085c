//! End-to-end tests for library import and browsing endpoints

mod common;

use common::{
    library_xml, TestClient, TestServer, LIBRARY_NAME, LIBRARY_PLAYLIST_NODE_COUNT,
    LIBRARY_TRACK_COUNT, OPENERS_PLAYLIST, OTHER_USER, OTHER_USER_TOKEN, TEST_USER,
};
use reqwest::StatusCode;
use serde_json::Value;

async fn import_fixture(server: &TestServer, client: &TestClient) -> Value {
    let response = client
        .import_library(LIBRARY_NAME, library_xml(&server.media_dir).as_bytes())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

fn find_by_name<'a>(items: &'a [Value], name: &str) -> &'a Value {
    items
        .iter()
        .find(|item| item["name"] == name)
        .unwrap_or_else(|| panic!("No item named {}", name))
}

#[tokio::test]
async fn test_import_returns_summary() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let summary = import_fixture(&server, &client).await;

    assert_eq!(summary["tracks"], LIBRARY_TRACK_COUNT);
    assert_eq!(summary["tempo_markers"], 2);
    assert_eq!(summary["playlist_nodes"], LIBRARY_PLAYLIST_NODE_COUNT);
    assert_eq!(summary["playlist_tracks"], 5);
    assert_eq!(summary["unresolved_track_keys"], 1);
    assert!(summary["library_id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_import_rejects_empty_name() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let response = client
        .import_library("   ", library_xml(&server.media_dir).as_bytes())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.library_ids(TEST_USER).is_empty());
}

#[tokio::test]
async fn test_import_rejects_bad_base64() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let response = client.import_library_raw(LIBRARY_NAME, "%%% not base64").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.library_ids(TEST_USER).is_empty());
}

#[tokio::test]
async fn test_import_rejects_malformed_document() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let response = client
        .import_library(LIBRARY_NAME, b"<DJ_PLAYLISTS><COLLECTION></DJ_PLAYLISTS>")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.library_ids(TEST_USER).is_empty());
}

#[tokio::test]
async fn test_import_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .import_library(LIBRARY_NAME, library_xml(&server.media_dir).as_bytes())
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_and_get_libraries() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let summary = import_fixture(&server, &client).await;
    let library_id = summary["library_id"].as_i64().unwrap();

    let response = client.get_libraries().await;
    assert_eq!(response.status(), StatusCode::OK);
    let libraries: Vec<Value> = response.json().await.unwrap();
    assert_eq!(libraries.len(), 1);
    assert_eq!(libraries[0]["id"], library_id);

    let response = client.get_library(library_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let library: Value = response.json().await.unwrap();
    assert_eq!(library["name"], LIBRARY_NAME);
    assert_eq!(library["source"], "rekordbox");
    assert_eq!(library["version"], "1.0.0");
    assert_eq!(library["product_name"], "rekordbox");
    assert_eq!(library["company"], "AlphaTheta");
}

#[tokio::test]
async fn test_library_tracks_are_in_document_order() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();

    let response = client.get_library_tracks(library_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracks: Vec<Value> = response.json().await.unwrap();

    let source_ids: Vec<&str> = tracks
        .iter()
        .map(|t| t["source_track_id"].as_str().unwrap())
        .collect();
    assert_eq!(source_ids, vec!["1", "2", "3", "4"]);
    assert_eq!(tracks[0]["storage_kind"], "local");
    assert_eq!(tracks[2]["storage_kind"], "cloud");
    assert_eq!(tracks[0]["date_added"], "2024-02-10");
    assert_eq!(tracks[1]["date_added"], "1970-01-01");
}

#[tokio::test]
async fn test_playlist_tree_and_resolution() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();

    let response = client.get_library_playlists(library_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let nodes: Vec<Value> = response.json().await.unwrap();
    assert_eq!(nodes.len(), LIBRARY_PLAYLIST_NODE_COUNT);

    let root = find_by_name(&nodes, "ROOT");
    let gigs = find_by_name(&nodes, "Gigs");
    let openers = find_by_name(&nodes, OPENERS_PLAYLIST);
    assert_eq!(root["node_kind"], "folder");
    assert!(root["parent_id"].is_null());
    assert_eq!(gigs["parent_id"], root["id"]);
    assert_eq!(openers["parent_id"], gigs["id"]);
    assert_eq!(openers["node_kind"], "playlist");

    let response = client
        .get_playlist_tracks(openers["id"].as_i64().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracks: Vec<Value> = response.json().await.unwrap();
    let names: Vec<&str> = tracks.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Opening", "Lost"]);

    let empty = find_by_name(&nodes, "Empty");
    let response = client
        .get_playlist_tracks(empty["id"].as_i64().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracks: Vec<Value> = response.json().await.unwrap();
    assert!(tracks.is_empty());
}

#[tokio::test]
async fn test_reimport_resolves_within_each_library() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let first = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();
    let second = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();
    assert_ne!(first, second);

    for library_id in [first, second] {
        let nodes: Vec<Value> = client
            .get_library_playlists(library_id)
            .await
            .json()
            .await
            .unwrap();
        let openers = find_by_name(&nodes, OPENERS_PLAYLIST);
        let tracks: Vec<Value> = client
            .get_playlist_tracks(openers["id"].as_i64().unwrap())
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(tracks.len(), 2);
        for track in tracks {
            assert_eq!(track["library_id"], library_id);
        }
    }
}

#[tokio::test]
async fn test_resolve_track_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let other = TestClient::with_token(server.base_url.clone(), OTHER_USER_TOKEN);
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();

    let response = client.get_library_track_by_key(library_id, "3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let track: Value = response.json().await.unwrap();
    assert_eq!(track["name"], "Up There");
    assert_eq!(track["library_id"], library_id);

    assert_eq!(
        client
            .get_library_track_by_key(library_id, "404")
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        other.get_library_track_by_key(library_id, "3").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_track_details() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();
    let tracks: Vec<Value> = client
        .get_library_tracks(library_id)
        .await
        .json()
        .await
        .unwrap();

    let response = client.get_track(tracks[0]["id"].as_i64().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let details: Value = response.json().await.unwrap();
    assert_eq!(details["name"], "Opening");
    assert_eq!(details["tempo_markers"].as_array().unwrap().len(), 2);
    assert_eq!(details["tempo_markers"][1]["battito"], 3);
    let local_path = details["local_path"].as_str().unwrap();
    assert!(local_path.ends_with("opening.mp3"));
    assert!(details["location"]
        .as_str()
        .unwrap()
        .starts_with("file://localhost"));

    let cloud: Value = client
        .get_track(tracks[2]["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    assert!(cloud["local_path"].is_null());
}

#[tokio::test]
async fn test_other_users_see_nothing() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let other = TestClient::with_token(server.base_url.clone(), OTHER_USER_TOKEN);
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();
    let tracks: Vec<Value> = client
        .get_library_tracks(library_id)
        .await
        .json()
        .await
        .unwrap();
    let nodes: Vec<Value> = client
        .get_library_playlists(library_id)
        .await
        .json()
        .await
        .unwrap();
    let track_id = tracks[0]["id"].as_i64().unwrap();
    let playlist_id = find_by_name(&nodes, OPENERS_PLAYLIST)["id"].as_i64().unwrap();

    let libraries: Vec<Value> = other.get_libraries().await.json().await.unwrap();
    assert!(libraries.is_empty());
    assert_eq!(
        other.get_library(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        other.get_library_tracks(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        other.get_library_playlists(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        other.get_playlist_tracks(playlist_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(other.get_track(track_id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        other.delete_library(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(server.library_ids(TEST_USER), vec![library_id]);
    assert!(server.library_ids(OTHER_USER).is_empty());
}

#[tokio::test]
async fn test_delete_library_cascades() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());
    let library_id = import_fixture(&server, &client).await["library_id"]
        .as_i64()
        .unwrap();
    let tracks: Vec<Value> = client
        .get_library_tracks(library_id)
        .await
        .json()
        .await
        .unwrap();

    let response = client.delete_library(library_id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        client.get_library(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client
            .get_track(tracks[0]["id"].as_i64().unwrap())
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.delete_library(library_id).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_health_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

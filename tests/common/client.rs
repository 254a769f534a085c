//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all musync-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use base64::{prelude::BASE64_STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RANGE};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client sending a session token with every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    fn build(base_url: String, token: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token"),
            );
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client without a session token
    pub fn new(base_url: String) -> Self {
        Self::build(base_url, None)
    }

    /// Creates a client authenticated as the regular test user
    pub fn authenticated(base_url: String) -> Self {
        Self::build(base_url, Some(TEST_USER_TOKEN))
    }

    /// Creates a client authenticated with the given token
    pub fn with_token(base_url: String, token: &str) -> Self {
        Self::build(base_url, Some(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Libraries
    // ========================================================================

    /// POST /v1/libraries
    pub async fn import_library(&self, name: &str, document: &[u8]) -> Response {
        self.import_library_raw(name, &BASE64_STANDARD.encode(document))
            .await
    }

    /// POST /v1/libraries with `file_data` sent as given
    pub async fn import_library_raw(&self, name: &str, file_data: &str) -> Response {
        self.client
            .post(self.url("/v1/libraries"))
            .json(&json!({
                "name": name,
                "file_data": file_data,
            }))
            .send()
            .await
            .expect("Import request failed")
    }

    /// GET /v1/libraries
    pub async fn get_libraries(&self) -> Response {
        self.client
            .get(self.url("/v1/libraries"))
            .send()
            .await
            .expect("Get libraries request failed")
    }

    /// GET /v1/libraries/{id}
    pub async fn get_library(&self, library_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/libraries/{}", library_id)))
            .send()
            .await
            .expect("Get library request failed")
    }

    /// DELETE /v1/libraries/{id}
    pub async fn delete_library(&self, library_id: i64) -> Response {
        self.client
            .delete(self.url(&format!("/v1/libraries/{}", library_id)))
            .send()
            .await
            .expect("Delete library request failed")
    }

    /// GET /v1/libraries/{id}/tracks
    pub async fn get_library_tracks(&self, library_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/libraries/{}/tracks", library_id)))
            .send()
            .await
            .expect("Get library tracks request failed")
    }

    /// GET /v1/libraries/{id}/tracks/{source_track_id}
    pub async fn get_library_track_by_key(&self, library_id: i64, key: &str) -> Response {
        self.client
            .get(self.url(&format!(
                "/v1/libraries/{}/tracks/{}",
                library_id,
                urlencoding::encode(key)
            )))
            .send()
            .await
            .expect("Get track by key request failed")
    }

    /// GET /v1/libraries/{id}/playlists
    pub async fn get_library_playlists(&self, library_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/libraries/{}/playlists", library_id)))
            .send()
            .await
            .expect("Get library playlists request failed")
    }

    // ========================================================================
    // Playlists and tracks
    // ========================================================================

    /// GET /v1/playlists/{id}/tracks
    pub async fn get_playlist_tracks(&self, playlist_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/playlists/{}/tracks", playlist_id)))
            .send()
            .await
            .expect("Get playlist tracks request failed")
    }

    /// GET /v1/tracks/{id}
    pub async fn get_track(&self, track_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks/{}", track_id)))
            .send()
            .await
            .expect("Get track request failed")
    }

    /// GET /v1/tracks/{id}/stream
    pub async fn stream_track(&self, track_id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks/{}/stream", track_id)))
            .send()
            .await
            .expect("Stream request failed")
    }

    /// GET /v1/tracks/{id}/stream with a Range header
    pub async fn stream_track_range(&self, track_id: i64, range: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks/{}/stream", track_id)))
            .header(RANGE, range)
            .send()
            .await
            .expect("Stream range request failed")
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(self.url("/health"))
            .send()
            .await
            .expect("Health request failed")
    }
}

//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides one method per music API endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Registers a user and returns the parsed user JSON.
    ///
    /// # Panics
    ///
    /// Panics if registration does not answer 201.
    pub async fn register_user(&self, name: &str, email: &str) -> Value {
        let response = self.register(name, email).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Registration of {} failed",
            email
        );
        response.json().await.expect("Invalid user JSON")
    }

    /// Creates a playlist and returns its id.
    pub async fn create_playlist_id(&self, secret_code: &str, name: &str) -> String {
        let response = self.create_playlist(secret_code, json!({ "name": name })).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let playlist: Value = response.json().await.expect("Invalid playlist JSON");
        playlist["id"].as_str().expect("Playlist id").to_owned()
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn register(&self, name: &str, email: &str) -> Response {
        self.post("/register", json!({ "name": name, "email": email }))
            .await
    }

    pub async fn login(&self, secret_code: &str) -> Response {
        self.post("/login", json!({ "secret_code": secret_code }))
            .await
    }

    pub async fn view_profile(&self, secret_code: &str) -> Response {
        self.client
            .get(self.url("/viewProfile"))
            .query(&[("secret_code", secret_code)])
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn create_playlist(&self, secret_code: &str, playlist: Value) -> Response {
        self.client
            .post(self.url("/createPlaylist"))
            .query(&[("secret_code", secret_code)])
            .json(&playlist)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn add_song_to_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song: Value,
    ) -> Response {
        self.post(
            "/addSongToPlaylist",
            json!({ "secret_code": secret_code, "playlist_id": playlist_id, "song": song }),
        )
        .await
    }

    pub async fn get_all_songs_of_playlist(&self, secret_code: &str, playlist_id: &str) -> Response {
        self.client
            .get(self.url("/getAllSongsOfPlaylist"))
            .query(&[("secret_code", secret_code), ("playlist_id", playlist_id)])
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn delete_song_from_playlist(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Response {
        self.post(
            "/deleteSongFromPlaylist",
            json!({ "secret_code": secret_code, "playlist_id": playlist_id, "song_id": song_id }),
        )
        .await
    }

    pub async fn delete_playlist(&self, secret_code: &str, playlist_id: &str) -> Response {
        self.post(
            "/deletePlaylist",
            json!({ "secret_code": secret_code, "playlist_id": playlist_id }),
        )
        .await
    }

    pub async fn get_song_detail(
        &self,
        secret_code: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Response {
        self.post(
            "/getSongDetail",
            json!({ "secret_code": secret_code, "playlist_id": playlist_id, "song_id": song_id }),
        )
        .await
    }
}

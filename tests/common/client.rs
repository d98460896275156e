//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing authentication flows; for most tests use
    /// `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the fixture's regular user.
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the given user.
    pub async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication endpoints
    // ========================================================================

    pub async fn login(&self, user_handle: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({
                "user_handle": user_handle,
                "password": password,
            }))
            .send()
            .await
            .expect("login request failed")
    }

    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/api/auth/logout", self.base_url))
            .send()
            .await
            .expect("logout request failed")
    }

    // ========================================================================
    // Favorites endpoints
    // ========================================================================

    pub async fn toggle_like(&self, song_id: impl std::fmt::Display) -> Response {
        self.client
            .put(format!("{}/api/songs/{}/like", self.base_url, song_id))
            .send()
            .await
            .expect("toggle request failed")
    }

    pub async fn is_liked(&self, song_id: impl std::fmt::Display) -> Response {
        self.client
            .get(format!("{}/api/songs/{}/is-liked", self.base_url, song_id))
            .send()
            .await
            .expect("is-liked request failed")
    }

    pub async fn add_favorite(&self, song_id: impl std::fmt::Display) -> Response {
        self.client
            .post(format!("{}/api/favorites/{}", self.base_url, song_id))
            .send()
            .await
            .expect("add favorite request failed")
    }

    pub async fn remove_favorite(&self, song_id: impl std::fmt::Display) -> Response {
        self.client
            .delete(format!("{}/api/favorites/{}", self.base_url, song_id))
            .send()
            .await
            .expect("remove favorite request failed")
    }

    pub async fn get_favorites(&self, limit: Option<u32>, offset: Option<u64>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/api/favorites", self.base_url));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset.to_string())]);
        }
        request.send().await.expect("favorites request failed")
    }

    pub async fn get_top_favorites(&self, limit: Option<u32>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/api/favorites/top", self.base_url));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        request.send().await.expect("top favorites request failed")
    }

    pub async fn get_favorite_stats(&self, song_id: impl std::fmt::Display) -> Response {
        self.client
            .get(format!("{}/api/favorites/{}/stats", self.base_url, song_id))
            .send()
            .await
            .expect("stats request failed")
    }
}

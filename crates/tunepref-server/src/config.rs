//! Spotify application configuration, sourced from the environment.

use std::env;

/// Default Spotify endpoints. Overridable through the environment so tests
/// and local mocks can point the client elsewhere.
const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const SPOTIFY_API_URL: &str = "https://api.spotify.com";

/// Scope required for the /me/top/* endpoints.
const SPOTIFY_SCOPE: &str = "user-top-read";

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub accounts_base_url: String,
    pub api_base_url: String,
    /// How long to wait for the OAuth callback to deliver a token.
    pub auth_timeout_secs: u64,
    /// Poll interval while waiting for the callback.
    pub auth_poll_secs: u64,
}

impl SpotifyConfig {
    pub fn from_env() -> Self {
        Self {
            client_id: env::var("SPOTIFY_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/api/callback".to_string()),
            scope: SPOTIFY_SCOPE.to_string(),
            accounts_base_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| SPOTIFY_ACCOUNTS_URL.to_string()),
            api_base_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| SPOTIFY_API_URL.to_string()),
            auth_timeout_secs: env::var("SPOTIFY_AUTH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            auth_poll_secs: env::var("SPOTIFY_AUTH_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }

    /// Build the user-facing authorization URL for the code grant.
    pub fn auth_url(&self) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}",
            self.accounts_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope),
        )
    }

    /// The accounts-service token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_base_url)
    }
}

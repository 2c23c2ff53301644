//! Spotify Web API client.
//!
//! Covers the authorization-code token grant, the refresh grant, track
//! search, and the /me/top/* "top items" endpoints. Responses are reshaped
//! into the simplified structures the rest of the service stores and
//! returns; nothing else from the upstream schema is carried along.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SpotifyConfig;
use crate::spotify::error::SpotifyError;

/// Time range accepted by the /me/top/* endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Simplified result shapes ────────────────────────────────────────

/// A track lookup result, as stored in a user's preference record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub track_name: String,
    pub artist: String,
    pub album: String,
    pub release_date: String,
    pub album_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopTrack {
    pub track_name: String,
    pub artist: String,
    pub album: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopArtist {
    pub name: String,
    pub genres: Vec<String>,
}

/// Token endpoint response (both the code and refresh grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

// ── Internal API response types ─────────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TracksPage,
}

#[derive(Deserialize)]
struct TracksPage {
    items: Vec<ApiTrack>,
}

#[derive(Deserialize)]
struct TopItemsResponse<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    artists: Vec<ApiArtist>,
    album: ApiAlbum,
}

#[derive(Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Deserialize)]
struct ApiAlbum {
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    album_type: String,
}

#[derive(Deserialize)]
struct ApiFullArtist {
    name: String,
    #[serde(default)]
    genres: Vec<String>,
}

/// Spotify client for token grants and API lookups.
pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { http, config }
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Exchange an authorization code for an access/refresh token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(SpotifyError::NotConfigured);
        }

        debug!("exchanging authorization code for tokens");

        let resp = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.config.redirect_uri),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Spotify token exchange failed");
            return Err(SpotifyError::TokenExchange(format!("status {status}")));
        }

        Ok(resp.json().await?)
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// Spotify may omit `refresh_token` in the response, in which case the
    /// caller keeps the old one.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(SpotifyError::NotConfigured);
        }

        let resp = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(status = %status, "Spotify token refresh failed");
            return Err(SpotifyError::TokenExchange(format!("status {status}")));
        }

        Ok(resp.json().await?)
    }

    /// Search for a track by title and artist, returning at most one
    /// simplified result.
    pub async fn search_track(
        &self,
        access_token: &str,
        track: &str,
        artist: &str,
    ) -> Result<Vec<TrackInfo>, SpotifyError> {
        let url = format!("{}/v1/search", self.config.api_base_url);

        debug!(track = track, artist = artist, "searching Spotify");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("q", format!("{track} {artist}").as_str()),
                ("type", "track"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Spotify search failed");
            return Err(SpotifyError::Api(resp.status().as_u16()));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| SpotifyError::MalformedResponse(e.to_string()))?;

        Ok(body
            .tracks
            .items
            .into_iter()
            .filter_map(|t| {
                // A track with no credited artist is unusable downstream.
                let artist = t.artists.into_iter().next()?.name;
                Some(TrackInfo {
                    track_name: t.name,
                    artist,
                    album: t.album.name,
                    release_date: t.album.release_date,
                    album_type: t.album.album_type,
                })
            })
            .collect())
    }

    /// The authenticated user's most-listened tracks.
    pub async fn top_tracks(
        &self,
        access_token: &str,
        limit: u8,
        time_range: TimeRange,
    ) -> Result<Vec<TopTrack>, SpotifyError> {
        let url = format!("{}/v1/me/top/tracks", self.config.api_base_url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("limit", limit.to_string().as_str()),
                ("time_range", time_range.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Spotify top tracks request failed");
            return Err(SpotifyError::Api(resp.status().as_u16()));
        }

        let body: TopItemsResponse<ApiTrack> = resp
            .json()
            .await
            .map_err(|e| SpotifyError::MalformedResponse(e.to_string()))?;

        Ok(body
            .items
            .into_iter()
            .filter_map(|t| {
                let artist = t.artists.into_iter().next()?.name;
                Some(TopTrack {
                    track_name: t.name,
                    artist,
                    album: t.album.name,
                })
            })
            .collect())
    }

    /// The authenticated user's most-listened artists.
    pub async fn top_artists(
        &self,
        access_token: &str,
        limit: u8,
        time_range: TimeRange,
    ) -> Result<Vec<TopArtist>, SpotifyError> {
        let url = format!("{}/v1/me/top/artists", self.config.api_base_url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("limit", limit.to_string().as_str()),
                ("time_range", time_range.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Spotify top artists request failed");
            return Err(SpotifyError::Api(resp.status().as_u16()));
        }

        let body: TopItemsResponse<ApiFullArtist> = resp
            .json()
            .await
            .map_err(|e| SpotifyError::MalformedResponse(e.to_string()))?;

        Ok(body
            .items
            .into_iter()
            .map(|a| TopArtist {
                name: a.name,
                genres: a.genres,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> SpotifyClient {
        SpotifyClient::new(SpotifyConfig {
            client_id: "client-123".into(),
            client_secret: "secret-456".into(),
            redirect_uri: "http://127.0.0.1:8080/api/callback".into(),
            scope: "user-top-read".into(),
            accounts_base_url: base_url.into(),
            api_base_url: base_url.into(),
            auth_timeout_secs: 5,
            auth_poll_secs: 1,
        })
    }

    // ── Time range ────────────────────────────────────────────────────

    #[test]
    fn test_time_range_strings() {
        assert_eq!(TimeRange::ShortTerm.as_str(), "short_term");
        assert_eq!(TimeRange::MediumTerm.as_str(), "medium_term");
        assert_eq!(TimeRange::LongTerm.as_str(), "long_term");
    }

    #[test]
    fn test_time_range_default_is_medium() {
        assert_eq!(TimeRange::default(), TimeRange::MediumTerm);
    }

    // ── DTO serialization ─────────────────────────────────────────────

    #[test]
    fn test_serialize_track_info() {
        let info = TrackInfo {
            track_name: "Song".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            release_date: "2020-01-01".into(),
            album_type: "album".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["track_name"], "Song");
        assert_eq!(json["release_date"], "2020-01-01");
    }

    #[test]
    fn test_deserialize_token_response_without_refresh() {
        let json = r#"{"access_token":"abc","expires_in":3600}"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "abc");
        assert!(resp.refresh_token.is_none());
        assert_eq!(resp.expires_in, 3600);
    }

    // ── Token grants ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let tokens = client.exchange_code("auth-code-1").await.unwrap();
        assert_eq!(tokens.access_token, "at-1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.exchange_code("bad-code").await.unwrap_err();
        assert!(matches!(err, SpotifyError::TokenExchange(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_without_credentials() {
        let mut config = test_client("http://localhost:9").config.clone();
        config.client_id = String::new();
        let client = SpotifyClient::new(config);
        let err = client.exchange_code("code").await.unwrap_err();
        assert!(matches!(err, SpotifyError::NotConfigured));
    }

    #[tokio::test]
    async fn test_refresh_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-2",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let tokens = client.refresh_token("rt-1").await.unwrap();
        assert_eq!(tokens.access_token, "at-2");
        // Spotify omitted the refresh token; caller keeps the old one
        assert!(tokens.refresh_token.is_none());
    }

    // ── Search ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_search_track_reshapes_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("type", "track"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": {
                    "items": [{
                        "name": "Paranoid Android",
                        "artists": [{"name": "Radiohead"}, {"name": "Other"}],
                        "album": {
                            "name": "OK Computer",
                            "release_date": "1997-05-21",
                            "album_type": "album",
                        },
                    }],
                },
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let results = client
            .search_track("token", "Paranoid Android", "Radiohead")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].track_name, "Paranoid Android");
        assert_eq!(results[0].artist, "Radiohead");
        assert_eq!(results[0].album, "OK Computer");
        assert_eq!(results[0].release_date, "1997-05-21");
        assert_eq!(results[0].album_type, "album");
    }

    #[tokio::test]
    async fn test_search_track_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"tracks": {"items": []}})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let results = client.search_track("token", "Nothing", "Nobody").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_track_skips_uncredited_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": {
                    "items": [{
                        "name": "Orphan",
                        "artists": [],
                        "album": {"name": "Unknown"},
                    }],
                },
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let results = client.search_track("token", "Orphan", "x").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_track_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.search_track("stale", "a", "b").await.unwrap_err();
        assert!(matches!(err, SpotifyError::Api(401)));
    }

    // ── Top items ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_top_tracks_reshape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/tracks"))
            .and(query_param("limit", "10"))
            .and(query_param("time_range", "medium_term"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "name": "One",
                        "artists": [{"name": "A"}],
                        "album": {"name": "First"},
                    },
                    {
                        "name": "Two",
                        "artists": [{"name": "B"}],
                        "album": {"name": "Second"},
                    },
                ],
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let tracks = client
            .top_tracks("token", 10, TimeRange::MediumTerm)
            .await
            .unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].track_name, "One");
        assert_eq!(tracks[1].artist, "B");
        assert_eq!(tracks[1].album, "Second");
    }

    #[tokio::test]
    async fn test_top_artists_reshape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/artists"))
            .and(query_param("time_range", "long_term"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "Radiohead", "genres": ["art rock", "alternative"]},
                    {"name": "Nils Frahm"},
                ],
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let artists = client
            .top_artists("token", 10, TimeRange::LongTerm)
            .await
            .unwrap();
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].genres, vec!["art rock", "alternative"]);
        assert!(artists[1].genres.is_empty());
    }

    #[tokio::test]
    async fn test_top_tracks_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/tracks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .top_tracks("token", 10, TimeRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SpotifyError::Api(503)));
    }

    #[tokio::test]
    async fn test_top_tracks_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .top_tracks("token", 10, TimeRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SpotifyError::MalformedResponse(_)));
    }
}

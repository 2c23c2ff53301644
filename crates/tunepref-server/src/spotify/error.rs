//! Spotify integration error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpotifyError {
    #[error("Spotify credentials are not configured")]
    NotConfigured,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("timed out waiting for Spotify authorization")]
    AuthorizationTimeout,

    #[error("Spotify API returned status {0}")]
    Api(u16),

    #[error("malformed Spotify response: {0}")]
    MalformedResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

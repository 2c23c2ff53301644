//! Shared Spotify token state.
//!
//! The callback handler deposits tokens here; everything that talks to the
//! Spotify API goes through [`ensure_access_token`], which refreshes an
//! expired token or, failing that, opens the authorization page in the
//! system browser and polls until the callback lands or a timeout elapses.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::spotify::client::TokenResponse;
use crate::spotify::error::SpotifyError;
use crate::state::AppState;

/// Leeway subtracted from the reported lifetime so a token is replaced
/// slightly before Spotify stops accepting it.
const EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct SpotifyTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    /// Unix timestamp of when the token was obtained.
    pub obtained_at: i64,
}

impl SpotifyTokens {
    pub fn from_response(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
            obtained_at: Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.obtained_at + self.expires_in as i64 - EXPIRY_LEEWAY_SECS
    }
}

/// Process-wide token slot, shared between the callback handler and the
/// API handlers that need an access token.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<SpotifyTokens>>>,
    auth_gate: Arc<tokio::sync::Mutex<()>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, tokens: SpotifyTokens) {
        *self.inner.write().await = Some(tokens);
    }

    pub async fn current(&self) -> Option<SpotifyTokens> {
        self.inner.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    /// Serialize authorization attempts: one refresh or browser round trip
    /// at a time. Holders that lose the race re-check the store instead of
    /// opening another browser tab.
    pub async fn begin_authorization(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.auth_gate.clone().lock_owned().await
    }
}

/// Produce a usable access token, going through (in order): the stored
/// token, the refresh grant, and finally a fresh browser authorization
/// round trip.
pub async fn ensure_access_token(state: &AppState) -> Result<String, SpotifyError> {
    if let Some(tokens) = state.tokens.current().await {
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }
    }

    let _guard = state.tokens.begin_authorization().await;

    // Another request may have finished authorizing while we waited on
    // the gate.
    if let Some(tokens) = state.tokens.current().await {
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        if let Some(refresh) = tokens.refresh_token.clone() {
            match state.spotify.refresh_token(&refresh).await {
                Ok(resp) => {
                    let mut fresh = SpotifyTokens::from_response(resp);
                    // Spotify may rotate the refresh token or omit it
                    if fresh.refresh_token.is_none() {
                        fresh.refresh_token = Some(refresh);
                    }
                    let access = fresh.access_token.clone();
                    state.tokens.set(fresh).await;
                    info!("refreshed Spotify access token");
                    return Ok(access);
                }
                Err(e) => {
                    warn!("token refresh failed, re-authorizing: {e}");
                    state.tokens.clear().await;
                }
            }
        } else {
            state.tokens.clear().await;
        }
    }

    let config = state.spotify.config();
    let auth_url = config.auth_url();

    info!("no usable Spotify token, starting authorization round trip");
    if webbrowser::open(&auth_url).is_err() {
        warn!("failed to open browser; authorize manually at {auth_url}");
    }

    let timeout = Duration::from_secs(config.auth_timeout_secs);
    let poll = Duration::from_secs(config.auth_poll_secs.max(1));

    wait_for_tokens(&state.tokens, timeout, poll)
        .await
        .map(|t| t.access_token)
        .ok_or(SpotifyError::AuthorizationTimeout)
}

/// Poll the store until the callback handler deposits a fresh token or the
/// timeout elapses. Re-reads the store on every tick.
pub(crate) async fn wait_for_tokens(
    store: &TokenStore,
    timeout: Duration,
    poll: Duration,
) -> Option<SpotifyTokens> {
    let start = Instant::now();

    while start.elapsed() < timeout {
        if let Some(tokens) = store.current().await {
            if !tokens.is_expired() {
                return Some(tokens);
            }
        }
        tokio::time::sleep(poll).await;
    }

    None
}

//! Spotify authorization endpoints: the auth-URL handout and the OAuth
//! redirect callback that completes the code exchange.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_response, spotify_error, ApiError};
use crate::spotify::SpotifyTokens;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Set by Spotify when the user denies access.
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// GET /api/authorize
pub async fn authorize(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let config = state.spotify.config();
    if config.client_id.is_empty() {
        return Err(error_response(
            StatusCode::NOT_IMPLEMENTED,
            "Spotify integration is not configured on this instance",
        ));
    }

    Ok(Json(AuthorizeResponse {
        auth_url: config.auth_url(),
    }))
}

/// GET /api/callback
///
/// Spotify redirects the user's browser here after the consent screen.
/// Exchanges the one-time code for tokens and deposits them in the shared
/// store, unblocking any handler waiting in the authorization poll loop.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, ApiError> {
    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Spotify authorization denied");
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {error}"),
        ));
    }

    let code = query.code.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Missing authorization code")
    })?;

    let resp = state
        .spotify
        .exchange_code(&code)
        .await
        .map_err(spotify_error)?;

    let body = CallbackResponse {
        access_token: resp.access_token.clone(),
        refresh_token: resp.refresh_token.clone(),
        expires_in: resp.expires_in,
    };

    state.tokens.set(SpotifyTokens::from_response(resp)).await;

    tracing::info!("Spotify authorization complete, tokens stored");

    Ok(Json(body))
}

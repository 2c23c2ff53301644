pub mod connect;
pub mod listening;
pub mod preferences;
pub mod users;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::spotify::SpotifyError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn db_error(e: sea_orm::DbErr) -> ApiError {
    tracing::error!("db error: {e}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Map Spotify-layer failures onto the HTTP surface.
pub(crate) fn spotify_error(e: SpotifyError) -> ApiError {
    let status = match &e {
        SpotifyError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
        SpotifyError::TokenExchange(_) => StatusCode::BAD_REQUEST,
        SpotifyError::AuthorizationTimeout => StatusCode::REQUEST_TIMEOUT,
        SpotifyError::Api(_) | SpotifyError::MalformedResponse(_) | SpotifyError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    tracing::warn!(status = %status, "spotify error: {e}");
    error_response(status, e.to_string())
}

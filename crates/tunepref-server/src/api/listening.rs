//! Aggregate "top items" endpoint for the authorized Spotify account.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::{spotify_error, ApiError};
use crate::spotify::client::{TopArtist, TopTrack};
use crate::spotify::{ensure_access_token, TimeRange};
use crate::state::AppState;

/// Default page size for the top-items lookups.
const TOP_ITEMS_LIMIT: u8 = 10;

#[derive(Debug, Serialize)]
pub struct ListeningResponse {
    pub top_tracks: Vec<TopTrack>,
    pub top_artists: Vec<TopArtist>,
}

/// GET /api/users/get-user-info
pub async fn get_user_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListeningResponse>, ApiError> {
    let access_token = ensure_access_token(&state).await.map_err(spotify_error)?;

    let top_tracks = state
        .spotify
        .top_tracks(&access_token, TOP_ITEMS_LIMIT, TimeRange::default())
        .await
        .map_err(spotify_error)?;

    let top_artists = state
        .spotify
        .top_artists(&access_token, TOP_ITEMS_LIMIT, TimeRange::default())
        .await
        .map_err(spotify_error)?;

    Ok(Json(ListeningResponse {
        top_tracks,
        top_artists,
    }))
}

//! The add-preference flow: look up a track on Spotify and append the
//! result to a user's preference record.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::users::UserResponse;
use super::{db_error, error_response, spotify_error, ApiError};
use crate::spotify::ensure_access_token;
use crate::state::AppState;
use tunepref_db::entities::user;

#[derive(Debug, Serialize)]
pub struct AddPreferenceResponse {
    pub message: String,
    pub user: UserResponse,
}

/// PUT /api/users/add-preferences/:user_id/:track/:artist
///
/// May trigger the full authorization round trip (browser + callback poll)
/// when no usable token is stored; responds 408 if that times out.
pub async fn add_preferences(
    State(state): State<Arc<AppState>>,
    Path((user_id, track, artist)): Path<(Uuid, String, String)>,
) -> Result<Json<AddPreferenceResponse>, ApiError> {
    let user_model = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "User not found"))?;

    let access_token = ensure_access_token(&state).await.map_err(spotify_error)?;

    let track_info = state
        .spotify
        .search_track(&access_token, &track, &artist)
        .await
        .map_err(spotify_error)?;

    // Append to the preference record, never rewrite earlier entries.
    let mut preferences = user_model.preferences.clone();
    match preferences.as_array_mut() {
        Some(list) => list.push(serde_json::json!({ "track_info": track_info })),
        None => {
            // Column default is a JSON array; anything else is corrupt
            tracing::error!(user_id = %user_id, "preferences column is not a JSON array");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Corrupt preference record",
            ));
        }
    }

    let mut active: user::ActiveModel = user_model.into();
    active.preferences = Set(preferences);
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    tracing::info!(user_id = %user_id, track = %track, artist = %artist, "preference added");

    Ok(Json(AddPreferenceResponse {
        message: "Preferences added successfully".to_string(),
        user: UserResponse::from(updated),
    }))
}

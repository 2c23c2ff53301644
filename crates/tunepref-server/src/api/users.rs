//! CRUD endpoints for the `User` resource.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{db_error, error_response, ApiError};
use crate::state::AppState;
use tunepref_db::entities::user;

// ─── Request/Response DTOs ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub preferences: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            preferences: u.preferences,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

// ─── Validation ─────────────────────────────────────────────────────

fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email.contains('@')
        || email.starts_with('@')
        || email.ends_with('@')
        || !email.split('@').nth(1).is_some_and(|d| d.contains('.'))
        || email.len() > 254
    {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Invalid email address",
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 255 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Name must be between 1 and 255 characters",
        ));
    }
    Ok(())
}

// ─── Handlers ───────────────────────────────────────────────────────

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_name(&body.name)?;
    validate_email(&body.email)?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&body.email))
        .one(&state.db)
        .await
        .map_err(db_error)?;

    if existing.is_some() {
        return Err(error_response(
            StatusCode::CONFLICT,
            "A user with this email already exists",
        ));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name),
        email: Set(body.email),
        preferences: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model.insert(&state.db).await.map_err(db_error)?;

    tracing::info!(user_id = %created.id, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_model = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(Json(UserResponse::from(user_model)))
}

/// PUT /api/users/:id
///
/// Partial update: absent fields keep their stored values.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_model = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "User not found"))?;

    let mut active: user::ActiveModel = user_model.into();

    if let Some(name) = body.name {
        validate_name(&name)?;
        active.name = Set(name);
    }

    if let Some(email) = body.email {
        validate_email(&email)?;

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(&email))
            .filter(user::Column::Id.ne(id))
            .one(&state.db)
            .await
            .map_err(db_error)?;
        if taken.is_some() {
            return Err(error_response(
                StatusCode::CONFLICT,
                "A user with this email already exists",
            ));
        }

        active.email = Set(email);
    }

    active.updated_at = Set(chrono::Utc::now().fixed_offset());
    let updated = active.update(&state.db).await.map_err(db_error)?;

    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = user::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        return Err(error_response(StatusCode::NOT_FOUND, "User not found"));
    }

    tracing::info!(user_id = %id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

//! `/api/v1/users` handlers: account creation, lookup and partial update.
//!
//! The returned `password` field is the stored digest, never a plaintext.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::db::{User, UserPatch};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Any subset of the fields may be present; absent fields are untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
        }
    }
}

/// `POST /api/v1/users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .user_repo()
        .create(&request.username, &request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/v1/users/{username}`: case-insensitive lookup returning the
/// record with its stored casing.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_repo().find_one_by_username(&username).await?;

    Ok(Json(user))
}

/// `PATCH /api/v1/users/{username}`
///
/// An absent body is treated as an empty patch, so a PATCH against a
/// nonexistent username still answers 404 rather than a body-parse error.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let patch: UpdateUserRequest = if body.is_empty() {
        UpdateUserRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| {
            ApiError::validation(
                "O corpo da requisição não é um JSON válido.",
                "Verifique o formato do corpo enviado.",
            )
        })?
    };

    let user = state
        .user_repo()
        .update(&username, patch.into())
        .await?;

    Ok(Json(user))
}

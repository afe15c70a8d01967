use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::services::{upload_avatar, UploadItem, MAX_AVATAR_BYTES};
use crate::{
    auth::{repo_types::User, CurrentUser},
    error::AppError,
    state::AppState,
};

pub fn avatar_routes() -> Router<AppState> {
    Router::new()
        .route("/upload-avatar/", post(upload_avatar_multipart))
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES))
}

/// POST /upload-avatar/ (multipart, field `file`)
#[instrument(skip_all)]
pub async fn upload_avatar_multipart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> Result<Json<User>, AppError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let updated = upload_avatar(&state, &user, UploadItem { body, content_type }).await?;
        return Ok(Json(updated));
    }
    Err(AppError::BadRequest("file is required".into()))
}

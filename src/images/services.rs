use anyhow::Context;
use bytes::Bytes;
use tracing::info;

use crate::{auth::repo_types::User, error::AppError, state::AppState};

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Stores the image under `avatars/{user_id}.{ext}` and points the user at it.
pub async fn upload_avatar(st: &AppState, user: &User, item: UploadItem) -> Result<User, AppError> {
    let ext = ext_from_mime(&item.content_type).ok_or_else(|| {
        AppError::BadRequest(format!("Unsupported image type {}", item.content_type))
    })?;
    if item.body.is_empty() {
        return Err(AppError::BadRequest("Empty file".into()));
    }

    let key = avatar_key(user, ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let url = st.storage.public_url(&key);
    let updated = st.auth.set_avatar(user.id, &url).await?;
    info!(user_id = %user.id, %key, "avatar updated");
    Ok(updated)
}

fn avatar_key(user: &User, ext: &str) -> String {
    format!("avatars/{}.{}", user.id, ext)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

//! services/api/src/web/users.rs
//!
//! Profile endpoints: read, update, delete, and the profile-picture upload.
//! All routes here sit behind the access-control gate.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::views::{Envelope, PublicUser};
use storynest_core::media;
use storynest_core::ports::ProfileChanges;
use storynest_core::validate;

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureView {
    pub profile_picture_url: String,
}

/// GET /api/users/profile
pub async fn get_profile_handler(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::data(PublicUser::from_domain(&user)))
}

/// PUT /api/users/profile
///
/// Partial update: only supplied fields change. Uniqueness is re-checked for
/// any field that actually changes.
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut changes = ProfileChanges::default();

    if let Some(username) = req.username {
        if username != user.username {
            validate::validate_username(&username)?;
            if state.db.find_user_by_username(&username).await?.is_some() {
                return Err(ApiError::Validation("Username is already taken".to_string()));
            }
            changes.username = Some(username);
        }
    }

    if let Some(email) = req.email {
        let email = validate::normalize_email(&email);
        if email != user.email {
            validate::validate_email(&email)?;
            if state.db.find_user_by_email(&email).await?.is_some() {
                return Err(ApiError::Validation(
                    "Email is already registered".to_string(),
                ));
            }
            changes.email = Some(email);
        }
    }

    let updated = state.db.update_profile(user.id, changes).await?;
    Ok(Envelope::data(PublicUser::from_domain(&updated)))
}

/// DELETE /api/users/profile
pub async fn delete_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    // Asset retirement is best-effort and never blocks account deletion.
    if let Some(asset_id) = &user.profile_picture_asset_id {
        if let Err(e) = state.assets.retire(asset_id).await {
            warn!(user_id = %user.id, "failed to retire profile picture: {e}");
        }
    }

    state.db.delete_user(user.id).await?;
    Ok(Envelope::message("Account deleted successfully"))
}

/// POST /api/users/profile/picture
///
/// Multipart upload, single `image` field. Publishes the new asset first and
/// only then retires the previous one; a failed retirement leaves an orphan
/// at the provider, never a broken profile.
pub async fn upload_picture_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart request: {e}")))?
    {
        let is_image_field = field.name() == Some("image");
        if is_image_field {
            let mime_type = field
                .content_type()
                .ok_or_else(|| {
                    ApiError::Validation("Image field is missing a content type".to_string())
                })?
                .to_string();
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read image field: {e}")))?;
            image = Some((bytes, mime_type, filename));
        }
    }

    let (bytes, mime_type, filename) =
        image.ok_or_else(|| ApiError::Validation("An image file is required".to_string()))?;

    let encoded = media::ingest(&bytes, &mime_type, &filename, Some(bytes.len()))?;
    let published = state
        .assets
        .publish(&encoded, "avatars")
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let previous_asset = user.profile_picture_asset_id.clone();
    state
        .db
        .set_profile_picture(user.id, &published.url, &published.asset_id)
        .await?;

    if let Some(old) = previous_asset {
        if let Err(e) = state.assets.retire(&old).await {
            warn!(user_id = %user.id, "failed to retire replaced profile picture: {e}");
        }
    }

    Ok(Envelope::data(ProfilePictureView {
        profile_picture_url: published.url,
    }))
}

use std::path::{Path, PathBuf};

use rocket::State;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::tokio::fs;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Permission, User};
use crate::config::AppConfig;
use crate::db::{authenticate_user, update_profile_pic, update_user_name, update_user_password};
use crate::error::AppError;
use crate::validation::JsonValidateExt;

use super::MessageResponse;

pub const PROFILE_PIC_DIR: &str = "profile-pics";
pub const MAX_PROFILE_PIC_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Current password is required"))]
    current_password: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    new_password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(FromForm)]
pub struct ProfilePictureUpload<'r> {
    #[field(name = "profilePic")]
    profile_pic: TempFile<'r>,
}

#[put("/update-profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserResponse>, AppError> {
    user.require_permission(Permission::EditOwnProfile)?;
    let profile = profile.validate_custom()?;

    let name = profile.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let user = update_user_name(db, user.id, name).await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

#[put("/update-password", data = "<passwords>")]
pub async fn api_update_password(
    passwords: Json<PasswordUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_permission(Permission::EditOwnProfile)?;
    let passwords = passwords.validate_custom()?;

    if authenticate_user(db, &user.email, &passwords.current_password)
        .await?
        .is_none()
    {
        return Err(AppError::Validation("Current password is incorrect".to_string()));
    }

    update_user_password(db, user.id, &passwords.new_password).await?;
    info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

fn picture_extension(content_type: Option<&ContentType>) -> Option<&'static str> {
    match content_type {
        Some(ct) if ct.is_jpeg() => Some("jpg"),
        Some(ct) if ct.is_png() => Some("png"),
        Some(ct) if ct.is_gif() => Some("gif"),
        _ => None,
    }
}

/// Maps a stored `/uploads/...` URL back onto the upload directory.
fn stored_path(upload_dir: &str, url: &str) -> Option<PathBuf> {
    url.strip_prefix("/uploads/")
        .filter(|rest| rest.starts_with(PROFILE_PIC_DIR) && !rest.contains(".."))
        .map(|rest| Path::new(upload_dir).join(rest))
}

#[put("/update-profile-picture", data = "<upload>")]
pub async fn api_update_profile_picture(
    mut upload: Form<ProfilePictureUpload<'_>>,
    user: User,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<UserResponse>, AppError> {
    user.require_permission(Permission::EditOwnProfile)?;

    let Some(extension) = picture_extension(upload.profile_pic.content_type()) else {
        return Err(AppError::Validation(
            "Only JPEG, PNG and GIF images are allowed".to_string(),
        ));
    };

    if upload.profile_pic.len() == 0 {
        return Err(AppError::Validation("Please upload an image".to_string()));
    }
    if upload.profile_pic.len() > MAX_PROFILE_PIC_BYTES {
        return Err(AppError::Validation("Image must be 2 MiB or smaller".to_string()));
    }

    let dir = Path::new(&config.upload_dir).join(PROFILE_PIC_DIR);
    fs::create_dir_all(&dir).await?;

    let file_name = format!("{}-{}.{}", user.id, Uuid::new_v4(), extension);
    upload.profile_pic.move_copy_to(dir.join(&file_name)).await?;

    let previous = stored_path(&config.upload_dir, &user.profile_pic);
    let updated = update_profile_pic(db, user.id, &format!("/uploads/{PROFILE_PIC_DIR}/{file_name}")).await?;

    if let Some(previous) = previous {
        if let Err(err) = fs::remove_file(&previous).await {
            warn!(error = %err, path = %previous.display(), "Could not remove old profile picture");
        }
    }

    info!(user_id = %user.id, "Profile picture updated");
    Ok(Json(UserResponse {
        message: "Profile picture updated successfully".to_string(),
        user: updated,
    }))
}

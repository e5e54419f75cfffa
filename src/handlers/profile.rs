//! Own-profile handlers

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::Identity;
use crate::validation::validate_file_count;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use chrono::Utc;
use std::path::PathBuf;
use validator::Validate;

use super::attachments::{read_upload_form, remove_files, store_images};
use super::auth::{hash_password, verify_password};
use super::extract::ApiJson;
use super::AppState;

async fn load_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .store
        .get_user(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

async fn profile_response(state: &AppState, user: User) -> AppResult<ProfileResponse> {
    let department_name = match user.department_id {
        Some(id) => state.store.get_department(id).await?.map(|d| d.name),
        None => None,
    };
    Ok(ProfileResponse {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        phone: user.phone,
        avatar_url: user.avatar_url,
        role: user.role,
        department_id: user.department_id,
        department_name,
        notification_email: user.notification_email,
        notification_push: user.notification_push,
        notification_status_updates: user.notification_status_updates,
        notification_comments: user.notification_comments,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let user = load_user(&state, &identity).await?;
    Ok(Json(ApiResponse::success(
        profile_response(&state, user).await?,
    )))
}

/// Update name, phone and notification preferences
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    input.validate()?;

    let mut user = load_user(&state, &identity).await?;
    if let Some(full_name) = input.full_name {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(AppError::validation("Full name cannot be empty"));
        }
        user.full_name = full_name.to_string();
    }
    if let Some(phone) = input.phone {
        user.phone = phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    }
    if let Some(v) = input.notification_email {
        user.notification_email = v;
    }
    if let Some(v) = input.notification_push {
        user.notification_push = v;
    }
    if let Some(v) = input.notification_status_updates {
        user.notification_status_updates = v;
    }
    if let Some(v) = input.notification_comments {
        user.notification_comments = v;
    }
    user.updated_at = Utc::now();
    let user = state.store.update_user(&user).await?;

    tracing::info!("User {} updated their profile", user.id);

    Ok(Json(ApiResponse::success(
        profile_response(&state, user).await?,
    )))
}

/// Replace the caller's avatar with a single uploaded image
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut multipart = multipart?;
    let mut user = load_user(&state, &identity).await?;

    let form = read_upload_form(&mut multipart, "avatar", 1, state.max_image_size).await?;
    validate_file_count(form.images.len(), 1)?;

    let subdir = PathBuf::from("avatars").join(user.id.to_string());
    let stored = store_images(&state, &subdir, &form.images).await?;
    let Some(file) = stored.first() else {
        return Err(AppError::internal("Avatar was not stored"));
    };

    user.avatar_url = Some(file.url.clone());
    user.updated_at = Utc::now();
    let user = match state.store.update_user(&user).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to save avatar for user {}: {}", identity.id, e);
            remove_files(&stored).await;
            return Err(e);
        }
    };

    tracing::info!("User {} uploaded a new avatar", user.id);

    Ok(Json(ApiResponse::success(
        profile_response(&state, user).await?,
    )))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    input.validate()?;

    let mut user = load_user(&state, &identity).await?;
    if !verify_password(&input.current_password, &user.password_hash)? {
        tracing::warn!("Password change with wrong current password for {}", user.id);
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    user.password_hash = hash_password(&input.new_password)?;
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;

    tracing::info!("User {} changed their password", user.id);

    Ok(Json(ApiResponse::success(())))
}

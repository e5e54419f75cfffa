//! System settings handlers

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{authorize, Identity};
use axum::{extract::State, Extension, Json};

use super::extract::ApiJson;
use super::AppState;

/// Recognized toggles with defaults applied
pub async fn get_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<SettingsResponse>>> {
    let rows = state.store.list_settings().await?;
    Ok(Json(ApiResponse::success(SettingsResponse::from_rows(&rows))))
}

/// Upsert one toggle (admin)
pub async fn update_setting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<UpdateSettingRequest>,
) -> AppResult<Json<ApiResponse<SettingsResponse>>> {
    authorize(&identity, &[Role::Admin])?;

    let key = input.key.trim();
    if key.is_empty() {
        return Err(AppError::validation("Setting key is required"));
    }
    let value = if input.value { "true" } else { "false" };
    state.store.upsert_setting(key, value).await?;

    tracing::info!("Admin {} set {} = {}", identity.id, key, value);

    let rows = state.store.list_settings().await?;
    Ok(Json(ApiResponse::success(SettingsResponse::from_rows(&rows))))
}

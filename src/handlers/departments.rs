//! Department administration handlers (admin only)

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{authorize, Identity};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::extract::{ApiJson, ApiPath};
use super::AppState;

pub async fn list_departments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<Vec<Department>>>> {
    authorize(&identity, &[Role::Admin])?;
    Ok(Json(ApiResponse::success(
        state.store.list_departments().await?,
    )))
}

pub async fn create_department(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<CreateDepartment>,
) -> AppResult<(StatusCode, Json<ApiResponse<Department>>)> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    let department = Department {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        code: input.code.trim().to_uppercase(),
        description: input.description.filter(|d| !d.trim().is_empty()),
        created_at: Utc::now(),
    };
    let department = state.store.create_department(&department).await?;

    tracing::info!(
        "Admin {} created department {} ({})",
        identity.id,
        department.code,
        department.id
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(department))))
}

pub async fn update_department(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateDepartment>,
) -> AppResult<Json<ApiResponse<Department>>> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    let mut department = state
        .store
        .get_department(id)
        .await?
        .ok_or_else(|| AppError::not_found("Department not found"))?;

    if let Some(name) = input.name {
        department.name = name.trim().to_string();
    }
    if let Some(code) = input.code {
        department.code = code.trim().to_uppercase();
    }
    if let Some(description) = input.description {
        department.description = description;
    }
    let department = state.store.update_department(&department).await?;

    tracing::info!("Admin {} updated department {}", identity.id, id);

    Ok(Json(ApiResponse::success(department)))
}

/// Delete a department; users and complaints keep existing without it
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&identity, &[Role::Admin])?;

    if !state.store.delete_department(id).await? {
        return Err(AppError::not_found("Department not found"));
    }

    tracing::info!("Admin {} deleted department {}", identity.id, id);

    Ok(Json(ApiResponse::success(())))
}

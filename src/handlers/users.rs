//! User administration handlers (admin only)

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{authorize, Identity};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::auth::hash_password;
use super::extract::{ApiJson, ApiPath};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    #[serde(alias = "departmentId")]
    pub department_id: Option<Uuid>,
}

/// Enforce the role/department invariant, returning the department to store.
async fn resolve_department(
    state: &AppState,
    role: Role,
    department_id: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    if !role.is_department_staff() {
        return Ok(None);
    }
    let department_id = department_id.ok_or_else(|| {
        AppError::validation("Officers and department heads need a department")
    })?;
    if state.store.get_department(department_id).await?.is_none() {
        return Err(AppError::not_found("Department not found"));
    }
    Ok(Some(department_id))
}

/// All users with their department names
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<Vec<UserListItem>>>> {
    authorize(&identity, &[Role::Admin])?;
    Ok(Json(ApiResponse::success(state.store.list_users().await?)))
}

/// Create a user with any role
pub async fn create_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    let email = input.email.trim().to_lowercase();
    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("Email is already registered"));
    }

    let role = input.role.unwrap_or(Role::Citizen);
    let department_id = resolve_department(&state, role, input.department_id).await?;

    let mut user = User::new(
        email,
        hash_password(&input.password)?,
        input.full_name.trim().to_string(),
        role,
        department_id,
    );
    user.phone = input.phone.filter(|p| !p.trim().is_empty());
    let user = state.store.create_user(&user).await?;

    tracing::info!(
        "Admin {} created user {} with role {:?}",
        identity.id,
        user.id,
        user.role
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

async fn apply_user_change(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    input: UpdateUserRequest,
) -> AppResult<UserResponse> {
    authorize(identity, &[Role::Admin])?;

    let mut user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let role = input.role.unwrap_or(user.role);
    let requested_department = match input.department_id {
        Some(department_id) => department_id,
        None => user.department_id,
    };

    user.department_id = resolve_department(state, role, requested_department).await?;
    user.role = role;
    user.updated_at = Utc::now();
    let user = state.store.update_user(&user).await?;

    tracing::info!(
        "Admin {} set user {} to role {:?}, department {:?}",
        identity.id,
        user.id,
        user.role,
        user.department_id
    );

    Ok(user.into())
}

/// Change a user's role and/or department
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if input.role.is_none() && input.department_id.is_none() {
        return Err(AppError::validation("No changes supplied"));
    }
    let user = apply_user_change(&state, &identity, id, input).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Change only a user's role
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RoleRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let change = UpdateUserRequest {
        role: Some(input.role),
        department_id: None,
    };
    let user = apply_user_change(&state, &identity, id, change).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Change only a user's department
pub async fn update_user_department(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<DepartmentRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let change = UpdateUserRequest {
        role: None,
        department_id: Some(input.department_id),
    };
    let user = apply_user_change(&state, &identity, id, change).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Delete a user; their references elsewhere become null
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&identity, &[Role::Admin])?;

    if id == identity.id {
        return Err(AppError::validation("You cannot delete your own account"));
    }
    if !state.store.delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }

    tracing::info!("Admin {} deleted user {}", identity.id, id);

    Ok(Json(ApiResponse::success(())))
}

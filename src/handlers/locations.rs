//! Geographic taxonomy and department lookups

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{authorize, Identity};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::extract::{ApiJson, ApiQuery};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct WardFilter {
    #[serde(alias = "zoneId")]
    pub zone_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AreaFilter {
    #[serde(alias = "wardId")]
    pub ward_id: Option<Uuid>,
}

/// Department entry for pickers
#[derive(Debug, Serialize)]
pub struct DepartmentOption {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

pub async fn list_zones(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Zone>>>> {
    Ok(Json(ApiResponse::success(state.store.list_zones().await?)))
}

pub async fn list_wards(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<WardFilter>,
) -> AppResult<Json<ApiResponse<Vec<Ward>>>> {
    Ok(Json(ApiResponse::success(
        state.store.list_wards(filter.zone_id).await?,
    )))
}

pub async fn list_areas(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<AreaFilter>,
) -> AppResult<Json<ApiResponse<Vec<Area>>>> {
    Ok(Json(ApiResponse::success(
        state.store.list_areas(filter.ward_id).await?,
    )))
}

/// Departments for any authenticated user
pub async fn department_options(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentOption>>>> {
    let options = state
        .store
        .list_departments()
        .await?
        .into_iter()
        .map(|d| DepartmentOption {
            id: d.id,
            name: d.name,
            code: d.code,
        })
        .collect();
    Ok(Json(ApiResponse::success(options)))
}

pub async fn create_zone(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<CreateZone>,
) -> AppResult<(StatusCode, Json<ApiResponse<Zone>>)> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    let zone = Zone {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        code: input.code.trim().to_string(),
    };
    let zone = state.store.create_zone(&zone).await?;
    tracing::info!("Admin {} created zone {}", identity.id, zone.code);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(zone))))
}

pub async fn create_ward(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<CreateWard>,
) -> AppResult<(StatusCode, Json<ApiResponse<Ward>>)> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    if state.store.get_zone(input.zone_id).await?.is_none() {
        return Err(AppError::not_found("Zone not found"));
    }
    let ward = Ward {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        code: input.code.trim().to_string(),
        zone_id: input.zone_id,
    };
    let ward = state.store.create_ward(&ward).await?;
    tracing::info!("Admin {} created ward {}", identity.id, ward.code);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(ward))))
}

pub async fn create_area(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(input): ApiJson<CreateArea>,
) -> AppResult<(StatusCode, Json<ApiResponse<Area>>)> {
    authorize(&identity, &[Role::Admin])?;
    input.validate()?;

    if state.store.get_ward(input.ward_id).await?.is_none() {
        return Err(AppError::not_found("Ward not found"));
    }
    let area = Area {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        code: input.code.trim().to_string(),
        ward_id: input.ward_id,
    };
    let area = state.store.create_area(&area).await?;
    tracing::info!("Admin {} created area {}", identity.id, area.code);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(area))))
}

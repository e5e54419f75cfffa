//! Read-only public documents and municipal projects

use crate::error::AppResult;
use crate::models::{ApiResponse, Document, ProjectView};
use axum::{extract::State, Json};

use super::AppState;

pub async fn list_documents(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Document>>>> {
    Ok(Json(ApiResponse::success(state.store.list_documents().await?)))
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ProjectView>>>> {
    Ok(Json(ApiResponse::success(state.store.list_projects().await?)))
}

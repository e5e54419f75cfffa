//! Comment thread handlers

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{ensure_can_view, Identity};
use crate::validation::validate_comment;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use super::AppState;

async fn visible_complaint(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let view = state
        .store
        .get_complaint(id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint not found"))?;
    ensure_can_view(identity, &view.complaint)
}

/// Comments on a complaint, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CommentResponse>>>> {
    visible_complaint(&state, &identity, id).await?;
    let comments = state
        .store
        .list_comments(id)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(comments)))
}

/// Append a comment
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AddCommentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CommentResponse>>)> {
    validate_comment(&input.content)?;
    visible_complaint(&state, &identity, id).await?;

    let comment = ComplaintComment {
        id: Uuid::new_v4(),
        complaint_id: id,
        user_id: Some(identity.id),
        content: input.content.trim().to_string(),
        is_internal: false,
        created_at: Utc::now(),
    };
    state.store.insert_comment(&comment).await?;

    tracing::info!("User {} commented on complaint {}", identity.id, id);

    let response = CommentResponse::from(CommentView {
        comment,
        author_name: Some(identity.full_name.clone()),
    });
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

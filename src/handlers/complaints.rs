//! Complaint handlers

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::{
    apply_update, authorize, complaint_number, ensure_can_view, monthly_buckets,
    monthly_window_start, ComplaintScope, Identity,
};
use crate::validation::{parse_optional_f64, parse_optional_uuid, validate_new_complaint};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Datelike, Utc};
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

use super::attachments::{
    complaint_dir, image_rows, read_upload_form, remove_files, store_images, UploadForm,
};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;

// =============================================================================
// Helpers
// =============================================================================

/// Attach images to one complaint view.
pub async fn complaint_response(
    state: &AppState,
    view: ComplaintView,
) -> AppResult<ComplaintResponse> {
    let images = state.store.list_images(&[view.complaint.id]).await?;
    Ok(ComplaintResponse::new(view, images))
}

/// Attach images to many complaint views with a single batch fetch.
async fn complaint_responses(
    state: &AppState,
    views: Vec<ComplaintView>,
) -> AppResult<Vec<ComplaintResponse>> {
    let ids: Vec<Uuid> = views.iter().map(|v| v.complaint.id).collect();
    let mut images_by_complaint: HashMap<Uuid, Vec<ComplaintImage>> = HashMap::new();
    for image in state.store.list_images(&ids).await? {
        images_by_complaint
            .entry(image.complaint_id)
            .or_default()
            .push(image);
    }

    Ok(views
        .into_iter()
        .map(|view| {
            let images = images_by_complaint
                .remove(&view.complaint.id)
                .unwrap_or_default();
            ComplaintResponse::new(view, images)
        })
        .collect())
}

async fn load_complaint(state: &AppState, id: Uuid) -> AppResult<ComplaintView> {
    state
        .store
        .get_complaint(id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint not found"))
}

/// Build and check the filing input from multipart text fields.
async fn new_complaint_from_form(state: &AppState, form: &UploadForm) -> AppResult<NewComplaint> {
    let text = |name: &str| form.field(name).map(|v| v.trim().to_string());
    let optional_text = |name: &str| text(name).filter(|v| !v.is_empty());

    let mut input = NewComplaint {
        title: text("title").unwrap_or_default(),
        description: text("description").unwrap_or_default(),
        category: text("category").unwrap_or_default(),
        address: optional_text("address"),
        department_id: parse_optional_uuid("department_id", form.field("department_id"))?,
        zone_id: parse_optional_uuid("zone_id", form.field("zone_id"))?,
        ward_id: parse_optional_uuid("ward_id", form.field("ward_id"))?,
        area_id: parse_optional_uuid("area_id", form.field("area_id"))?,
        latitude: parse_optional_f64("latitude", form.field("latitude"))?,
        longitude: parse_optional_f64("longitude", form.field("longitude"))?,
    };
    validate_new_complaint(&input)?;

    if let Some(department_id) = input.department_id {
        if state.store.get_department(department_id).await?.is_none() {
            return Err(AppError::not_found("Department not found"));
        }
    }

    // Fill parents from children and reject mismatched hierarchies
    if let Some(area_id) = input.area_id {
        let area = state
            .store
            .get_area(area_id)
            .await?
            .ok_or_else(|| AppError::not_found("Area not found"))?;
        match input.ward_id {
            Some(ward_id) if ward_id != area.ward_id => {
                return Err(AppError::validation("Area does not belong to the given ward"))
            }
            _ => input.ward_id = Some(area.ward_id),
        }
    }
    if let Some(ward_id) = input.ward_id {
        let ward = state
            .store
            .get_ward(ward_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ward not found"))?;
        match input.zone_id {
            Some(zone_id) if zone_id != ward.zone_id => {
                return Err(AppError::validation("Ward does not belong to the given zone"))
            }
            _ => input.zone_id = Some(ward.zone_id),
        }
    }
    if let Some(zone_id) = input.zone_id {
        if state.store.get_zone(zone_id).await?.is_none() {
            return Err(AppError::not_found("Zone not found"));
        }
    }

    Ok(input)
}

// =============================================================================
// Read Endpoints
// =============================================================================

/// List complaints visible to the caller
pub async fn list_complaints(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiQuery(query): ApiQuery<ListComplaintsQuery>,
) -> AppResult<Json<ApiResponse<Vec<ComplaintResponse>>>> {
    let scope = ComplaintScope::for_identity(&identity);
    let views = state.store.list_complaints(scope, query.sort).await?;
    let responses = complaint_responses(&state, views).await?;
    Ok(Json(ApiResponse::success(responses)))
}

/// Get one complaint with its images
pub async fn get_complaint(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<ComplaintResponse>>> {
    let view = load_complaint(&state, id).await?;
    ensure_can_view(&identity, &view.complaint)?;
    Ok(Json(ApiResponse::success(
        complaint_response(&state, view).await?,
    )))
}

/// Counts per status for the caller's scope
pub async fn complaint_stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<StatusCounts>>> {
    let scope = ComplaintScope::for_identity(&identity);
    let counts = state.store.status_counts(scope).await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// Complaints created per month over the trailing six months
pub async fn monthly_stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<Vec<MonthlyCount>>>> {
    let now = Utc::now();
    let scope = ComplaintScope::for_identity(&identity);
    let created = state
        .store
        .created_since(scope, monthly_window_start(now))
        .await?;
    Ok(Json(ApiResponse::success(monthly_buckets(now, &created))))
}

/// Staff available for assignment
pub async fn list_officers(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiQuery(query): ApiQuery<OfficersQuery>,
) -> AppResult<Json<ApiResponse<Vec<OfficerResponse>>>> {
    authorize(&identity, &[Role::Admin, Role::Officer, Role::DepartmentHead])?;

    // Staff only ever see colleagues from their own department
    let department_id = if identity.is_admin() {
        query.department_id
    } else {
        match identity.department_id {
            Some(own) => Some(own),
            None => return Ok(Json(ApiResponse::success(Vec::new()))),
        }
    };

    let officers = state
        .store
        .list_staff(department_id)
        .await?
        .into_iter()
        .map(|u| OfficerResponse {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            department_id: u.department_id,
        })
        .collect();
    Ok(Json(ApiResponse::success(officers)))
}

// =============================================================================
// Write Endpoints
// =============================================================================

/// File a complaint (multipart: text fields plus optional `images`)
pub async fn create_complaint(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<ComplaintResponse>>)> {
    authorize(&identity, &[Role::Citizen, Role::Admin])?;
    let mut multipart = multipart?;

    let form = read_upload_form(
        &mut multipart,
        "images",
        state.max_images_per_request,
        state.max_image_size,
    )
    .await?;
    let input = new_complaint_from_form(&state, &form).await?;

    // Admins may file on behalf of a citizen
    let reporter_id = match parse_optional_uuid("reporter_id", form.field("reporter_id"))? {
        Some(reporter_id) if identity.is_admin() => {
            let reporter = state
                .store
                .get_user(reporter_id)
                .await?
                .ok_or_else(|| AppError::not_found("Reporter not found"))?;
            if reporter.role != Role::Citizen {
                return Err(AppError::validation("Reporter must be a citizen"));
            }
            reporter.id
        }
        Some(_) => {
            return Err(AppError::forbidden(
                "Only an admin can file on behalf of someone else",
            ))
        }
        None => identity.id,
    };

    let now = Utc::now();
    let seq = state.store.next_complaint_seq(now.year()).await?;
    let complaint = Complaint {
        id: Uuid::new_v4(),
        complaint_number: complaint_number(now.year(), seq),
        user_id: Some(reporter_id),
        title: input.title,
        description: input.description,
        category: input.category,
        status: ComplaintStatus::Pending,
        priority: Priority::Medium,
        department_id: input.department_id,
        assigned_to: None,
        zone_id: input.zone_id,
        ward_id: input.ward_id,
        area_id: input.area_id,
        address: input.address,
        latitude: input.latitude,
        longitude: input.longitude,
        resolved_at: None,
        department_decision: DepartmentDecision::Undecided,
        accepted_at: None,
        cost_estimated_amount: None,
        cost_materials: None,
        cost_labor: None,
        cost_status: CostStatus::Pending,
        cost_submitted_at: None,
        cost_approved_by: None,
        completion_remarks: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    let stored = store_images(&state, &complaint_dir(complaint.id), &form.images).await?;
    let images = image_rows(
        complaint.id,
        &stored,
        form.all("captions"),
        ImagePhase::General,
    );

    if let Err(e) = state.store.insert_complaint(&complaint, &images).await {
        tracing::error!("Failed to store complaint {}: {}", complaint.complaint_number, e);
        remove_files(&stored).await;
        return Err(e);
    }

    tracing::info!(
        "User {} filed complaint {} with {} image(s)",
        identity.id,
        complaint.complaint_number,
        images.len()
    );

    let view = load_complaint(&state, complaint.id).await?;
    let response = complaint_response(&state, view).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Apply lifecycle transitions to a complaint
pub async fn update_complaint(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ComplaintUpdate>,
) -> AppResult<Json<ApiResponse<ComplaintResponse>>> {
    let view = load_complaint(&state, id).await?;
    let current = &view.complaint;
    ensure_can_view(&identity, current)?;

    if let Some(Some(department_id)) = update.department_id {
        if state.store.get_department(department_id).await?.is_none() {
            return Err(AppError::not_found("Department not found"));
        }
    }
    let assignee = match update.assigned_to {
        Some(Some(user_id)) => Some(
            state
                .store
                .get_user(user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Assignee not found"))?,
        ),
        _ => None,
    };

    let next = apply_update(&identity, current, &update, assignee.as_ref(), Utc::now())?;
    state.store.update_complaint(&next).await?;

    tracing::info!(
        "User {} updated complaint {} (status {:?}, decision {:?}, cost {:?})",
        identity.id,
        next.complaint_number,
        next.status,
        next.department_decision,
        next.cost_status
    );

    let view = load_complaint(&state, id).await?;
    Ok(Json(ApiResponse::success(
        complaint_response(&state, view).await?,
    )))
}

/// Delete a complaint with its images, comments and stored files (admin)
pub async fn delete_complaint(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&identity, &[Role::Admin])?;

    if !state.store.delete_complaint(id).await? {
        return Err(AppError::not_found("Complaint not found"));
    }

    let dir = state.upload_dir.join(complaint_dir(id));
    if fs::try_exists(&dir).await.unwrap_or(false) {
        if let Err(e) = fs::remove_dir_all(&dir).await {
            tracing::warn!("Failed to remove files for complaint {}: {}", id, e);
        }
    }

    tracing::info!("Admin {} deleted complaint {}", identity.id, id);

    Ok(Json(ApiResponse::success(())))
}

//! Image uploads: multipart parsing, validation and on-disk storage

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::Identity;
use crate::validation::{validate_file_count, validate_image_upload, ValidationError};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::complaints::complaint_response;
use super::extract::ApiPath;
use super::AppState;

// =============================================================================
// Multipart Parsing
// =============================================================================

/// An uploaded image that passed type and size checks.
pub struct ValidatedImage {
    pub data: Bytes,
    pub extension: &'static str,
}

/// Text fields and image parts of a multipart request.
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, Vec<String>>,
    pub images: Vec<ValidatedImage>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    tracing::warn!("Multipart parsing error: {}", e);
    if e.to_string().contains("length limit") {
        AppError::validation("Upload too large")
    } else {
        AppError::validation(format!("Failed to process upload: {}", e))
    }
}

/// Read every part; parts named `file_field` are validated as images.
///
/// Everything is checked before anything is written to disk.
pub async fn read_upload_form(
    multipart: &mut Multipart,
    file_field: &str,
    max_files: usize,
    max_size: usize,
) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            if form.images.len() >= max_files {
                return Err(ValidationError::TooManyFiles { max: max_files }.into());
            }
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            let extension = validate_image_upload(&content_type, &data, max_size)?;
            form.images.push(ValidatedImage { data, extension });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.entry(name).or_default().push(value);
        }
    }

    Ok(form)
}

// =============================================================================
// Storage
// =============================================================================

pub struct StoredFile {
    pub path: PathBuf,
    pub url: String,
}

fn random_file_name(extension: &str) -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    format!("{}.{}", hex::encode(bytes), extension)
}

/// Write images under `<upload_dir>/<subdir>/` with random names.
///
/// On failure the files already written by this call are removed.
pub async fn store_images(
    state: &AppState,
    subdir: &FsPath,
    images: &[ValidatedImage],
) -> AppResult<Vec<StoredFile>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let dir = state.upload_dir.join(subdir);
    if let Err(e) = fs::create_dir_all(&dir).await {
        tracing::error!("Failed to create upload directory {:?}: {}", dir, e);
        return Err(AppError::internal("Failed to store uploaded files"));
    }

    let mut stored: Vec<StoredFile> = Vec::with_capacity(images.len());
    for image in images {
        let name = random_file_name(image.extension);
        let path = dir.join(&name);
        if let Err(e) = fs::write(&path, &image.data).await {
            tracing::error!("Failed to write file {:?}: {}", path, e);
            remove_files(&stored).await;
            return Err(AppError::internal("Failed to store uploaded files"));
        }
        let relative = subdir.join(&name);
        let url = format!(
            "{}/uploads/{}",
            state.public_base_url,
            relative.to_string_lossy().replace('\\', "/")
        );
        stored.push(StoredFile { path, url });
    }

    Ok(stored)
}

/// Best-effort cleanup of files whose metadata was not persisted
pub async fn remove_files(files: &[StoredFile]) {
    for file in files {
        if let Err(e) = fs::remove_file(&file.path).await {
            tracing::warn!("Failed to clean up orphaned file {:?}: {}", file.path, e);
        }
    }
}

pub fn complaint_dir(complaint_id: Uuid) -> PathBuf {
    PathBuf::from("complaints").join(complaint_id.to_string())
}

/// Image rows for stored files, pairing captions by position.
pub fn image_rows(
    complaint_id: Uuid,
    files: &[StoredFile],
    captions: &[String],
    phase: ImagePhase,
) -> Vec<ComplaintImage> {
    let now = Utc::now();
    files
        .iter()
        .enumerate()
        .map(|(i, file)| ComplaintImage {
            id: Uuid::new_v4(),
            complaint_id,
            url: file.url.clone(),
            caption: captions
                .get(i)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            phase,
            created_at: now,
        })
        .collect()
}

// =============================================================================
// Endpoint
// =============================================================================

/// Attach images to an existing complaint
pub async fn upload_images(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<ComplaintResponse>>> {
    let mut multipart = multipart?;
    let view = state
        .store
        .get_complaint(id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint not found"))?;
    let complaint = &view.complaint;

    let is_reporter =
        identity.role == Role::Citizen && complaint.user_id == Some(identity.id);
    if !identity.is_admin() && !identity.is_staff_of(complaint.department_id) && !is_reporter {
        return Err(AppError::forbidden(
            "You cannot add images to this complaint",
        ));
    }

    let form = read_upload_form(
        &mut multipart,
        "images",
        state.max_images_per_request,
        state.max_image_size,
    )
    .await?;

    let phase = match form.field("phase").or_else(|| form.field("type")) {
        None | Some("") => ImagePhase::General,
        Some(raw) => raw
            .parse::<ImagePhase>()
            .map_err(|_| ValidationError::InvalidPhase)?,
    };
    if is_reporter && phase != ImagePhase::General {
        return Err(AppError::forbidden(
            "Only the department can upload before and after photos",
        ));
    }
    validate_file_count(form.images.len(), state.max_images_per_request)?;

    let stored = store_images(&state, &complaint_dir(id), &form.images).await?;
    let rows = image_rows(id, &stored, form.all("captions"), phase);
    if let Err(e) = state.store.insert_images(&rows).await {
        tracing::error!("Failed to store image metadata for complaint {}: {}", id, e);
        remove_files(&stored).await;
        return Err(e);
    }

    tracing::info!(
        "User {} uploaded {} {:?} image(s) to complaint {}",
        identity.id,
        rows.len(),
        phase,
        id
    );

    let response = complaint_response(&state, view).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_file_name() {
        let a = random_file_name("png");
        let b = random_file_name("png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 32 + 4);
    }

    #[test]
    fn test_image_rows_pair_captions_by_position() {
        let id = Uuid::new_v4();
        let files = vec![
            StoredFile {
                path: PathBuf::from("a.png"),
                url: "/uploads/a.png".to_string(),
            },
            StoredFile {
                path: PathBuf::from("b.png"),
                url: "/uploads/b.png".to_string(),
            },
        ];
        let rows = image_rows(id, &files, &["Front view".to_string()], ImagePhase::Before);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].caption.as_deref(), Some("Front view"));
        assert_eq!(rows[1].caption, None);
        assert!(rows.iter().all(|r| r.phase == ImagePhase::Before && r.complaint_id == id));
    }

    #[test]
    fn test_complaint_dir() {
        let id = Uuid::new_v4();
        assert_eq!(
            complaint_dir(id),
            PathBuf::from(format!("complaints/{}", id))
        );
    }
}

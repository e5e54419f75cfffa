//! Input validation module

use crate::models::NewComplaint;
use thiserror::Error;
use uuid::Uuid;

/// Image types accepted for complaint photos and avatars
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' is invalid: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Invalid file type: {mime_type}")]
    InvalidFileType { mime_type: String },

    #[error("File too large (max {max_mb} MB)")]
    FileTooLarge { max_mb: usize },

    #[error("Too many files (max {max} per request)")]
    TooManyFiles { max: usize },

    #[error("No images uploaded")]
    NoFiles,

    #[error("Image type must be before, after, or general")]
    InvalidPhase,
}

fn required(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validate a complaint filing request
pub fn validate_new_complaint(input: &NewComplaint) -> Result<(), ValidationError> {
    required("title", &input.title, 255)?;
    required("description", &input.description, 5000)?;
    required("category", &input.category, 100)?;

    if let Some(ref address) = input.address {
        if address.chars().count() > 500 {
            return Err(ValidationError::TooLong {
                field: "address".to_string(),
                max: 500,
            });
        }
    }

    if let Some(lat) = input.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::Invalid {
                field: "latitude".to_string(),
                reason: "must be between -90 and 90".to_string(),
            });
        }
    }
    if let Some(lng) = input.longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::Invalid {
                field: "longitude".to_string(),
                reason: "must be between -180 and 180".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate comment content
pub fn validate_comment(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "content".to_string(),
        });
    }
    if content.chars().count() > 5000 {
        return Err(ValidationError::TooLong {
            field: "content".to_string(),
            max: 5000,
        });
    }
    Ok(())
}

/// Validate a cost estimate amount
pub fn validate_cost_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::Invalid {
            field: "cost_estimated_amount".to_string(),
            reason: "must be a non-negative number".to_string(),
        });
    }
    Ok(())
}

/// Parse an optional id from a form field; blank means absent
pub fn parse_optional_uuid(field: &str, value: Option<&str>) -> Result<Option<Uuid>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| ValidationError::Invalid {
            field: field.to_string(),
            reason: "not a valid id".to_string(),
        }),
    }
}

/// Parse an optional number from a form field; blank means absent
pub fn parse_optional_f64(field: &str, value: Option<&str>) -> Result<Option<f64>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ValidationError::Invalid {
                field: field.to_string(),
                reason: "not a number".to_string(),
            }),
    }
}

/// Validate the number of files in one upload request
pub fn validate_file_count(count: usize, max: usize) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::NoFiles);
    }
    if count > max {
        return Err(ValidationError::TooManyFiles { max });
    }
    Ok(())
}

/// Validate an uploaded image and return the file extension to store it under.
///
/// Both the declared content type and the sniffed magic bytes must name an
/// allowed image type.
pub fn validate_image_upload(
    declared_mime: &str,
    data: &[u8],
    max_size_bytes: usize,
) -> Result<&'static str, ValidationError> {
    if data.len() > max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            max_mb: max_size_bytes / (1024 * 1024),
        });
    }

    let declared = declared_mime.to_ascii_lowercase();
    let declared = if declared == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        declared
    };
    if !ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
        return Err(ValidationError::InvalidFileType {
            mime_type: declared_mime.to_string(),
        });
    }

    let detected = infer::get(data).ok_or_else(|| ValidationError::InvalidFileType {
        mime_type: "unrecognized content".to_string(),
    })?;
    if !ALLOWED_IMAGE_TYPES.contains(&detected.mime_type()) {
        return Err(ValidationError::InvalidFileType {
            mime_type: detected.mime_type().to_string(),
        });
    }

    Ok(detected.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];

    fn complaint() -> NewComplaint {
        NewComplaint {
            title: "Pothole on Main St".to_string(),
            description: "Deep pothole near the bus stop".to_string(),
            category: "roads".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_new_complaint_valid() {
        assert!(validate_new_complaint(&complaint()).is_ok());
    }

    #[test]
    fn test_validate_new_complaint_missing_title() {
        let input = NewComplaint {
            title: "  ".to_string(),
            ..complaint()
        };
        assert_eq!(
            validate_new_complaint(&input),
            Err(ValidationError::Required {
                field: "title".to_string()
            })
        );
    }

    #[test]
    fn test_validate_new_complaint_missing_category() {
        let input = NewComplaint {
            category: String::new(),
            ..complaint()
        };
        assert!(matches!(
            validate_new_complaint(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_new_complaint_bad_coordinates() {
        let input = NewComplaint {
            latitude: Some(91.0),
            ..complaint()
        };
        assert!(matches!(
            validate_new_complaint(&input),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment("Still not fixed").is_ok());
        assert!(validate_comment("   ").is_err());
    }

    #[test]
    fn test_validate_cost_amount() {
        assert!(validate_cost_amount(5000.0).is_ok());
        assert!(validate_cost_amount(0.0).is_ok());
        assert!(validate_cost_amount(-1.0).is_err());
        assert!(validate_cost_amount(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_optional_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_optional_uuid("ward_id", Some(&id.to_string())),
            Ok(Some(id))
        );
        assert_eq!(parse_optional_uuid("ward_id", Some("")), Ok(None));
        assert_eq!(parse_optional_uuid("ward_id", None), Ok(None));
        assert!(parse_optional_uuid("ward_id", Some("not-an-id")).is_err());
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64("latitude", Some("12.5")), Ok(Some(12.5)));
        assert_eq!(parse_optional_f64("latitude", Some(" ")), Ok(None));
        assert!(parse_optional_f64("latitude", Some("north")).is_err());
    }

    #[test]
    fn test_validate_file_count() {
        assert_eq!(validate_file_count(0, 10), Err(ValidationError::NoFiles));
        assert!(validate_file_count(3, 10).is_ok());
        assert_eq!(
            validate_file_count(11, 10),
            Err(ValidationError::TooManyFiles { max: 10 })
        );
    }

    #[test]
    fn test_validate_image_upload_valid_png() {
        assert_eq!(validate_image_upload("image/png", PNG, 1024), Ok("png"));
    }

    #[test]
    fn test_validate_image_upload_jpg_alias() {
        assert_eq!(validate_image_upload("image/jpg", JPEG, 1024), Ok("jpg"));
    }

    #[test]
    fn test_validate_image_upload_too_large() {
        assert!(matches!(
            validate_image_upload("image/png", PNG, 4),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_image_upload_declared_type_rejected() {
        assert!(matches!(
            validate_image_upload("application/pdf", PNG, 1024),
            Err(ValidationError::InvalidFileType { .. })
        ));
    }

    #[test]
    fn test_validate_image_upload_content_mismatch() {
        // Claims to be a PNG but the bytes are plain text
        assert!(matches!(
            validate_image_upload("image/png", b"<?php echo 1; ?>", 1024),
            Err(ValidationError::InvalidFileType { .. })
        ));
    }
}

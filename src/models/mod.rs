//! Data models for the application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "app_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Officer,
    DepartmentHead,
    Admin,
}

impl Role {
    /// Officers and department heads act on behalf of a department.
    pub fn is_department_staff(self) -> bool {
        matches!(self, Role::Officer | Role::DepartmentHead)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    OnHold,
    Resolved,
    Rejected,
    Closed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 6] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InProgress,
        ComplaintStatus::OnHold,
        ComplaintStatus::Resolved,
        ComplaintStatus::Rejected,
        ComplaintStatus::Closed,
    ];
}

/// Declared from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "priority_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Sort key placing the most urgent complaints first.
    pub fn urgency_rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cost_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CostStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
}

/// Whether the routed department has taken the complaint on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "department_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DepartmentDecision {
    Undecided,
    Accepted,
    Rejected,
}

impl DepartmentDecision {
    /// Legacy nullable-boolean view used by existing clients.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            DepartmentDecision::Undecided => None,
            DepartmentDecision::Accepted => Some(true),
            DepartmentDecision::Rejected => Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "image_phase", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImagePhase {
    Before,
    After,
    General,
}

impl std::str::FromStr for ImagePhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "before" => Ok(ImagePhase::Before),
            "after" => Ok(ImagePhase::After),
            "general" => Ok(ImagePhase::General),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintSort {
    #[default]
    Date,
    Priority,
    Area,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub department_id: Option<Uuid>,
    pub role: Role,
    pub notification_email: bool,
    pub notification_push: bool,
    pub notification_status_updates: bool,
    pub notification_comments: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        full_name: String,
        role: Role,
        department_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            full_name,
            phone: None,
            avatar_url: None,
            department_id,
            role,
            notification_email: false,
            notification_push: false,
            notification_status_updates: false,
            notification_comments: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            avatar_url: user.avatar_url,
            role: user.role,
            department_id: user.department_id,
            created_at: user.created_at,
        }
    }
}

/// Admin user listing row with the department name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct UserListItem {
    #[serde(flatten)]
    pub user: UserResponse,
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub notification_email: bool,
    pub notification_push: bool,
    pub notification_status_updates: bool,
    pub notification_comments: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Option<Role>,
    #[serde(alias = "departmentId")]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    #[serde(default, alias = "departmentId", deserialize_with = "deserialize_some")]
    pub department_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    pub notification_email: Option<bool>,
    pub notification_push: Option<bool>,
    pub notification_status_updates: Option<bool>,
    pub notification_comments: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

// =============================================================================
// Taxonomy
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDepartment {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDepartment {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ward {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub zone_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub ward_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateZone {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWard {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[serde(alias = "zoneId")]
    pub zone_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArea {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[serde(alias = "wardId")]
    pub ward_id: Uuid,
}

// =============================================================================
// Complaint
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct Complaint {
    pub id: Uuid,
    pub complaint_number: String,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ComplaintStatus,
    pub priority: Priority,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub ward_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub department_decision: DepartmentDecision,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cost_estimated_amount: Option<f64>,
    pub cost_materials: Option<String>,
    pub cost_labor: Option<String>,
    pub cost_status: CostStatus,
    pub cost_submitted_at: Option<DateTime<Utc>>,
    pub cost_approved_by: Option<Uuid>,
    pub completion_remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Complaint row joined with the display names of what it references.
#[derive(Debug, Clone, FromRow)]
pub struct ComplaintView {
    #[sqlx(flatten)]
    pub complaint: Complaint,
    pub department_name: Option<String>,
    pub zone_name: Option<String>,
    pub ward_name: Option<String>,
    pub area_name: Option<String>,
    pub reporter_name: Option<String>,
}

/// Validated input for filing a complaint, assembled from multipart fields.
#[derive(Debug, Clone, Default)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub category: String,
    pub address: Option<String>,
    pub department_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub ward_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Partial update sent with `PATCH /complaints/:id`.
///
/// Nullable routing fields use a double option: absent leaves the field alone,
/// `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintUpdate {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub department_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_to: Option<Option<Uuid>>,
    pub accepted_by_department: Option<bool>,
    pub cost_estimated_amount: Option<f64>,
    pub cost_materials: Option<String>,
    pub cost_labor: Option<String>,
    pub cost_status: Option<CostStatus>,
    pub completion_remarks: Option<String>,
}

impl ComplaintUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.department_id.is_none()
            && self.assigned_to.is_none()
            && self.accepted_by_department.is_none()
            && !self.touches_cost_fields()
            && self.cost_status.is_none()
            && self.completion_remarks.is_none()
    }

    pub fn touches_cost_fields(&self) -> bool {
        self.cost_estimated_amount.is_some()
            || self.cost_materials.is_some()
            || self.cost_labor.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintResponse {
    pub id: Uuid,
    pub complaint_number: String,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ComplaintStatus,
    pub priority: Priority,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub ward_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub department_name: Option<String>,
    pub zone_name: Option<String>,
    pub ward_name: Option<String>,
    pub area_name: Option<String>,
    pub reporter_name: Option<String>,
    pub images: Vec<ImageResponse>,
    pub department_decision: DepartmentDecision,
    pub accepted_by_department: Option<bool>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cost_estimated_amount: Option<f64>,
    pub cost_materials: Option<String>,
    pub cost_labor: Option<String>,
    pub cost_status: CostStatus,
    pub cost_submitted_at: Option<DateTime<Utc>>,
    pub cost_approved_by: Option<Uuid>,
    pub completion_remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ComplaintResponse {
    pub fn new(view: ComplaintView, images: Vec<ComplaintImage>) -> Self {
        let c = view.complaint;
        Self {
            id: c.id,
            complaint_number: c.complaint_number,
            user_id: c.user_id,
            title: c.title,
            description: c.description,
            category: c.category,
            status: c.status,
            priority: c.priority,
            department_id: c.department_id,
            assigned_to: c.assigned_to,
            zone_id: c.zone_id,
            ward_id: c.ward_id,
            area_id: c.area_id,
            address: c.address,
            latitude: c.latitude,
            longitude: c.longitude,
            resolved_at: c.resolved_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
            department_name: view.department_name,
            zone_name: view.zone_name,
            ward_name: view.ward_name,
            area_name: view.area_name,
            reporter_name: view.reporter_name,
            images: images.into_iter().map(ImageResponse::from).collect(),
            department_decision: c.department_decision,
            accepted_by_department: c.department_decision.as_flag(),
            accepted_at: c.accepted_at,
            cost_estimated_amount: c.cost_estimated_amount,
            cost_materials: c.cost_materials,
            cost_labor: c.cost_labor,
            cost_status: c.cost_status,
            cost_submitted_at: c.cost_submitted_at,
            cost_approved_by: c.cost_approved_by,
            completion_remarks: c.completion_remarks,
            completed_at: c.completed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListComplaintsQuery {
    #[serde(default)]
    pub sort: ComplaintSort,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub on_hold: i64,
    pub resolved: i64,
    pub rejected: i64,
    pub closed: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ComplaintStatus, count: i64) {
        self.total += count;
        let slot = match status {
            ComplaintStatus::Pending => &mut self.pending,
            ComplaintStatus::InProgress => &mut self.in_progress,
            ComplaintStatus::OnHold => &mut self.on_hold,
            ComplaintStatus::Resolved => &mut self.resolved,
            ComplaintStatus::Rejected => &mut self.rejected,
            ComplaintStatus::Closed => &mut self.closed,
        };
        *slot += count;
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: String,
    pub year: i32,
    pub complaints: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficersQuery {
    #[serde(alias = "departmentId")]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfficerResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

// =============================================================================
// Attachments
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ComplaintImage {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub phase: ImagePhase,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    #[serde(rename = "type")]
    pub phase: ImagePhase,
}

impl From<ComplaintImage> for ImageResponse {
    fn from(image: ComplaintImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
            caption: image.caption,
            phase: image.phase,
        }
    }
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ComplaintComment {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Option<Uuid>,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentView {
    #[sqlx(flatten)]
    pub comment: ComplaintComment,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Option<Uuid>,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        let c = view.comment;
        Self {
            id: c.id,
            complaint_id: c.complaint_id,
            user_id: c.user_id,
            content: c.content,
            is_internal: c.is_internal,
            created_at: c.created_at,
            author_name: view.author_name,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

pub const SETTING_AUTO_ASSIGN: &str = "auto_assign_complaints";
pub const SETTING_EMAIL_CONFIRMATIONS: &str = "email_confirmations";
pub const SETTING_MAINTENANCE_MODE: &str = "maintenance_mode";

#[derive(Debug, Clone, FromRow)]
pub struct SystemSetting {
    pub key: String,
    pub value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsResponse {
    pub auto_assign_complaints: bool,
    pub email_confirmations: bool,
    pub maintenance_mode: bool,
}

impl Default for SettingsResponse {
    fn default() -> Self {
        Self {
            auto_assign_complaints: true,
            email_confirmations: false,
            maintenance_mode: false,
        }
    }
}

impl SettingsResponse {
    /// Overlay stored rows on the defaults; unknown keys are ignored.
    pub fn from_rows(rows: &[SystemSetting]) -> Self {
        let mut settings = Self::default();
        for row in rows {
            let enabled = row.value.as_deref() == Some("true");
            match row.key.as_str() {
                SETTING_AUTO_ASSIGN => settings.auto_assign_complaints = enabled,
                SETTING_EMAIL_CONFIRMATIONS => settings.email_confirmations = enabled,
                SETTING_MAINTENANCE_MODE => settings.maintenance_mode = enabled,
                _ => {}
            }
        }
        settings
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSettingRequest {
    pub key: String,
    #[serde(default)]
    pub value: bool,
}

// =============================================================================
// Documents & Projects
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub file_url: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub ward_id: Option<Uuid>,
    pub ward_name: Option<String>,
    pub created_by: Option<Uuid>,
    pub budget: Option<f64>,
    pub progress: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: ComplaintUpdate = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(absent.assigned_to, None);

        let cleared: ComplaintUpdate = serde_json::from_str(r#"{"assigned_to":null}"#).unwrap();
        assert_eq!(cleared.assigned_to, Some(None));
        assert!(!cleared.is_empty());
    }

    #[test]
    fn test_empty_update() {
        let update: ComplaintUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_decision_flag() {
        assert_eq!(DepartmentDecision::Undecided.as_flag(), None);
        assert_eq!(DepartmentDecision::Accepted.as_flag(), Some(true));
        assert_eq!(DepartmentDecision::Rejected.as_flag(), Some(false));
    }

    #[test]
    fn test_settings_overlay_ignores_unknown_keys() {
        let now = Utc::now();
        let rows = vec![
            SystemSetting {
                key: SETTING_MAINTENANCE_MODE.to_string(),
                value: Some("true".to_string()),
                updated_at: now,
            },
            SystemSetting {
                key: SETTING_AUTO_ASSIGN.to_string(),
                value: Some("false".to_string()),
                updated_at: now,
            },
            SystemSetting {
                key: "dark_mode".to_string(),
                value: Some("true".to_string()),
                updated_at: now,
            },
        ];
        let settings = SettingsResponse::from_rows(&rows);
        assert!(settings.maintenance_mode);
        assert!(!settings.auto_assign_complaints);
        assert!(!settings.email_confirmations);
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.add(ComplaintStatus::Pending, 3);
        counts.add(ComplaintStatus::Resolved, 2);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.resolved, 2);
    }

    #[test]
    fn test_image_phase_parse() {
        assert_eq!("after".parse::<ImagePhase>(), Ok(ImagePhase::After));
        assert!("during".parse::<ImagePhase>().is_err());
    }

    #[test]
    fn test_priority_urgency() {
        let mut levels = vec![Priority::Low, Priority::Urgent, Priority::Medium, Priority::High];
        levels.sort_by_key(|p| p.urgency_rank());
        assert_eq!(
            levels,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
    }
}

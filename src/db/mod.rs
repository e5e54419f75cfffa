//! Persistence layer
//!
//! Handlers talk to a [`Store`]; `PgStore` backs production and
//! `MemoryStore` backs local demos and the router tests.

mod memory;
mod pool;
mod postgres;

pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations};
pub use postgres::PgStore;

use crate::error::AppResult;
use crate::models::*;
use crate::policy::ComplaintScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: &User) -> AppResult<User>;
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<UserListItem>>;
    async fn update_user(&self, user: &User) -> AppResult<User>;
    /// Removes the user and nulls every reference to them. Returns false if absent.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;
    /// Officers and department heads, optionally limited to one department.
    async fn list_staff(&self, department_id: Option<Uuid>) -> AppResult<Vec<User>>;

    // Departments
    async fn list_departments(&self) -> AppResult<Vec<Department>>;
    async fn get_department(&self, id: Uuid) -> AppResult<Option<Department>>;
    async fn create_department(&self, department: &Department) -> AppResult<Department>;
    async fn update_department(&self, department: &Department) -> AppResult<Department>;
    /// Removes the department and nulls references held by users and complaints.
    async fn delete_department(&self, id: Uuid) -> AppResult<bool>;

    // Locations
    async fn list_zones(&self) -> AppResult<Vec<Zone>>;
    async fn list_wards(&self, zone_id: Option<Uuid>) -> AppResult<Vec<Ward>>;
    async fn list_areas(&self, ward_id: Option<Uuid>) -> AppResult<Vec<Area>>;
    async fn get_zone(&self, id: Uuid) -> AppResult<Option<Zone>>;
    async fn get_ward(&self, id: Uuid) -> AppResult<Option<Ward>>;
    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>>;
    async fn create_zone(&self, zone: &Zone) -> AppResult<Zone>;
    async fn create_ward(&self, ward: &Ward) -> AppResult<Ward>;
    async fn create_area(&self, area: &Area) -> AppResult<Area>;

    // Complaints
    /// Atomically increments and returns the counter for `year`.
    async fn next_complaint_seq(&self, year: i32) -> AppResult<i64>;
    /// Inserts the complaint and its initial images together.
    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        images: &[ComplaintImage],
    ) -> AppResult<()>;
    async fn get_complaint(&self, id: Uuid) -> AppResult<Option<ComplaintView>>;
    async fn list_complaints(
        &self,
        scope: ComplaintScope,
        sort: ComplaintSort,
    ) -> AppResult<Vec<ComplaintView>>;
    async fn update_complaint(&self, complaint: &Complaint) -> AppResult<()>;
    /// Removes the complaint with its images and comments. Returns false if absent.
    async fn delete_complaint(&self, id: Uuid) -> AppResult<bool>;
    async fn status_counts(&self, scope: ComplaintScope) -> AppResult<StatusCounts>;
    async fn created_since(
        &self,
        scope: ComplaintScope,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>>;

    // Images
    async fn insert_images(&self, images: &[ComplaintImage]) -> AppResult<()>;
    async fn list_images(&self, complaint_ids: &[Uuid]) -> AppResult<Vec<ComplaintImage>>;

    // Comments
    async fn insert_comment(&self, comment: &ComplaintComment) -> AppResult<()>;
    async fn list_comments(&self, complaint_id: Uuid) -> AppResult<Vec<CommentView>>;

    // Settings
    async fn list_settings(&self) -> AppResult<Vec<SystemSetting>>;
    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<()>;

    // Library
    async fn list_documents(&self) -> AppResult<Vec<Document>>;
    async fn list_projects(&self) -> AppResult<Vec<ProjectView>>;
}

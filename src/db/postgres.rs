//! Postgres-backed store

use super::Store;
use crate::error::{conflict_on_unique, AppResult};
use crate::models::*;
use crate::policy::ComplaintScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const COMPLAINT_VIEW: &str = r#"
    SELECT c.*,
           d.name AS department_name,
           z.name AS zone_name,
           w.name AS ward_name,
           a.name AS area_name,
           u.full_name AS reporter_name
    FROM complaints c
    LEFT JOIN departments d ON d.id = c.department_id
    LEFT JOIN zones z ON z.id = c.zone_id
    LEFT JOIN wards w ON w.id = c.ward_id
    LEFT JOIN areas a ON a.id = c.area_id
    LEFT JOIN users u ON u.id = c.user_id
"#;

#[derive(FromRow)]
struct UserRow {
    #[sqlx(flatten)]
    user: User,
    department_name: Option<String>,
}

/// Predicate over the `c` alias; always references exactly `$1`.
fn scope_predicate(scope: ComplaintScope) -> (&'static str, Option<Uuid>) {
    match scope {
        ComplaintScope::All | ComplaintScope::Nothing => ("$1::uuid IS NULL", None),
        ComplaintScope::Reporter(id) => ("c.user_id = $1", Some(id)),
        ComplaintScope::Department(id) => ("c.department_id = $1", Some(id)),
    }
}

fn order_clause(sort: ComplaintSort) -> &'static str {
    match sort {
        ComplaintSort::Date => "c.created_at DESC",
        ComplaintSort::Priority => "c.priority ASC, c.created_at DESC",
        ComplaintSort::Area => "w.name ASC NULLS LAST, a.name ASC NULLS LAST, c.created_at DESC",
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, phone, avatar_url, department_id, role,
                notification_email, notification_push, notification_status_updates,
                notification_comments, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.avatar_url)
        .bind(user.department_id)
        .bind(user.role)
        .bind(user.notification_email)
        .bind(user.notification_push)
        .bind(user.notification_status_updates)
        .bind(user.notification_comments)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email is already registered"))
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_users(&self) -> AppResult<Vec<UserListItem>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.*, d.name AS department_name
            FROM users u
            LEFT JOIN departments d ON d.id = u.department_id
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserListItem {
                user: row.user.into(),
                department_name: row.department_name,
            })
            .collect())
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                password_hash = $2, full_name = $3, phone = $4, avatar_url = $5,
                department_id = $6, role = $7, notification_email = $8,
                notification_push = $9, notification_status_updates = $10,
                notification_comments = $11, updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.avatar_url)
        .bind(user.department_id)
        .bind(user.role)
        .bind(user.notification_email)
        .bind(user.notification_push)
        .bind(user.notification_status_updates)
        .bind(user.notification_comments)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        // Foreign keys null out reporter, assignee, approver and comment author
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_staff(&self, department_id: Option<Uuid>) -> AppResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role IN ('officer', 'department_head')
              AND ($1::uuid IS NULL OR department_id = $1)
            ORDER BY full_name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // =========================================================================
    // Departments
    // =========================================================================

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        Ok(
            sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_department(&self, id: Uuid) -> AppResult<Option<Department>> {
        Ok(
            sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_department(&self, department: &Department) -> AppResult<Department> {
        sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (id, name, code, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(&department.description)
        .bind(department.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Department name or code already exists"))
    }

    async fn update_department(&self, department: &Department) -> AppResult<Department> {
        sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments SET name = $2, code = $3, description = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(&department.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Department name or code already exists"))
    }

    async fn delete_department(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Locations
    // =========================================================================

    async fn list_zones(&self) -> AppResult<Vec<Zone>> {
        Ok(sqlx::query_as::<_, Zone>("SELECT * FROM zones ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_wards(&self, zone_id: Option<Uuid>) -> AppResult<Vec<Ward>> {
        Ok(sqlx::query_as::<_, Ward>(
            "SELECT * FROM wards WHERE ($1::uuid IS NULL OR zone_id = $1) ORDER BY name",
        )
        .bind(zone_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_areas(&self, ward_id: Option<Uuid>) -> AppResult<Vec<Area>> {
        Ok(sqlx::query_as::<_, Area>(
            "SELECT * FROM areas WHERE ($1::uuid IS NULL OR ward_id = $1) ORDER BY name",
        )
        .bind(ward_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_zone(&self, id: Uuid) -> AppResult<Option<Zone>> {
        Ok(sqlx::query_as::<_, Zone>("SELECT * FROM zones WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_ward(&self, id: Uuid) -> AppResult<Option<Ward>> {
        Ok(sqlx::query_as::<_, Ward>("SELECT * FROM wards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>> {
        Ok(sqlx::query_as::<_, Area>("SELECT * FROM areas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_zone(&self, zone: &Zone) -> AppResult<Zone> {
        sqlx::query_as::<_, Zone>(
            "INSERT INTO zones (id, name, code) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(zone.id)
        .bind(&zone.name)
        .bind(&zone.code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Zone code already exists"))
    }

    async fn create_ward(&self, ward: &Ward) -> AppResult<Ward> {
        sqlx::query_as::<_, Ward>(
            "INSERT INTO wards (id, name, code, zone_id) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(ward.id)
        .bind(&ward.name)
        .bind(&ward.code)
        .bind(ward.zone_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ward code already exists"))
    }

    async fn create_area(&self, area: &Area) -> AppResult<Area> {
        sqlx::query_as::<_, Area>(
            "INSERT INTO areas (id, name, code, ward_id) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(area.id)
        .bind(&area.name)
        .bind(&area.code)
        .bind(area.ward_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Area code already exists"))
    }

    // =========================================================================
    // Complaints
    // =========================================================================

    async fn next_complaint_seq(&self, year: i32) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO complaint_counters (year, seq) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET seq = complaint_counters.seq + 1
            RETURNING seq
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        images: &[ComplaintImage],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO complaints (
                id, complaint_number, user_id, title, description, category, status, priority,
                department_id, assigned_to, zone_id, ward_id, area_id, address, latitude,
                longitude, department_decision, cost_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20)
            "#,
        )
        .bind(complaint.id)
        .bind(&complaint.complaint_number)
        .bind(complaint.user_id)
        .bind(&complaint.title)
        .bind(&complaint.description)
        .bind(&complaint.category)
        .bind(complaint.status)
        .bind(complaint.priority)
        .bind(complaint.department_id)
        .bind(complaint.assigned_to)
        .bind(complaint.zone_id)
        .bind(complaint.ward_id)
        .bind(complaint.area_id)
        .bind(&complaint.address)
        .bind(complaint.latitude)
        .bind(complaint.longitude)
        .bind(complaint.department_decision)
        .bind(complaint.cost_status)
        .bind(complaint.created_at)
        .bind(complaint.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Complaint number already issued"))?;

        for image in images {
            insert_image(&mut tx, image).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_complaint(&self, id: Uuid) -> AppResult<Option<ComplaintView>> {
        let sql = format!("{} WHERE c.id = $1", COMPLAINT_VIEW);
        Ok(sqlx::query_as::<_, ComplaintView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_complaints(
        &self,
        scope: ComplaintScope,
        sort: ComplaintSort,
    ) -> AppResult<Vec<ComplaintView>> {
        if scope == ComplaintScope::Nothing {
            return Ok(Vec::new());
        }
        let (predicate, bind) = scope_predicate(scope);
        let sql = format!(
            "{} WHERE {} ORDER BY {}",
            COMPLAINT_VIEW,
            predicate,
            order_clause(sort)
        );
        Ok(sqlx::query_as::<_, ComplaintView>(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_complaint(&self, complaint: &Complaint) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE complaints SET
                status = $2, priority = $3, department_id = $4, assigned_to = $5,
                resolved_at = $6, department_decision = $7, accepted_at = $8,
                cost_estimated_amount = $9, cost_materials = $10, cost_labor = $11,
                cost_status = $12, cost_submitted_at = $13, cost_approved_by = $14,
                completion_remarks = $15, completed_at = $16, updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(complaint.id)
        .bind(complaint.status)
        .bind(complaint.priority)
        .bind(complaint.department_id)
        .bind(complaint.assigned_to)
        .bind(complaint.resolved_at)
        .bind(complaint.department_decision)
        .bind(complaint.accepted_at)
        .bind(complaint.cost_estimated_amount)
        .bind(&complaint.cost_materials)
        .bind(&complaint.cost_labor)
        .bind(complaint.cost_status)
        .bind(complaint.cost_submitted_at)
        .bind(complaint.cost_approved_by)
        .bind(&complaint.completion_remarks)
        .bind(complaint.completed_at)
        .bind(complaint.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_complaint(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM complaint_images WHERE complaint_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM complaint_comments WHERE complaint_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM complaints WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self, scope: ComplaintScope) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        if scope == ComplaintScope::Nothing {
            return Ok(counts);
        }
        let (predicate, bind) = scope_predicate(scope);
        let sql = format!(
            "SELECT c.status, COUNT(*) FROM complaints c WHERE {} GROUP BY c.status",
            predicate
        );
        let rows = sqlx::query_as::<_, (ComplaintStatus, i64)>(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await?;
        for (status, count) in rows {
            counts.add(status, count);
        }
        Ok(counts)
    }

    async fn created_since(
        &self,
        scope: ComplaintScope,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        if scope == ComplaintScope::Nothing {
            return Ok(Vec::new());
        }
        let (predicate, bind) = scope_predicate(scope);
        let sql = format!(
            "SELECT c.created_at FROM complaints c WHERE {} AND c.created_at >= $2",
            predicate
        );
        Ok(sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
            .bind(bind)
            .bind(since)
            .fetch_all(&self.pool)
            .await?)
    }

    // =========================================================================
    // Images & comments
    // =========================================================================

    async fn insert_images(&self, images: &[ComplaintImage]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for image in images {
            insert_image(&mut tx, image).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_images(&self, complaint_ids: &[Uuid]) -> AppResult<Vec<ComplaintImage>> {
        if complaint_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, ComplaintImage>(
            "SELECT * FROM complaint_images WHERE complaint_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(complaint_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_comment(&self, comment: &ComplaintComment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO complaint_comments (id, complaint_id, user_id, content, is_internal, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.complaint_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.is_internal)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_comments(&self, complaint_id: Uuid) -> AppResult<Vec<CommentView>> {
        Ok(sqlx::query_as::<_, CommentView>(
            r#"
            SELECT cc.*, u.full_name AS author_name
            FROM complaint_comments cc
            LEFT JOIN users u ON u.id = cc.user_id
            WHERE cc.complaint_id = $1
            ORDER BY cc.created_at ASC
            "#,
        )
        .bind(complaint_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // =========================================================================
    // Settings & library
    // =========================================================================

    async fn list_settings(&self) -> AppResult<Vec<SystemSetting>> {
        Ok(
            sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, updated_at) VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        Ok(
            sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_projects(&self) -> AppResult<Vec<ProjectView>> {
        Ok(sqlx::query_as::<_, ProjectView>(
            r#"
            SELECT p.*, d.name AS department_name, w.name AS ward_name
            FROM projects p
            LEFT JOIN departments d ON d.id = p.department_id
            LEFT JOIN wards w ON w.id = p.ward_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

async fn insert_image(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    image: &ComplaintImage,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO complaint_images (id, complaint_id, url, caption, phase, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(image.id)
    .bind(image.complaint_id)
    .bind(&image.url)
    .bind(&image.caption)
    .bind(image.phase)
    .bind(image.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_predicate_binds_one_parameter() {
        let id = Uuid::new_v4();
        assert_eq!(
            scope_predicate(ComplaintScope::Reporter(id)),
            ("c.user_id = $1", Some(id))
        );
        assert_eq!(
            scope_predicate(ComplaintScope::Department(id)),
            ("c.department_id = $1", Some(id))
        );
        assert_eq!(scope_predicate(ComplaintScope::All).1, None);
    }

    #[test]
    fn test_area_order_puts_unlocated_last() {
        assert_eq!(
            order_clause(ComplaintSort::Area),
            "w.name ASC NULLS LAST, a.name ASC NULLS LAST, c.created_at DESC"
        );
    }

    #[test]
    fn test_priority_order_relies_on_enum_declaration() {
        assert!(order_clause(ComplaintSort::Priority).starts_with("c.priority ASC"));
        let schema = include_str!("migrations/001_initial.sql");
        assert!(schema.contains("('urgent', 'high', 'medium', 'low')"));
    }
}

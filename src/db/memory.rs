//! In-process store for local demos and tests

use super::Store;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::policy::ComplaintScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    departments: Vec<Department>,
    zones: Vec<Zone>,
    wards: Vec<Ward>,
    areas: Vec<Area>,
    counters: HashMap<i32, i64>,
    complaints: Vec<Complaint>,
    images: Vec<ComplaintImage>,
    comments: Vec<ComplaintComment>,
    settings: Vec<SystemSetting>,
    documents: Vec<Document>,
    projects: Vec<ProjectView>,
}

impl Tables {
    fn department_name(&self, id: Option<Uuid>) -> Option<String> {
        let id = id?;
        self.departments
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.clone())
    }

    fn user_name(&self, id: Option<Uuid>) -> Option<String> {
        let id = id?;
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.full_name.clone())
    }

    fn view(&self, complaint: &Complaint) -> ComplaintView {
        let zone_name = complaint
            .zone_id
            .and_then(|id| self.zones.iter().find(|z| z.id == id))
            .map(|z| z.name.clone());
        let ward_name = complaint
            .ward_id
            .and_then(|id| self.wards.iter().find(|w| w.id == id))
            .map(|w| w.name.clone());
        let area_name = complaint
            .area_id
            .and_then(|id| self.areas.iter().find(|a| a.id == id))
            .map(|a| a.name.clone());

        ComplaintView {
            complaint: complaint.clone(),
            department_name: self.department_name(complaint.department_id),
            zone_name,
            ward_name,
            area_name,
            reporter_name: self.user_name(complaint.user_id),
        }
    }

    fn scoped(&self, scope: ComplaintScope) -> impl Iterator<Item = &Complaint> {
        self.complaints.iter().filter(move |c| scope.admits(c))
    }
}

/// Mirrors `NULLS LAST` ordering on an optional name.
fn nulls_last(name: &Option<String>) -> (bool, Option<&str>) {
    (name.is_none(), name.as_deref())
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> AppResult<User> {
        let mut t = self.tables.lock().await;
        if t.users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::conflict("Email is already registered"));
        }
        t.users.push(user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<UserListItem>> {
        let t = self.tables.lock().await;
        let mut users: Vec<&User> = t.users.iter().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .map(|u| UserListItem {
                user: u.clone().into(),
                department_name: t.department_name(u.department_id),
            })
            .collect())
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let mut t = self.tables.lock().await;
        let slot = t
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        let clear = |field: &mut Option<Uuid>| {
            if *field == Some(id) {
                *field = None;
            }
        };
        for c in t.complaints.iter_mut() {
            clear(&mut c.user_id);
            clear(&mut c.assigned_to);
            clear(&mut c.cost_approved_by);
        }
        for comment in t.comments.iter_mut() {
            clear(&mut comment.user_id);
        }
        Ok(true)
    }

    async fn list_staff(&self, department_id: Option<Uuid>) -> AppResult<Vec<User>> {
        let t = self.tables.lock().await;
        let mut staff: Vec<User> = t
            .users
            .iter()
            .filter(|u| u.role.is_department_staff())
            .filter(|u| department_id.is_none() || u.department_id == department_id)
            .cloned()
            .collect();
        staff.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(staff)
    }

    // =========================================================================
    // Departments
    // =========================================================================

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        let t = self.tables.lock().await;
        let mut departments = t.departments.clone();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn get_department(&self, id: Uuid) -> AppResult<Option<Department>> {
        let t = self.tables.lock().await;
        Ok(t.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn create_department(&self, department: &Department) -> AppResult<Department> {
        let mut t = self.tables.lock().await;
        if t.departments
            .iter()
            .any(|d| d.name == department.name || d.code == department.code)
        {
            return Err(AppError::conflict("Department name or code already exists"));
        }
        t.departments.push(department.clone());
        Ok(department.clone())
    }

    async fn update_department(&self, department: &Department) -> AppResult<Department> {
        let mut t = self.tables.lock().await;
        if t.departments.iter().any(|d| {
            d.id != department.id && (d.name == department.name || d.code == department.code)
        }) {
            return Err(AppError::conflict("Department name or code already exists"));
        }
        let slot = t
            .departments
            .iter_mut()
            .find(|d| d.id == department.id)
            .ok_or_else(|| AppError::not_found("Department not found"))?;
        *slot = department.clone();
        Ok(department.clone())
    }

    async fn delete_department(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.departments.len();
        t.departments.retain(|d| d.id != id);
        if t.departments.len() == before {
            return Ok(false);
        }
        for u in t.users.iter_mut().filter(|u| u.department_id == Some(id)) {
            u.department_id = None;
        }
        for c in t.complaints.iter_mut().filter(|c| c.department_id == Some(id)) {
            c.department_id = None;
        }
        Ok(true)
    }

    // =========================================================================
    // Locations
    // =========================================================================

    async fn list_zones(&self) -> AppResult<Vec<Zone>> {
        let t = self.tables.lock().await;
        let mut zones = t.zones.clone();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn list_wards(&self, zone_id: Option<Uuid>) -> AppResult<Vec<Ward>> {
        let t = self.tables.lock().await;
        let mut wards: Vec<Ward> = t
            .wards
            .iter()
            .filter(|w| zone_id.map_or(true, |z| w.zone_id == z))
            .cloned()
            .collect();
        wards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wards)
    }

    async fn list_areas(&self, ward_id: Option<Uuid>) -> AppResult<Vec<Area>> {
        let t = self.tables.lock().await;
        let mut areas: Vec<Area> = t
            .areas
            .iter()
            .filter(|a| ward_id.map_or(true, |w| a.ward_id == w))
            .cloned()
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }

    async fn get_zone(&self, id: Uuid) -> AppResult<Option<Zone>> {
        let t = self.tables.lock().await;
        Ok(t.zones.iter().find(|z| z.id == id).cloned())
    }

    async fn get_ward(&self, id: Uuid) -> AppResult<Option<Ward>> {
        let t = self.tables.lock().await;
        Ok(t.wards.iter().find(|w| w.id == id).cloned())
    }

    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>> {
        let t = self.tables.lock().await;
        Ok(t.areas.iter().find(|a| a.id == id).cloned())
    }

    async fn create_zone(&self, zone: &Zone) -> AppResult<Zone> {
        let mut t = self.tables.lock().await;
        if t.zones.iter().any(|z| z.code == zone.code) {
            return Err(AppError::conflict("Zone code already exists"));
        }
        t.zones.push(zone.clone());
        Ok(zone.clone())
    }

    async fn create_ward(&self, ward: &Ward) -> AppResult<Ward> {
        let mut t = self.tables.lock().await;
        if t.wards.iter().any(|w| w.code == ward.code) {
            return Err(AppError::conflict("Ward code already exists"));
        }
        t.wards.push(ward.clone());
        Ok(ward.clone())
    }

    async fn create_area(&self, area: &Area) -> AppResult<Area> {
        let mut t = self.tables.lock().await;
        if t.areas.iter().any(|a| a.code == area.code) {
            return Err(AppError::conflict("Area code already exists"));
        }
        t.areas.push(area.clone());
        Ok(area.clone())
    }

    // =========================================================================
    // Complaints
    // =========================================================================

    async fn next_complaint_seq(&self, year: i32) -> AppResult<i64> {
        let mut t = self.tables.lock().await;
        let seq = t.counters.entry(year).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        images: &[ComplaintImage],
    ) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        if t.complaints
            .iter()
            .any(|c| c.complaint_number == complaint.complaint_number)
        {
            return Err(AppError::conflict("Complaint number already issued"));
        }
        t.complaints.push(complaint.clone());
        t.images.extend_from_slice(images);
        Ok(())
    }

    async fn get_complaint(&self, id: Uuid) -> AppResult<Option<ComplaintView>> {
        let t = self.tables.lock().await;
        Ok(t.complaints.iter().find(|c| c.id == id).map(|c| t.view(c)))
    }

    async fn list_complaints(
        &self,
        scope: ComplaintScope,
        sort: ComplaintSort,
    ) -> AppResult<Vec<ComplaintView>> {
        let t = self.tables.lock().await;
        let mut views: Vec<ComplaintView> = t.scoped(scope).map(|c| t.view(c)).collect();

        views.sort_by(|a, b| {
            let newest = b.complaint.created_at.cmp(&a.complaint.created_at);
            match sort {
                ComplaintSort::Date => newest,
                ComplaintSort::Priority => a
                    .complaint
                    .priority
                    .urgency_rank()
                    .cmp(&b.complaint.priority.urgency_rank())
                    .then(newest),
                ComplaintSort::Area => nulls_last(&a.ward_name)
                    .cmp(&nulls_last(&b.ward_name))
                    .then_with(|| nulls_last(&a.area_name).cmp(&nulls_last(&b.area_name)))
                    .then(newest),
            }
        });
        Ok(views)
    }

    async fn update_complaint(&self, complaint: &Complaint) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        let slot = t
            .complaints
            .iter_mut()
            .find(|c| c.id == complaint.id)
            .ok_or_else(|| AppError::not_found("Complaint not found"))?;
        *slot = complaint.clone();
        Ok(())
    }

    async fn delete_complaint(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.complaints.len();
        t.complaints.retain(|c| c.id != id);
        if t.complaints.len() == before {
            return Ok(false);
        }
        t.images.retain(|i| i.complaint_id != id);
        t.comments.retain(|c| c.complaint_id != id);
        Ok(true)
    }

    async fn status_counts(&self, scope: ComplaintScope) -> AppResult<StatusCounts> {
        let t = self.tables.lock().await;
        let mut counts = StatusCounts::default();
        for c in t.scoped(scope) {
            counts.add(c.status, 1);
        }
        Ok(counts)
    }

    async fn created_since(
        &self,
        scope: ComplaintScope,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let t = self.tables.lock().await;
        Ok(t.scoped(scope)
            .map(|c| c.created_at)
            .filter(|created| *created >= since)
            .collect())
    }

    // =========================================================================
    // Images & comments
    // =========================================================================

    async fn insert_images(&self, images: &[ComplaintImage]) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        t.images.extend_from_slice(images);
        Ok(())
    }

    async fn list_images(&self, complaint_ids: &[Uuid]) -> AppResult<Vec<ComplaintImage>> {
        let t = self.tables.lock().await;
        Ok(t.images
            .iter()
            .filter(|i| complaint_ids.contains(&i.complaint_id))
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: &ComplaintComment) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        t.comments.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, complaint_id: Uuid) -> AppResult<Vec<CommentView>> {
        let t = self.tables.lock().await;
        let mut comments: Vec<CommentView> = t
            .comments
            .iter()
            .filter(|c| c.complaint_id == complaint_id)
            .map(|c| CommentView {
                comment: c.clone(),
                author_name: t.user_name(c.user_id),
            })
            .collect();
        comments.sort_by(|a, b| a.comment.created_at.cmp(&b.comment.created_at));
        Ok(comments)
    }

    // =========================================================================
    // Settings & library
    // =========================================================================

    async fn list_settings(&self) -> AppResult<Vec<SystemSetting>> {
        let t = self.tables.lock().await;
        Ok(t.settings.clone())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        match t.settings.iter_mut().find(|s| s.key == key) {
            Some(setting) => {
                setting.value = Some(value.to_string());
                setting.updated_at = now;
            }
            None => t.settings.push(SystemSetting {
                key: key.to_string(),
                value: Some(value.to_string()),
                updated_at: now,
            }),
        }
        Ok(())
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let t = self.tables.lock().await;
        let mut documents = t.documents.clone();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn list_projects(&self) -> AppResult<Vec<ProjectView>> {
        let t = self.tables.lock().await;
        let mut projects = t.projects.clone();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Library rows have no write route; tests seed them directly.
    pub async fn seed_document(&self, document: Document) {
        self.tables.lock().await.documents.push(document);
    }

    pub async fn seed_project(&self, project: ProjectView) {
        self.tables.lock().await.projects.push(project);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complaint(user_id: Uuid, department_id: Option<Uuid>, priority: Priority) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Uuid::new_v4(),
            complaint_number: format!("CMP-2024-{}", Uuid::new_v4()),
            user_id: Some(user_id),
            title: "Overflowing bin".to_string(),
            description: "Not collected".to_string(),
            category: "garbage".to_string(),
            status: ComplaintStatus::Pending,
            priority,
            department_id,
            assigned_to: None,
            zone_id: None,
            ward_id: None,
            area_id: None,
            address: None,
            latitude: None,
            longitude: None,
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
        }
    }

    #[tokio::test]
    async fn test_counter_is_per_year() {
        let store = MemoryStore::new();
        assert_eq!(store.next_complaint_seq(2024).await.unwrap(), 1);
        assert_eq!(store.next_complaint_seq(2024).await.unwrap(), 2);
        assert_eq!(store.next_complaint_seq(2025).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let user = User::new(
            "a@x.com".to_string(),
            String::new(),
            "A".to_string(),
            Role::Citizen,
            None,
        );
        store.create_user(&user).await.unwrap();
        let dup = User::new(
            "A@X.com".to_string(),
            String::new(),
            "A2".to_string(),
            Role::Citizen,
            None,
        );
        assert!(matches!(
            store.create_user(&dup).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_priority_sort_and_scope() {
        let store = MemoryStore::new();
        let reporter = Uuid::new_v4();
        let dept = Uuid::new_v4();
        for priority in [Priority::Low, Priority::Urgent, Priority::Medium] {
            store
                .insert_complaint(&complaint(reporter, Some(dept), priority), &[])
                .await
                .unwrap();
        }
        store
            .insert_complaint(&complaint(Uuid::new_v4(), None, Priority::High), &[])
            .await
            .unwrap();

        let mine = store
            .list_complaints(ComplaintScope::Reporter(reporter), ComplaintSort::Priority)
            .await
            .unwrap();
        let order: Vec<Priority> = mine.iter().map(|v| v.complaint.priority).collect();
        assert_eq!(order, vec![Priority::Urgent, Priority::Medium, Priority::Low]);

        let counts = store
            .status_counts(ComplaintScope::Department(dept))
            .await
            .unwrap();
        assert_eq!(counts.total, 3);
        assert!(store
            .list_complaints(ComplaintScope::Nothing, ComplaintSort::Date)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_area_sort_orders_by_ward_then_area_with_unlocated_last() {
        let store = MemoryStore::new();
        let zone = Zone {
            id: Uuid::new_v4(),
            name: "Central".to_string(),
            code: "Z1".to_string(),
        };
        store.create_zone(&zone).await.unwrap();
        let mut wards = Vec::new();
        for (name, code) in [("Beta", "W2"), ("Alpha", "W1")] {
            let ward = Ward {
                id: Uuid::new_v4(),
                name: name.to_string(),
                code: code.to_string(),
                zone_id: zone.id,
            };
            wards.push(store.create_ward(&ward).await.unwrap());
        }
        let (beta, alpha) = (&wards[0], &wards[1]);
        let mut areas = Vec::new();
        for (name, ward) in [("South", alpha), ("North", alpha), ("East", beta)] {
            let area = Area {
                id: Uuid::new_v4(),
                name: name.to_string(),
                code: name.to_uppercase(),
                ward_id: ward.id,
            };
            areas.push(store.create_area(&area).await.unwrap());
        }

        let now = Utc::now();
        let located = |title: &str, area: &Area, age_minutes: i64| Complaint {
            title: title.to_string(),
            zone_id: Some(zone.id),
            ward_id: Some(area.ward_id),
            area_id: Some(area.id),
            created_at: now - chrono::Duration::minutes(age_minutes),
            ..complaint(Uuid::new_v4(), None, Priority::Medium)
        };
        let unlocated = |title: &str, age_minutes: i64| Complaint {
            title: title.to_string(),
            created_at: now - chrono::Duration::minutes(age_minutes),
            ..complaint(Uuid::new_v4(), None, Priority::Medium)
        };
        let rows = [
            unlocated("nowhere old", 50),
            located("beta east", &areas[2], 40),
            located("alpha south", &areas[0], 30),
            unlocated("nowhere new", 20),
            located("alpha north old", &areas[1], 10),
            located("alpha north new", &areas[1], 0),
        ];
        for row in &rows {
            store.insert_complaint(row, &[]).await.unwrap();
        }

        let sorted = store
            .list_complaints(ComplaintScope::All, ComplaintSort::Area)
            .await
            .unwrap();
        let titles: Vec<&str> = sorted.iter().map(|v| v.complaint.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "alpha north new",
                "alpha north old",
                "alpha south",
                "beta east",
                "nowhere new",
                "nowhere old",
            ]
        );
        assert_eq!(sorted[0].ward_name.as_deref(), Some("Alpha"));
        assert_eq!(sorted[0].area_name.as_deref(), Some("North"));
        assert!(sorted[5].ward_name.is_none());
    }

    #[tokio::test]
    async fn test_delete_department_clears_references() {
        let store = MemoryStore::new();
        let dept = Department {
            id: Uuid::new_v4(),
            name: "Water Supply".to_string(),
            code: "WTR".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        store.create_department(&dept).await.unwrap();
        let c = complaint(Uuid::new_v4(), Some(dept.id), Priority::Medium);
        store.insert_complaint(&c, &[]).await.unwrap();

        assert!(store.delete_department(dept.id).await.unwrap());
        let view = store.get_complaint(c.id).await.unwrap().unwrap();
        assert_eq!(view.complaint.department_id, None);
        assert!(!store.delete_department(dept.id).await.unwrap());
    }
}

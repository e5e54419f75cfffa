//! Complaint access policy and lifecycle rules
//!
//! Every complaint read goes through [`ComplaintScope`] and every complaint
//! mutation goes through [`apply_update`], so role and department checks live
//! in one place instead of being repeated per route.

use crate::error::{AppError, AppResult};
use crate::models::{
    Complaint, ComplaintStatus, ComplaintUpdate, CostStatus, DepartmentDecision, MonthlyCount,
    Role, User,
};
use crate::validation::validate_cost_amount;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

// =============================================================================
// Identity
// =============================================================================

/// The authenticated caller, reloaded from the store on every request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            department_id: user.department_id,
        }
    }
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Officer or department head acting for the given department.
    pub fn is_staff_of(&self, department_id: Option<Uuid>) -> bool {
        self.role.is_department_staff()
            && self.department_id.is_some()
            && self.department_id == department_id
    }
}

/// Fail with `Forbidden` unless the caller holds one of `allowed`.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AppError::forbidden("You do not have permission to perform this action"))
    }
}

// =============================================================================
// Read scope
// =============================================================================

/// Row filter derived from the caller's role and department.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintScope {
    All,
    Reporter(Uuid),
    Department(Uuid),
    Nothing,
}

impl ComplaintScope {
    pub fn for_identity(identity: &Identity) -> Self {
        match identity.role {
            Role::Admin => ComplaintScope::All,
            Role::Citizen => ComplaintScope::Reporter(identity.id),
            Role::Officer | Role::DepartmentHead => match identity.department_id {
                Some(dept) => ComplaintScope::Department(dept),
                None => ComplaintScope::Nothing,
            },
        }
    }

    pub fn admits(&self, complaint: &Complaint) -> bool {
        match self {
            ComplaintScope::All => true,
            ComplaintScope::Reporter(id) => complaint.user_id == Some(*id),
            ComplaintScope::Department(id) => complaint.department_id == Some(*id),
            ComplaintScope::Nothing => false,
        }
    }
}

pub fn ensure_can_view(identity: &Identity, complaint: &Complaint) -> AppResult<()> {
    if ComplaintScope::for_identity(identity).admits(complaint) {
        Ok(())
    } else {
        Err(AppError::forbidden("You do not have access to this complaint"))
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Apply a partial update on behalf of `actor`, returning the new record.
///
/// Every precondition is evaluated against `current`; on any failure nothing
/// is applied. `assignee` must be the resolved user when the update sets
/// `assigned_to` to an id.
pub fn apply_update(
    actor: &Identity,
    current: &Complaint,
    update: &ComplaintUpdate,
    assignee: Option<&User>,
    now: DateTime<Utc>,
) -> AppResult<Complaint> {
    if actor.role == Role::Citizen {
        return Err(AppError::forbidden("Citizens cannot update complaints"));
    }

    let own_staff = actor.is_staff_of(current.department_id);
    if !actor.is_admin() && !own_staff {
        return Err(AppError::forbidden(
            "You can only update complaints routed to your department",
        ));
    }

    if update.is_empty() {
        return Err(AppError::validation("No changes supplied"));
    }

    let mut next = current.clone();

    // Department acceptance
    if let Some(accepted) = update.accepted_by_department {
        if !own_staff {
            return Err(AppError::forbidden(
                "Only staff of the routed department can accept or reject a complaint",
            ));
        }
        if current.department_decision != DepartmentDecision::Undecided {
            return Err(AppError::validation(
                "The department has already decided on this complaint",
            ));
        }
        next.department_decision = if accepted {
            DepartmentDecision::Accepted
        } else {
            DepartmentDecision::Rejected
        };
        next.accepted_at = Some(now);
    }

    if let Some(status) = update.status {
        next.status = status;
        if status == ComplaintStatus::Resolved {
            next.resolved_at = Some(now);
            next.completed_at = Some(now);
        }
    }

    if let Some(priority) = update.priority {
        next.priority = priority;
    }

    // Re-routing
    if let Some(department_id) = update.department_id {
        if !actor.is_admin() {
            return Err(AppError::forbidden("Only an admin can re-route a complaint"));
        }
        if department_id != current.department_id {
            next.department_id = department_id;
            next.assigned_to = None;
            next.department_decision = DepartmentDecision::Undecided;
            next.accepted_at = None;
            // The new department starts its own estimate and completion
            next.cost_status = CostStatus::Pending;
            next.cost_estimated_amount = None;
            next.cost_materials = None;
            next.cost_labor = None;
            next.cost_submitted_at = None;
            next.cost_approved_by = None;
            next.completion_remarks = None;
            next.completed_at = None;
        }
    }

    if let Some(assigned_to) = update.assigned_to {
        match assigned_to {
            None => next.assigned_to = None,
            Some(user_id) => {
                let user = assignee
                    .filter(|u| u.id == user_id)
                    .ok_or_else(|| AppError::not_found("Assignee not found"))?;
                if !user.role.is_department_staff()
                    || user.department_id.is_none()
                    || user.department_id != next.department_id
                {
                    return Err(AppError::validation(
                        "Assignee must be an officer or head of the complaint's department",
                    ));
                }
                next.assigned_to = Some(user_id);
            }
        }
    }

    // Cost estimate
    let submitting = update.cost_status == Some(CostStatus::Submitted);
    if update.touches_cost_fields() || submitting {
        if !own_staff {
            return Err(AppError::forbidden(
                "Only staff of the routed department can prepare a cost estimate",
            ));
        }
        if current.department_decision != DepartmentDecision::Accepted {
            return Err(AppError::validation(
                "The department must accept the complaint before preparing a cost estimate",
            ));
        }
        if !matches!(current.cost_status, CostStatus::Pending | CostStatus::Rejected) {
            return Err(AppError::validation(
                "The cost estimate cannot be changed while it is submitted or approved",
            ));
        }
        if let Some(amount) = update.cost_estimated_amount {
            validate_cost_amount(amount)?;
            next.cost_estimated_amount = Some(amount);
        }
        if let Some(ref materials) = update.cost_materials {
            next.cost_materials = Some(materials.clone());
        }
        if let Some(ref labor) = update.cost_labor {
            next.cost_labor = Some(labor.clone());
        }
        if submitting {
            if next.cost_estimated_amount.is_none() {
                return Err(AppError::validation(
                    "An estimated amount is required to submit a cost estimate",
                ));
            }
            next.cost_status = CostStatus::Submitted;
            next.cost_submitted_at = Some(now);
            next.cost_approved_by = None;
        }
    }

    match update.cost_status {
        Some(review @ (CostStatus::Approved | CostStatus::Rejected)) => {
            if !actor.is_admin() {
                return Err(AppError::forbidden("Only an admin can review a cost estimate"));
            }
            if current.cost_status != CostStatus::Submitted {
                return Err(AppError::validation(
                    "Only a submitted cost estimate can be approved or rejected",
                ));
            }
            next.cost_status = review;
            next.cost_approved_by = Some(actor.id);
        }
        Some(CostStatus::Pending) => {
            return Err(AppError::validation(
                "Cost status can only be set to submitted, approved or rejected",
            ));
        }
        _ => {}
    }

    // Completion
    if let Some(ref remarks) = update.completion_remarks {
        if !own_staff {
            return Err(AppError::forbidden(
                "Only staff of the routed department can mark a complaint complete",
            ));
        }
        if current.department_decision != DepartmentDecision::Accepted {
            return Err(AppError::validation(
                "The department must accept the complaint before completing it",
            ));
        }
        if matches!(
            current.status,
            ComplaintStatus::Resolved | ComplaintStatus::Rejected
        ) {
            return Err(AppError::validation(
                "A resolved or rejected complaint cannot be completed",
            ));
        }
        next.completion_remarks = Some(remarks.clone());
        next.completed_at = Some(now);
    }

    next.updated_at = now;
    Ok(next)
}

// =============================================================================
// Derived views
// =============================================================================

/// Human-readable complaint number, e.g. `CMP-2024-00042`.
pub fn complaint_number(year: i32, seq: i64) -> String {
    format!("CMP-{}-{:05}", year, seq)
}

const MONTHLY_WINDOW: i32 = 6;

fn shift_month(year: i32, month: u32, back: i32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

/// Start of the oldest month covered by [`monthly_buckets`].
pub fn monthly_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = shift_month(now.year(), now.month(), MONTHLY_WINDOW - 1);
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Count creation dates into the trailing six calendar months, oldest first.
pub fn monthly_buckets(now: DateTime<Utc>, created: &[DateTime<Utc>]) -> Vec<MonthlyCount> {
    (0..MONTHLY_WINDOW)
        .rev()
        .map(|back| {
            let (year, month) = shift_month(now.year(), now.month(), back);
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
            let complaints = created
                .iter()
                .filter(|d| d.year() == year && d.month() == month)
                .count() as i64;
            MonthlyCount {
                month: label,
                year,
                complaints,
            }
        })
        .collect()
}

use chrono::{DateTime, Utc};
use orgrole_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{AcademicYearId, AssignmentId, Permission, RoleId};

/// Time-bounded grant of a role to a user within one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    assignment_id: AssignmentId,
    user_id: UserId,
    role_id: RoleId,
    academic_year_id: AcademicYearId,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// Creates an assignment; `ends_at` may not precede `starts_at`.
    pub fn new(
        assignment_id: AssignmentId,
        user_id: UserId,
        role_id: RoleId,
        academic_year_id: AcademicYearId,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> AppResult<Self> {
        if let Some(ends_at) = ends_at {
            ensure_not_before_start(starts_at, ends_at)?;
        }

        Ok(Self {
            assignment_id,
            user_id,
            role_id,
            academic_year_id,
            starts_at,
            ends_at,
        })
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    /// Returns the user holding the role.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the academic year scope.
    #[must_use]
    pub fn academic_year_id(&self) -> AcademicYearId {
        self.academic_year_id
    }

    /// Returns the first instant the assignment is active.
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns the last instant the assignment is active, if closed.
    #[must_use]
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.ends_at
    }

    /// Returns whether an end date has been recorded.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ends_at.is_some()
    }

    /// Returns whether the assignment is active at `as_of`.
    ///
    /// Both bounds are inclusive; an open end never expires.
    #[must_use]
    pub fn is_active_at(&self, as_of: DateTime<Utc>) -> bool {
        self.starts_at <= as_of && self.ends_at.is_none_or(|ends_at| ends_at >= as_of)
    }

    /// Records the end of the assignment.
    pub fn close(&mut self, ends_at: DateTime<Utc>) -> AppResult<()> {
        if self.is_closed() {
            return Err(AppError::Conflict(format!(
                "role assignment '{}' is already closed",
                self.assignment_id
            )));
        }

        ensure_not_before_start(self.starts_at, ends_at)?;
        self.ends_at = Some(ends_at);
        Ok(())
    }
}

fn ensure_not_before_start(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> AppResult<()> {
    if ends_at < starts_at {
        return Err(AppError::Validation(format!(
            "assignment end '{}' precedes its start '{}'",
            ends_at.to_rfc3339(),
            starts_at.to_rfc3339()
        )));
    }

    Ok(())
}

/// Explicit per-assignment grant or revocation of one permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentPermissionOverride {
    /// Assignment the override applies to.
    pub assignment_id: AssignmentId,
    /// Overridden permission.
    pub permission: Permission,
    /// `true` grants, `false` revokes.
    pub is_granted: bool,
}

//! Effective-permission resolution over one batch of assignment data.
//!
//! Active assignments are walked in role-priority order. Within one assignment an
//! explicit override is decisive; otherwise a role default that includes the
//! permission grants it. A role lacking the permission does not deny it, so the
//! walk continues with the next assignment. When nothing decides, access is denied.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orgrole_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{AssignmentId, AssignmentPermissionOverride, Permission, Role, RoleAssignment, RoleId};

/// One assignment together with everything resolution needs about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentGrants {
    assignment: RoleAssignment,
    role: Role,
    overrides: BTreeMap<Permission, bool>,
}

impl AssignmentGrants {
    /// Bundles an assignment with its role and overrides.
    ///
    /// Fails when the role or any override belongs to a different assignment.
    pub fn new(
        assignment: RoleAssignment,
        role: Role,
        overrides: impl IntoIterator<Item = AssignmentPermissionOverride>,
    ) -> AppResult<Self> {
        if assignment.role_id() != role.role_id() {
            return Err(AppError::Validation(format!(
                "assignment '{}' references role '{}' but role '{}' was supplied",
                assignment.assignment_id(),
                assignment.role_id(),
                role.role_id()
            )));
        }

        let mut by_permission = BTreeMap::new();
        for value in overrides {
            if value.assignment_id != assignment.assignment_id() {
                return Err(AppError::Validation(format!(
                    "override for '{}' belongs to assignment '{}', not '{}'",
                    value.permission,
                    value.assignment_id,
                    assignment.assignment_id()
                )));
            }
            by_permission.insert(value.permission, value.is_granted);
        }

        Ok(Self {
            assignment,
            role,
            overrides: by_permission,
        })
    }

    /// Returns the wrapped assignment.
    #[must_use]
    pub fn assignment(&self) -> &RoleAssignment {
        &self.assignment
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Returns the override recorded for `permission`, if any.
    #[must_use]
    pub fn override_for(&self, permission: Permission) -> Option<bool> {
        self.overrides.get(&permission).copied()
    }
}

/// Outcome of resolving one permission, with the record that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PermissionDecision {
    /// An assignment override decided the outcome.
    Override {
        /// Assignment carrying the override.
        assignment_id: AssignmentId,
        /// Override value.
        granted: bool,
    },
    /// A role default granted the permission.
    RoleDefault {
        /// Assignment through which the role is held.
        assignment_id: AssignmentId,
        /// Role whose defaults include the permission.
        role_id: RoleId,
    },
    /// No active assignment decided; access is denied.
    NoMatch,
}

impl PermissionDecision {
    /// Returns whether the decision grants access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        match self {
            Self::Override { granted, .. } => *granted,
            Self::RoleDefault { .. } => true,
            Self::NoMatch => false,
        }
    }
}

/// Resolves a permission by its transport name.
///
/// Names outside the catalog resolve to [`PermissionDecision::NoMatch`].
#[must_use]
pub fn resolve_permission(
    grants: &[AssignmentGrants],
    permission_name: &str,
    as_of: DateTime<Utc>,
) -> PermissionDecision {
    match Permission::from_str(permission_name) {
        Ok(permission) => resolve_catalog_permission(grants, permission, as_of),
        Err(_) => PermissionDecision::NoMatch,
    }
}

/// Resolves a catalog permission.
#[must_use]
pub fn resolve_catalog_permission(
    grants: &[AssignmentGrants],
    permission: Permission,
    as_of: DateTime<Utc>,
) -> PermissionDecision {
    decide(&active_in_priority_order(grants, as_of), permission)
}

/// Returns whether the named permission is granted at `as_of`.
#[must_use]
pub fn has_permission(
    grants: &[AssignmentGrants],
    permission_name: &str,
    as_of: DateTime<Utc>,
) -> bool {
    resolve_permission(grants, permission_name, as_of).is_granted()
}

/// Returns every catalog permission granted at `as_of`.
#[must_use]
pub fn effective_permissions(
    grants: &[AssignmentGrants],
    as_of: DateTime<Utc>,
) -> BTreeSet<Permission> {
    let ordered = active_in_priority_order(grants, as_of);

    Permission::all()
        .iter()
        .copied()
        .filter(|permission| decide(&ordered, *permission).is_granted())
        .collect()
}

/// Returns the roles held through assignments active at `as_of`, strongest first.
#[must_use]
pub fn active_roles(grants: &[AssignmentGrants], as_of: DateTime<Utc>) -> Vec<&Role> {
    active_in_priority_order(grants, as_of)
        .into_iter()
        .map(|entry| &entry.role)
        .collect()
}

fn decide(ordered: &[&AssignmentGrants], permission: Permission) -> PermissionDecision {
    for entry in ordered {
        let assignment_id = entry.assignment.assignment_id();

        if let Some(granted) = entry.override_for(permission) {
            return PermissionDecision::Override {
                assignment_id,
                granted,
            };
        }

        if entry.role.grants(permission) {
            return PermissionDecision::RoleDefault {
                assignment_id,
                role_id: entry.role.role_id(),
            };
        }
    }

    PermissionDecision::NoMatch
}

/// Active assignments ordered by role priority, then role name, then assignment id.
fn active_in_priority_order(
    grants: &[AssignmentGrants],
    as_of: DateTime<Utc>,
) -> Vec<&AssignmentGrants> {
    let mut active = grants
        .iter()
        .filter(|entry| entry.assignment.is_active_at(as_of))
        .collect::<Vec<_>>();

    active.sort_by(|left, right| {
        left.role
            .priority()
            .cmp(&right.role.priority())
            .then_with(|| left.role.name().as_str().cmp(right.role.name().as_str()))
            .then_with(|| {
                left.assignment
                    .assignment_id()
                    .cmp(&right.assignment.assignment_id())
            })
    });

    active
}

#[cfg(test)]
mod tests;

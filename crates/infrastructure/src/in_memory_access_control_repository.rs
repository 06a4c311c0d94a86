use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgrole_application::{AuthorizationRepository, RoleAdminRepository};
use orgrole_core::{AppError, AppResult, UserId};
use orgrole_domain::{
    AssignmentGrants, AssignmentId, AssignmentPermissionOverride, Permission, Role,
    RoleAssignment, RoleId,
};
use tokio::sync::RwLock;

/// In-memory store for roles, assignments and overrides.
///
/// Implements both the lookup port used by permission checks and the
/// administration port, so one instance can back a complete service graph.
/// Locks are always taken in the order roles, assignments, overrides.
#[derive(Debug, Default)]
pub struct InMemoryAccessControlRepository {
    roles: RwLock<HashMap<RoleId, Role>>,
    assignments: RwLock<HashMap<AssignmentId, RoleAssignment>>,
    overrides: RwLock<HashMap<(AssignmentId, Permission), bool>>,
}

impl InMemoryAccessControlRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryAccessControlRepository {
    async fn load_assignment_grants(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<AssignmentGrants>> {
        let roles = self.roles.read().await;
        let assignments = self.assignments.read().await;
        let overrides = self.overrides.read().await;

        assignments
            .values()
            .filter(|assignment| assignment.user_id() == user_id && assignment.is_active_at(as_of))
            .map(|assignment| {
                let role = roles.get(&assignment.role_id()).cloned().ok_or_else(|| {
                    AppError::Internal(format!(
                        "assignment '{}' references missing role '{}'",
                        assignment.assignment_id(),
                        assignment.role_id()
                    ))
                })?;
                let assignment_overrides = overrides
                    .iter()
                    .filter(|((assignment_id, _), _)| *assignment_id == assignment.assignment_id())
                    .map(|((assignment_id, permission), is_granted)| {
                        AssignmentPermissionOverride {
                            assignment_id: *assignment_id,
                            permission: *permission,
                            is_granted: *is_granted,
                        }
                    });

                AssignmentGrants::new(assignment.clone(), role, assignment_overrides)
            })
            .collect()
    }
}

#[async_trait]
impl RoleAdminRepository for InMemoryAccessControlRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;

        let mut values: Vec<Role> = roles.values().cloned().collect();
        values.sort_by(|left, right| {
            left.priority()
                .cmp(&right.priority())
                .then_with(|| left.name().cmp(right.name()))
        });
        Ok(values)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.contains_key(&role.role_id()) || name_taken(&roles, &role) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }

        roles.insert(role.role_id(), role);
        Ok(())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if name_taken(&roles, &role) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }

        let stored = stored_role_mut(&mut roles, role.role_id())?;
        stored.rename(role.name().as_str())?;
        stored.set_description(role.description().map(str::to_owned));
        stored.set_priority(role.priority());
        Ok(())
    }

    async fn attach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        let mut roles = self.roles.write().await;
        Ok(stored_role_mut(&mut roles, role_id)?.attach_permission(permission))
    }

    async fn detach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool> {
        let mut roles = self.roles.write().await;
        Ok(stored_role_mut(&mut roles, role_id)?.detach_permission(permission))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let assignments = self.assignments.read().await;

        if assignments
            .values()
            .any(|assignment| assignment.role_id() == role_id)
        {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is referenced by role assignments"
            )));
        }

        roles
            .remove(&role_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn count_role_assignments(&self, role_id: RoleId) -> AppResult<u64> {
        let assignments = self.assignments.read().await;

        Ok(assignments
            .values()
            .filter(|assignment| assignment.role_id() == role_id)
            .count() as u64)
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        let roles = self.roles.read().await;
        let mut assignments = self.assignments.write().await;
        insert_checked(&roles, &mut assignments, assignment)
    }

    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self.assignments.read().await.get(&assignment_id).cloned())
    }

    async fn close_assignment(
        &self,
        assignment_id: AssignmentId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        close_checked(&mut assignments, assignment_id, ends_at)
    }

    async fn transfer_assignment(
        &self,
        source: AssignmentId,
        ends_at: DateTime<Utc>,
        replacement: RoleAssignment,
    ) -> AppResult<()> {
        let roles = self.roles.read().await;
        let mut assignments = self.assignments.write().await;

        let snapshot = assignments.get(&source).cloned();
        close_checked(&mut assignments, source, ends_at)?;
        if let Err(error) = insert_checked(&roles, &mut assignments, replacement) {
            if let Some(original) = snapshot {
                assignments.insert(source, original);
            }
            return Err(error);
        }

        Ok(())
    }

    async fn delete_assignment(&self, assignment_id: AssignmentId) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        let mut overrides = self.overrides.write().await;

        if assignments.remove(&assignment_id).is_none() {
            return Err(AppError::NotFound(format!(
                "role assignment '{assignment_id}' was not found"
            )));
        }

        overrides.retain(|(stored_assignment_id, _), _| *stored_assignment_id != assignment_id);
        Ok(())
    }

    async fn list_assignments_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        let assignments = self.assignments.read().await;

        let mut values: Vec<RoleAssignment> = assignments
            .values()
            .filter(|assignment| assignment.user_id() == user_id)
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            right
                .starts_at()
                .cmp(&left.starts_at())
                .then_with(|| left.assignment_id().cmp(&right.assignment_id()))
        });
        Ok(values)
    }

    async fn save_override(&self, value: AssignmentPermissionOverride) -> AppResult<()> {
        let assignments = self.assignments.read().await;
        if !assignments.contains_key(&value.assignment_id) {
            return Err(AppError::NotFound(format!(
                "role assignment '{}' was not found",
                value.assignment_id
            )));
        }

        self.overrides
            .write()
            .await
            .insert((value.assignment_id, value.permission), value.is_granted);
        Ok(())
    }

    async fn clear_override(
        &self,
        assignment_id: AssignmentId,
        permission: Permission,
    ) -> AppResult<bool> {
        Ok(self
            .overrides
            .write()
            .await
            .remove(&(assignment_id, permission))
            .is_some())
    }

    async fn list_overrides(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Vec<AssignmentPermissionOverride>> {
        let overrides = self.overrides.read().await;

        let mut values: Vec<AssignmentPermissionOverride> = overrides
            .iter()
            .filter(|((stored_assignment_id, _), _)| *stored_assignment_id == assignment_id)
            .map(|((stored_assignment_id, permission), is_granted)| {
                AssignmentPermissionOverride {
                    assignment_id: *stored_assignment_id,
                    permission: *permission,
                    is_granted: *is_granted,
                }
            })
            .collect();
        values.sort_by_key(|value| value.permission.as_str());
        Ok(values)
    }
}

fn name_taken(roles: &HashMap<RoleId, Role>, candidate: &Role) -> bool {
    roles.values().any(|stored| {
        stored.role_id() != candidate.role_id() && stored.has_name(candidate.name().as_str())
    })
}

fn stored_role_mut(roles: &mut HashMap<RoleId, Role>, role_id: RoleId) -> AppResult<&mut Role> {
    roles
        .get_mut(&role_id)
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
}

fn insert_checked(
    roles: &HashMap<RoleId, Role>,
    assignments: &mut HashMap<AssignmentId, RoleAssignment>,
    assignment: RoleAssignment,
) -> AppResult<()> {
    if !roles.contains_key(&assignment.role_id()) {
        return Err(AppError::NotFound(format!(
            "role '{}' was not found",
            assignment.role_id()
        )));
    }

    if assignments.contains_key(&assignment.assignment_id())
        || assignments.values().any(|stored| {
            stored.user_id() == assignment.user_id()
                && stored.role_id() == assignment.role_id()
                && stored.academic_year_id() == assignment.academic_year_id()
        })
    {
        return Err(AppError::Conflict(format!(
            "user '{}' already holds role '{}' in academic year '{}'",
            assignment.user_id(),
            assignment.role_id(),
            assignment.academic_year_id()
        )));
    }

    assignments.insert(assignment.assignment_id(), assignment);
    Ok(())
}

fn close_checked(
    assignments: &mut HashMap<AssignmentId, RoleAssignment>,
    assignment_id: AssignmentId,
    ends_at: DateTime<Utc>,
) -> AppResult<()> {
    assignments
        .get_mut(&assignment_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("role assignment '{assignment_id}' was not found"))
        })?
        .close(ends_at)
}

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgrole_core::{AppResult, UserId};
use orgrole_domain::{
    AcademicYearId, AssignmentId, AssignmentPermissionOverride, Permission, Role, RoleAssignment,
    RoleId,
};

/// Input payload for creating roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Precedence rank; lower is stronger.
    pub priority: i32,
    /// Default permission names, validated against the catalog.
    pub permissions: Vec<String>,
}

/// Partial update of a role's attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New unique name.
    pub name: Option<String>,
    /// New description; a blank value clears it.
    pub description: Option<String>,
    /// New precedence rank.
    pub priority: Option<i32>,
}

/// Input payload for granting a role to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Receiving user.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Academic year scope.
    pub academic_year_id: AcademicYearId,
    /// First active instant.
    pub starts_at: DateTime<Utc>,
    /// Optional last active instant.
    pub ends_at: Option<DateTime<Utc>>,
}

/// Input payload for handing a held role over to another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRoleInput {
    /// Assignment being handed over.
    pub assignment_id: AssignmentId,
    /// User receiving the role.
    pub to_user_id: UserId,
    /// Instant the handover takes effect.
    pub effective_at: DateTime<Utc>,
}

/// Input payload for creating or changing an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOverrideInput {
    /// Assignment the override applies to.
    pub assignment_id: AssignmentId,
    /// Permission name, validated against the catalog.
    pub permission: String,
    /// `true` grants, `false` revokes.
    pub is_granted: bool,
}

/// Repository port for role, assignment and override administration.
///
/// Implementations enforce the storage-level uniqueness rules: role names are
/// unique (case-insensitively), assignments are unique per user, role and
/// academic year, and overrides are unique per assignment and permission.
#[async_trait]
pub trait RoleAdminRepository: Send + Sync {
    /// Lists all roles ordered by priority, then name.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Persists a new role with its default permissions.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Stores the name, description and priority of a role.
    ///
    /// The default permission set is left as stored; use
    /// [`RoleAdminRepository::attach_role_permission`] and
    /// [`RoleAdminRepository::detach_role_permission`] to change it.
    async fn update_role(&self, role: Role) -> AppResult<()>;

    /// Adds one default permission to a stored role.
    ///
    /// Returns `false` when the role already had it. Fails with `NotFound` for an
    /// unknown role.
    async fn attach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool>;

    /// Removes one default permission from a stored role.
    ///
    /// Returns `false` when the role did not have it. Fails with `NotFound` for an
    /// unknown role.
    async fn detach_role_permission(
        &self,
        role_id: RoleId,
        permission: Permission,
    ) -> AppResult<bool>;

    /// Deletes a role that has never been assigned.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Counts assignments to the role, open or closed.
    async fn count_role_assignments(&self, role_id: RoleId) -> AppResult<u64>;

    /// Persists a new assignment.
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Finds an assignment by identifier.
    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>>;

    /// Records the end instant of an open assignment.
    async fn close_assignment(
        &self,
        assignment_id: AssignmentId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Closes `source` at `ends_at` and inserts `replacement` as one unit.
    async fn transfer_assignment(
        &self,
        source: AssignmentId,
        ends_at: DateTime<Utc>,
        replacement: RoleAssignment,
    ) -> AppResult<()>;

    /// Deletes an assignment together with its overrides.
    async fn delete_assignment(&self, assignment_id: AssignmentId) -> AppResult<()>;

    /// Lists every assignment of a user, newest first.
    async fn list_assignments_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>>;

    /// Creates or replaces the override for (assignment, permission).
    async fn save_override(&self, value: AssignmentPermissionOverride) -> AppResult<()>;

    /// Removes an override. Returns `false` when none existed.
    async fn clear_override(
        &self,
        assignment_id: AssignmentId,
        permission: Permission,
    ) -> AppResult<bool>;

    /// Lists the overrides of one assignment.
    async fn list_overrides(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Vec<AssignmentPermissionOverride>>;
}

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgrole_core::{AppError, AppResult, UserId};
use orgrole_domain::{
    AssignmentGrants, Permission, PermissionDecision, active_roles, effective_permissions,
    resolve_catalog_permission,
};
use tracing::debug;

/// Repository port for permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Loads, in one batch, every assignment of `user_id` active at `as_of`
    /// together with its role defaults and overrides.
    async fn load_assignment_grants(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<AssignmentGrants>>;
}

/// Application service for permission checks.
///
/// Every check takes an explicit `as_of` instant; nothing here reads the clock.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Returns whether the user holds the named permission at `as_of`.
    ///
    /// Unknown permission names and users without assignments resolve to `false`;
    /// only repository failures are reported as errors.
    pub async fn has_permission(
        &self,
        user_id: UserId,
        permission_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .resolve(user_id, permission_name, as_of)
            .await?
            .is_granted())
    }

    /// Resolves the named permission and reports which record decided it.
    pub async fn resolve(
        &self,
        user_id: UserId,
        permission_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<PermissionDecision> {
        let Ok(permission) = Permission::from_str(permission_name) else {
            debug!(
                user_id = %user_id,
                permission = permission_name,
                "permission is not in the catalog"
            );
            return Ok(PermissionDecision::NoMatch);
        };

        self.resolve_catalog_permission(user_id, permission, as_of)
            .await
    }

    /// Ensures the user holds the permission at `as_of`.
    pub async fn require_permission(
        &self,
        user_id: UserId,
        permission: Permission,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let decision = self
            .resolve_catalog_permission(user_id, permission, as_of)
            .await?;

        if decision.is_granted() {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{user_id}' is missing permission '{}'",
            permission.as_str()
        )))
    }

    /// Returns whether the user holds at least one of the named permissions.
    pub async fn has_any_permission(
        &self,
        user_id: UserId,
        permission_names: &[&str],
        as_of: DateTime<Utc>,
    ) -> AppResult<bool> {
        let granted = self.effective_permissions(user_id, as_of).await?;

        Ok(permission_names.iter().any(|name| {
            Permission::from_str(name).is_ok_and(|permission| granted.contains(&permission))
        }))
    }

    /// Returns whether the user holds every named permission.
    ///
    /// An empty list is trivially satisfied.
    pub async fn has_all_permissions(
        &self,
        user_id: UserId,
        permission_names: &[&str],
        as_of: DateTime<Utc>,
    ) -> AppResult<bool> {
        let granted = self.effective_permissions(user_id, as_of).await?;

        Ok(permission_names.iter().all(|name| {
            Permission::from_str(name).is_ok_and(|permission| granted.contains(&permission))
        }))
    }

    /// Returns every catalog permission the user holds at `as_of`.
    pub async fn effective_permissions(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> AppResult<BTreeSet<Permission>> {
        let grants = self.repository.load_assignment_grants(user_id, as_of).await?;
        Ok(effective_permissions(&grants, as_of))
    }

    /// Returns whether the user holds a role with the given name at `as_of`.
    pub async fn has_role(
        &self,
        user_id: UserId,
        role_name: &str,
        as_of: DateTime<Utc>,
    ) -> AppResult<bool> {
        let grants = self.repository.load_assignment_grants(user_id, as_of).await?;
        Ok(active_roles(&grants, as_of)
            .iter()
            .any(|role| role.has_name(role_name)))
    }

    async fn resolve_catalog_permission(
        &self,
        user_id: UserId,
        permission: Permission,
        as_of: DateTime<Utc>,
    ) -> AppResult<PermissionDecision> {
        let grants = self.repository.load_assignment_grants(user_id, as_of).await?;
        let decision = resolve_catalog_permission(&grants, permission, as_of);

        debug!(
            user_id = %user_id,
            permission = permission.as_str(),
            assignments = grants.len(),
            granted = decision.is_granted(),
            decision = ?decision,
            "resolved permission"
        );

        Ok(decision)
    }
}

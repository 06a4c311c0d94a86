use std::collections::BTreeSet;

use orgrole_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{Permission, RoleId};

/// Named bundle of default permissions with a precedence rank.
///
/// Lower `priority` values take precedence when several roles are active at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    role_id: RoleId,
    name: NonEmptyString,
    description: Option<String>,
    priority: i32,
    permissions: BTreeSet<Permission>,
}

impl Role {
    /// Creates a role with validated fields.
    pub fn new(
        role_id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
        priority: i32,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> AppResult<Self> {
        Ok(Self {
            role_id,
            name: NonEmptyString::new(name)?,
            description: normalize_description(description),
            priority,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether `name` names this role, ignoring case and surrounding whitespace.
    ///
    /// Case folding is Unicode-aware so it agrees with `lower(name)` in SQL.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_str().to_lowercase() == name.trim().to_lowercase()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the precedence rank; lower is stronger.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the default permission set.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Returns whether the role grants `permission` by default.
    #[must_use]
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Renames the role.
    pub fn rename(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.name = NonEmptyString::new(name)?;
        Ok(())
    }

    /// Replaces the description; blank values clear it.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = normalize_description(description);
    }

    /// Changes the precedence rank.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Adds a default permission. Returns `false` when it was already present.
    pub fn attach_permission(&mut self, permission: Permission) -> bool {
        self.permissions.insert(permission)
    }

    /// Removes a default permission. Returns `false` when it was not present.
    pub fn detach_permission(&mut self, permission: Permission) -> bool {
        self.permissions.remove(&permission)
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::{Permission, RoleId};

    use super::Role;

    #[test]
    fn role_rejects_blank_name() {
        let role = Role::new(RoleId::new(), "  ", None, 1, []);
        assert!(role.is_err());
    }

    #[test]
    fn attach_and_detach_report_changes() {
        let role = Role::new(RoleId::new(), "Secretary", None, 4, [Permission::EventView]);
        let Ok(mut role) = role else {
            panic!("role fixture should be valid");
        };

        assert!(!role.attach_permission(Permission::EventView));
        assert!(role.attach_permission(Permission::ReportCreate));
        assert!(role.grants(Permission::ReportCreate));
        assert!(role.detach_permission(Permission::ReportCreate));
        assert!(!role.detach_permission(Permission::ReportCreate));
    }

    #[test]
    fn name_matching_folds_non_ascii_case() {
        let role = Role::new(RoleId::new(), "Élève Délégué", None, 50, []);
        let Ok(role) = role else {
            panic!("role fixture should be valid");
        };

        assert!(role.has_name(" ÉLÈVE DÉLÉGUÉ "));
        assert!(role.has_name("élève délégué"));
        assert!(!role.has_name("Eleve Delegue"));
    }

    #[test]
    fn blank_description_is_cleared() {
        let role = Role::new(
            RoleId::new(),
            "Member",
            Some("   ".to_owned()),
            99,
            [Permission::EventView],
        );
        assert!(matches!(role, Ok(ref value) if value.description().is_none()));
    }
}

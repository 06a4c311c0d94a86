use std::fmt::{Display, Formatter};
use std::str::FromStr;

use orgrole_core::AppError;
use serde::{Deserialize, Serialize};

/// Functional area a permission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDomain {
    /// Member account management.
    User,
    /// Student records.
    Student,
    /// Organization events.
    Event,
    /// Financial bookkeeping.
    Financial,
    /// Inventory and lending.
    Inventory,
    /// Sponsorship contacts.
    Sponsor,
    /// Task tracking.
    Task,
    /// Reporting.
    Report,
    /// System administration.
    System,
    /// Academic year lifecycle.
    AcademicYear,
    /// Class management.
    Class,
}

impl PermissionDomain {
    /// Returns the name prefix shared by the domain's permissions.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Student => "student",
            Self::Event => "event",
            Self::Financial => "financial",
            Self::Inventory => "inventory",
            Self::Sponsor => "sponsor",
            Self::Task => "task",
            Self::Report => "report",
            Self::System => "system",
            Self::AcademicYear => "academic_year",
            Self::Class => "class",
        }
    }
}

/// Catalog of named capabilities checked by permission-gated actions.
///
/// Storage and transport use the dotted name returned by [`Permission::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Permission {
    /// Allows viewing member accounts.
    UserView,
    /// Allows creating member accounts.
    UserCreate,
    /// Allows editing member accounts.
    UserUpdate,
    /// Allows deleting member accounts.
    UserDelete,
    /// Allows viewing student records.
    StudentView,
    /// Allows creating student records.
    StudentCreate,
    /// Allows editing student records.
    StudentUpdate,
    /// Allows deleting student records.
    StudentDelete,
    /// Allows bulk importing student records.
    StudentImport,
    /// Allows viewing organization events.
    EventView,
    /// Allows creating organization events.
    EventCreate,
    /// Allows editing organization events.
    EventUpdate,
    /// Allows deleting organization events.
    EventDelete,
    /// Allows approving event proposals.
    EventApprove,
    /// Allows viewing financial transactions.
    FinancialView,
    /// Allows recording financial transactions.
    FinancialCreate,
    /// Allows editing financial transactions.
    FinancialUpdate,
    /// Allows deleting financial transactions.
    FinancialDelete,
    /// Allows verifying recorded financial transactions.
    FinancialVerify,
    /// Allows exporting financial statements.
    FinancialExport,
    /// Allows viewing inventory items.
    InventoryView,
    /// Allows registering inventory items.
    InventoryCreate,
    /// Allows editing inventory items.
    InventoryUpdate,
    /// Allows deleting inventory items.
    InventoryDelete,
    /// Allows lending inventory items to members.
    InventoryBorrow,
    /// Allows viewing sponsors.
    SponsorView,
    /// Allows registering sponsors.
    SponsorCreate,
    /// Allows editing sponsors.
    SponsorUpdate,
    /// Allows deleting sponsors.
    SponsorDelete,
    /// Allows viewing tasks.
    TaskView,
    /// Allows creating tasks.
    TaskCreate,
    /// Allows editing tasks.
    TaskUpdate,
    /// Allows deleting tasks.
    TaskDelete,
    /// Allows assigning tasks to members.
    TaskAssign,
    /// Allows marking assigned tasks as complete.
    TaskComplete,
    /// Allows viewing reports.
    ReportView,
    /// Allows creating reports.
    ReportCreate,
    /// Allows exporting reports.
    ReportExport,
    /// Allows managing roles, assignments and overrides.
    SystemRoleManage,
    /// Allows reading the administrative audit log.
    SystemAuditRead,
    /// Allows changing organization settings.
    SystemSettingsManage,
    /// Allows viewing academic years.
    AcademicYearView,
    /// Allows creating academic years.
    AcademicYearCreate,
    /// Allows editing academic years.
    AcademicYearUpdate,
    /// Allows switching the active academic year.
    AcademicYearActivate,
    /// Allows viewing classes.
    ClassView,
    /// Allows creating classes.
    ClassCreate,
    /// Allows editing classes.
    ClassUpdate,
    /// Allows deleting classes.
    ClassDelete,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserView => "user.view",
            Self::UserCreate => "user.create",
            Self::UserUpdate => "user.update",
            Self::UserDelete => "user.delete",
            Self::StudentView => "student.view",
            Self::StudentCreate => "student.create",
            Self::StudentUpdate => "student.update",
            Self::StudentDelete => "student.delete",
            Self::StudentImport => "student.import",
            Self::EventView => "event.view",
            Self::EventCreate => "event.create",
            Self::EventUpdate => "event.update",
            Self::EventDelete => "event.delete",
            Self::EventApprove => "event.approve",
            Self::FinancialView => "financial.view",
            Self::FinancialCreate => "financial.create",
            Self::FinancialUpdate => "financial.update",
            Self::FinancialDelete => "financial.delete",
            Self::FinancialVerify => "financial.verify",
            Self::FinancialExport => "financial.export",
            Self::InventoryView => "inventory.view",
            Self::InventoryCreate => "inventory.create",
            Self::InventoryUpdate => "inventory.update",
            Self::InventoryDelete => "inventory.delete",
            Self::InventoryBorrow => "inventory.borrow",
            Self::SponsorView => "sponsor.view",
            Self::SponsorCreate => "sponsor.create",
            Self::SponsorUpdate => "sponsor.update",
            Self::SponsorDelete => "sponsor.delete",
            Self::TaskView => "task.view",
            Self::TaskCreate => "task.create",
            Self::TaskUpdate => "task.update",
            Self::TaskDelete => "task.delete",
            Self::TaskAssign => "task.assign",
            Self::TaskComplete => "task.complete",
            Self::ReportView => "report.view",
            Self::ReportCreate => "report.create",
            Self::ReportExport => "report.export",
            Self::SystemRoleManage => "system.role.manage",
            Self::SystemAuditRead => "system.audit.read",
            Self::SystemSettingsManage => "system.settings.manage",
            Self::AcademicYearView => "academic_year.view",
            Self::AcademicYearCreate => "academic_year.create",
            Self::AcademicYearUpdate => "academic_year.update",
            Self::AcademicYearActivate => "academic_year.activate",
            Self::ClassView => "class.view",
            Self::ClassCreate => "class.create",
            Self::ClassUpdate => "class.update",
            Self::ClassDelete => "class.delete",
        }
    }

    /// Returns the catalog description shown to administrators.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::UserView => "Allows viewing member accounts",
            Self::UserCreate => "Allows creating member accounts",
            Self::UserUpdate => "Allows editing member accounts",
            Self::UserDelete => "Allows deleting member accounts",
            Self::StudentView => "Allows viewing student records",
            Self::StudentCreate => "Allows creating student records",
            Self::StudentUpdate => "Allows editing student records",
            Self::StudentDelete => "Allows deleting student records",
            Self::StudentImport => "Allows bulk importing student records",
            Self::EventView => "Allows viewing organization events",
            Self::EventCreate => "Allows creating organization events",
            Self::EventUpdate => "Allows editing organization events",
            Self::EventDelete => "Allows deleting organization events",
            Self::EventApprove => "Allows approving event proposals",
            Self::FinancialView => "Allows viewing financial transactions",
            Self::FinancialCreate => "Allows recording financial transactions",
            Self::FinancialUpdate => "Allows editing financial transactions",
            Self::FinancialDelete => "Allows deleting financial transactions",
            Self::FinancialVerify => "Allows verifying recorded financial transactions",
            Self::FinancialExport => "Allows exporting financial statements",
            Self::InventoryView => "Allows viewing inventory items",
            Self::InventoryCreate => "Allows registering inventory items",
            Self::InventoryUpdate => "Allows editing inventory items",
            Self::InventoryDelete => "Allows deleting inventory items",
            Self::InventoryBorrow => "Allows lending inventory items to members",
            Self::SponsorView => "Allows viewing sponsors",
            Self::SponsorCreate => "Allows registering sponsors",
            Self::SponsorUpdate => "Allows editing sponsors",
            Self::SponsorDelete => "Allows deleting sponsors",
            Self::TaskView => "Allows viewing tasks",
            Self::TaskCreate => "Allows creating tasks",
            Self::TaskUpdate => "Allows editing tasks",
            Self::TaskDelete => "Allows deleting tasks",
            Self::TaskAssign => "Allows assigning tasks to members",
            Self::TaskComplete => "Allows marking assigned tasks as complete",
            Self::ReportView => "Allows viewing reports",
            Self::ReportCreate => "Allows creating reports",
            Self::ReportExport => "Allows exporting reports",
            Self::SystemRoleManage => "Allows managing roles, assignments and overrides",
            Self::SystemAuditRead => "Allows reading the administrative audit log",
            Self::SystemSettingsManage => "Allows changing organization settings",
            Self::AcademicYearView => "Allows viewing academic years",
            Self::AcademicYearCreate => "Allows creating academic years",
            Self::AcademicYearUpdate => "Allows editing academic years",
            Self::AcademicYearActivate => "Allows switching the active academic year",
            Self::ClassView => "Allows viewing classes",
            Self::ClassCreate => "Allows creating classes",
            Self::ClassUpdate => "Allows editing classes",
            Self::ClassDelete => "Allows deleting classes",
        }
    }

    /// Returns the functional area of this permission.
    #[must_use]
    pub fn domain(&self) -> PermissionDomain {
        match self {
            Self::UserView
            | Self::UserCreate
            | Self::UserUpdate
            | Self::UserDelete => PermissionDomain::User,
            Self::StudentView
            | Self::StudentCreate
            | Self::StudentUpdate
            | Self::StudentDelete
            | Self::StudentImport => PermissionDomain::Student,
            Self::EventView
            | Self::EventCreate
            | Self::EventUpdate
            | Self::EventDelete
            | Self::EventApprove => PermissionDomain::Event,
            Self::FinancialView
            | Self::FinancialCreate
            | Self::FinancialUpdate
            | Self::FinancialDelete
            | Self::FinancialVerify
            | Self::FinancialExport => PermissionDomain::Financial,
            Self::InventoryView
            | Self::InventoryCreate
            | Self::InventoryUpdate
            | Self::InventoryDelete
            | Self::InventoryBorrow => PermissionDomain::Inventory,
            Self::SponsorView
            | Self::SponsorCreate
            | Self::SponsorUpdate
            | Self::SponsorDelete => PermissionDomain::Sponsor,
            Self::TaskView
            | Self::TaskCreate
            | Self::TaskUpdate
            | Self::TaskDelete
            | Self::TaskAssign
            | Self::TaskComplete => PermissionDomain::Task,
            Self::ReportView
            | Self::ReportCreate
            | Self::ReportExport => PermissionDomain::Report,
            Self::SystemRoleManage
            | Self::SystemAuditRead
            | Self::SystemSettingsManage => PermissionDomain::System,
            Self::AcademicYearView
            | Self::AcademicYearCreate
            | Self::AcademicYearUpdate
            | Self::AcademicYearActivate => PermissionDomain::AcademicYear,
            Self::ClassView
            | Self::ClassCreate
            | Self::ClassUpdate
            | Self::ClassDelete => PermissionDomain::Class,
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::UserView,
            Permission::UserCreate,
            Permission::UserUpdate,
            Permission::UserDelete,
            Permission::StudentView,
            Permission::StudentCreate,
            Permission::StudentUpdate,
            Permission::StudentDelete,
            Permission::StudentImport,
            Permission::EventView,
            Permission::EventCreate,
            Permission::EventUpdate,
            Permission::EventDelete,
            Permission::EventApprove,
            Permission::FinancialView,
            Permission::FinancialCreate,
            Permission::FinancialUpdate,
            Permission::FinancialDelete,
            Permission::FinancialVerify,
            Permission::FinancialExport,
            Permission::InventoryView,
            Permission::InventoryCreate,
            Permission::InventoryUpdate,
            Permission::InventoryDelete,
            Permission::InventoryBorrow,
            Permission::SponsorView,
            Permission::SponsorCreate,
            Permission::SponsorUpdate,
            Permission::SponsorDelete,
            Permission::TaskView,
            Permission::TaskCreate,
            Permission::TaskUpdate,
            Permission::TaskDelete,
            Permission::TaskAssign,
            Permission::TaskComplete,
            Permission::ReportView,
            Permission::ReportCreate,
            Permission::ReportExport,
            Permission::SystemRoleManage,
            Permission::SystemAuditRead,
            Permission::SystemSettingsManage,
            Permission::AcademicYearView,
            Permission::AcademicYearCreate,
            Permission::AcademicYearUpdate,
            Permission::AcademicYearActivate,
            Permission::ClassView,
            Permission::ClassCreate,
            Permission::ClassUpdate,
            Permission::ClassDelete,
        ];

        ALL
    }

    /// Returns every permission of one functional area.
    pub fn in_domain(domain: PermissionDomain) -> impl Iterator<Item = Self> {
        Self::all()
            .iter()
            .copied()
            .filter(move |permission| permission.domain() == domain)
    }

    /// Parses a transport value into a permission, ignoring surrounding whitespace.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value.trim())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<Permission> for &'static str {
    fn from(value: Permission) -> Self {
        value.as_str()
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Stable audit actions emitted by administration use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    SecurityRoleCreated,
    /// Emitted when a role's name, description or priority changes.
    SecurityRoleUpdated,
    /// Emitted when a role without assignment history is deleted.
    SecurityRoleDeleted,
    /// Emitted when a default permission is attached to a role.
    SecurityRolePermissionAttached,
    /// Emitted when a default permission is detached from a role.
    SecurityRolePermissionDetached,
    /// Emitted when a role is assigned to a user.
    SecurityRoleAssigned,
    /// Emitted when an assignment receives an end date.
    SecurityAssignmentClosed,
    /// Emitted when an assignment is removed outright.
    SecurityAssignmentRemoved,
    /// Emitted when a role is handed over from one user to another.
    SecurityRoleTransferred,
    /// Emitted when a per-assignment override is created or changed.
    SecurityOverrideSaved,
    /// Emitted when a per-assignment override is removed.
    SecurityOverrideCleared,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRoleUpdated => "security.role.updated",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityRolePermissionAttached => "security.role.permission_attached",
            Self::SecurityRolePermissionDetached => "security.role.permission_detached",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityAssignmentClosed => "security.assignment.closed",
            Self::SecurityAssignmentRemoved => "security.assignment.removed",
            Self::SecurityRoleTransferred => "security.role.transferred",
            Self::SecurityOverrideSaved => "security.override.saved",
            Self::SecurityOverrideCleared => "security.override.cleared",
        }
    }
}

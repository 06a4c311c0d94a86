use chrono::{DateTime, Duration, TimeZone, Utc};
use orgrole_core::UserId;

use crate::{
    AcademicYearId, AssignmentId, AssignmentPermissionOverride, Permission, Role, RoleAssignment,
    RoleId,
};

use super::{
    AssignmentGrants, PermissionDecision, active_roles, effective_permissions, has_permission,
    resolve_permission,
};

fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single() {
        Some(value) => value,
        None => panic!("invalid fixture date {year}-{month}-{day}"),
    }
}

fn role(name: &str, priority: i32, permissions: &[Permission]) -> Role {
    match Role::new(
        RoleId::new(),
        name,
        None,
        priority,
        permissions.iter().copied(),
    ) {
        Ok(role) => role,
        Err(error) => panic!("invalid role fixture '{name}': {error}"),
    }
}

fn president() -> Role {
    role("President", 1, Permission::all())
}

fn student() -> Role {
    role(
        "Student",
        99,
        &[
            Permission::EventView,
            Permission::TaskComplete,
            Permission::InventoryView,
        ],
    )
}

fn auditor() -> Role {
    role(
        "Auditor",
        7,
        &[
            Permission::FinancialView,
            Permission::FinancialVerify,
            Permission::ReportView,
        ],
    )
}

fn treasurer(priority: i32) -> Role {
    role(
        "Treasurer",
        priority,
        &[
            Permission::FinancialView,
            Permission::FinancialCreate,
            Permission::FinancialUpdate,
            Permission::FinancialExport,
        ],
    )
}

struct Fixture {
    user_id: UserId,
    academic_year_id: AcademicYearId,
    grants: Vec<AssignmentGrants>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            user_id: UserId::new(),
            academic_year_id: AcademicYearId::new(),
            grants: Vec::new(),
        }
    }

    fn hold(
        &mut self,
        role: Role,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        overrides: &[(Permission, bool)],
    ) -> AssignmentId {
        let assignment_id = AssignmentId::new();
        let assignment = match RoleAssignment::new(
            assignment_id,
            self.user_id,
            role.role_id(),
            self.academic_year_id,
            starts_at,
            ends_at,
        ) {
            Ok(assignment) => assignment,
            Err(error) => panic!("invalid assignment fixture: {error}"),
        };
        let overrides = overrides
            .iter()
            .map(|(permission, is_granted)| AssignmentPermissionOverride {
                assignment_id,
                permission: *permission,
                is_granted: *is_granted,
            })
            .collect::<Vec<_>>();

        match AssignmentGrants::new(assignment, role, overrides) {
            Ok(grants) => self.grants.push(grants),
            Err(error) => panic!("invalid grants fixture: {error}"),
        }

        assignment_id
    }
}

#[test]
fn no_assignments_grant_nothing() {
    let fixture = Fixture::new();
    let as_of = timestamp(2024, 10, 1);

    for permission in Permission::all() {
        assert!(!has_permission(&fixture.grants, permission.as_str(), as_of));
    }
    assert!(effective_permissions(&fixture.grants, as_of).is_empty());
}

#[test]
fn student_only_sees_student_defaults() {
    let mut fixture = Fixture::new();
    fixture.hold(student(), timestamp(2024, 8, 1), None, &[]);
    let as_of = timestamp(2024, 10, 1);

    assert!(!has_permission(&fixture.grants, "financial.view", as_of));
    assert!(has_permission(&fixture.grants, "event.view", as_of));
    assert!(has_permission(&fixture.grants, "task.complete", as_of));
    assert_eq!(
        effective_permissions(&fixture.grants, as_of)
            .into_iter()
            .collect::<Vec<_>>(),
        vec![
            Permission::EventView,
            Permission::InventoryView,
            Permission::TaskComplete,
        ]
    );
}

#[test]
fn president_holds_whole_catalog() {
    let mut fixture = Fixture::new();
    fixture.hold(president(), timestamp(2024, 8, 1), None, &[]);
    let as_of = timestamp(2025, 1, 15);

    assert_eq!(
        effective_permissions(&fixture.grants, as_of).len(),
        Permission::all().len()
    );
}

#[test]
fn revoking_override_beats_role_default() {
    let mut fixture = Fixture::new();
    let assignment_id = fixture.hold(
        auditor(),
        timestamp(2024, 8, 1),
        None,
        &[(Permission::FinancialVerify, false)],
    );
    let as_of = timestamp(2024, 9, 1);

    assert_eq!(
        resolve_permission(&fixture.grants, "financial.verify", as_of),
        PermissionDecision::Override {
            assignment_id,
            granted: false,
        }
    );
    assert!(!has_permission(&fixture.grants, "financial.verify", as_of));
    assert!(has_permission(&fixture.grants, "financial.view", as_of));
}

#[test]
fn granting_override_adds_permission_missing_from_role() {
    let mut fixture = Fixture::new();
    fixture.hold(
        student(),
        timestamp(2024, 8, 1),
        None,
        &[(Permission::EventCreate, true)],
    );

    assert!(has_permission(
        &fixture.grants,
        "event.create",
        timestamp(2024, 9, 1)
    ));
}

#[test]
fn treasurer_and_auditor_overlap_with_auditor_first() {
    let mut fixture = Fixture::new();
    fixture.hold(treasurer(8), timestamp(2024, 8, 1), None, &[]);
    let auditor_assignment = fixture.hold(auditor(), timestamp(2024, 8, 1), None, &[]);
    let auditor_role_id = fixture.grants[1].role().role_id();
    let as_of = timestamp(2024, 11, 20);

    assert_eq!(
        resolve_permission(&fixture.grants, "financial.verify", as_of),
        PermissionDecision::RoleDefault {
            assignment_id: auditor_assignment,
            role_id: auditor_role_id,
        }
    );
}

#[test]
fn lower_role_still_grants_what_higher_role_omits() {
    let mut fixture = Fixture::new();
    fixture.hold(treasurer(3), timestamp(2024, 8, 1), None, &[]);
    let auditor_assignment = fixture.hold(auditor(), timestamp(2024, 8, 1), None, &[]);
    let as_of = timestamp(2024, 11, 20);

    let decision = resolve_permission(&fixture.grants, "financial.verify", as_of);
    assert!(matches!(
        decision,
        PermissionDecision::RoleDefault { assignment_id, .. } if assignment_id == auditor_assignment
    ));
    assert!(decision.is_granted());
}

#[test]
fn override_on_stronger_assignment_vetoes_weaker_role_default() {
    let mut fixture = Fixture::new();
    let treasurer_assignment = fixture.hold(
        treasurer(3),
        timestamp(2024, 8, 1),
        None,
        &[(Permission::FinancialVerify, false)],
    );
    fixture.hold(auditor(), timestamp(2024, 8, 1), None, &[]);

    assert_eq!(
        resolve_permission(&fixture.grants, "financial.verify", timestamp(2024, 9, 1)),
        PermissionDecision::Override {
            assignment_id: treasurer_assignment,
            granted: false,
        }
    );
}

#[test]
fn expired_and_future_assignments_do_not_contribute() {
    let mut fixture = Fixture::new();
    fixture.hold(
        auditor(),
        timestamp(2023, 8, 1),
        Some(timestamp(2024, 7, 31)),
        &[],
    );
    fixture.hold(president(), timestamp(2025, 8, 1), None, &[]);
    let as_of = timestamp(2024, 10, 1);

    assert!(!has_permission(&fixture.grants, "financial.verify", as_of));
    assert!(!has_permission(&fixture.grants, "user.delete", as_of));
    assert!(has_permission(
        &fixture.grants,
        "financial.verify",
        timestamp(2024, 7, 31)
    ));
    assert!(has_permission(
        &fixture.grants,
        "user.delete",
        timestamp(2025, 8, 1)
    ));
}

#[test]
fn closed_assignment_is_active_through_its_end_instant() {
    let mut fixture = Fixture::new();
    let ends_at = timestamp(2025, 7, 31);
    fixture.hold(auditor(), timestamp(2024, 8, 1), Some(ends_at), &[]);

    assert!(has_permission(&fixture.grants, "financial.verify", ends_at));
    assert!(!has_permission(
        &fixture.grants,
        "financial.verify",
        ends_at + Duration::seconds(1)
    ));
}

#[test]
fn unknown_permission_names_are_denied() {
    let mut fixture = Fixture::new();
    fixture.hold(president(), timestamp(2024, 8, 1), None, &[]);
    let as_of = timestamp(2024, 9, 1);

    assert_eq!(
        resolve_permission(&fixture.grants, "financial.embezzle", as_of),
        PermissionDecision::NoMatch
    );
    assert!(!has_permission(&fixture.grants, "", as_of));
}

#[test]
fn equal_priority_ties_break_on_role_name() {
    let mut fixture = Fixture::new();
    fixture.hold(
        role("Zeta Committee", 5, &[Permission::EventApprove]),
        timestamp(2024, 8, 1),
        None,
        &[],
    );
    let alpha_assignment = fixture.hold(
        role("Alpha Committee", 5, &[]),
        timestamp(2024, 8, 1),
        None,
        &[(Permission::EventApprove, false)],
    );
    let as_of = timestamp(2024, 9, 1);

    assert_eq!(
        resolve_permission(&fixture.grants, "event.approve", as_of),
        PermissionDecision::Override {
            assignment_id: alpha_assignment,
            granted: false,
        }
    );

    let names = active_roles(&fixture.grants, as_of)
        .into_iter()
        .map(|role| role.name().as_str().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alpha Committee", "Zeta Committee"]);
}

#[test]
fn grants_reject_foreign_overrides() {
    let role = student();
    let assignment = RoleAssignment::new(
        AssignmentId::new(),
        UserId::new(),
        role.role_id(),
        AcademicYearId::new(),
        timestamp(2024, 8, 1),
        None,
    );
    let Ok(assignment) = assignment else {
        panic!("assignment fixture should be valid");
    };

    let result = AssignmentGrants::new(
        assignment,
        role,
        [AssignmentPermissionOverride {
            assignment_id: AssignmentId::new(),
            permission: Permission::EventView,
            is_granted: false,
        }],
    );
    assert!(result.is_err());
}

#[test]
fn grants_reject_mismatched_role() {
    let assignment = RoleAssignment::new(
        AssignmentId::new(),
        UserId::new(),
        RoleId::new(),
        AcademicYearId::new(),
        timestamp(2024, 8, 1),
        None,
    );
    let Ok(assignment) = assignment else {
        panic!("assignment fixture should be valid");
    };

    assert!(AssignmentGrants::new(assignment, student(), []).is_err());
}

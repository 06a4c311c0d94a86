use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use orgrole_application::{
    AssignRoleInput, AuthorizationRepository, AuthorizationService, CreateRoleInput,
    RoleAdminRepository, RoleAdminService, SetOverrideInput, TransferRoleInput,
};
use orgrole_core::{AppError, UserId, UserIdentity};
use orgrole_domain::{
    AcademicYearId, AssignmentId, AssignmentPermissionOverride, Permission, PermissionDecision,
    Role, RoleAssignment, RoleId,
};

use super::InMemoryAccessControlRepository;
use crate::InMemoryAuditRepository;

fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single() {
        Some(value) => value,
        None => panic!("invalid fixture date {year}-{month}-{day}"),
    }
}

fn role(name: &str, priority: i32, permissions: &[Permission]) -> Role {
    let role = Role::new(RoleId::new(), name, None, priority, permissions.iter().copied());
    assert!(role.is_ok());
    role.unwrap_or_else(|_| unreachable!())
}

fn assignment(
    user_id: UserId,
    role: &Role,
    academic_year_id: AcademicYearId,
    ends_at: Option<DateTime<Utc>>,
) -> RoleAssignment {
    let assignment = RoleAssignment::new(
        AssignmentId::new(),
        user_id,
        role.role_id(),
        academic_year_id,
        timestamp(2024, 8, 1),
        ends_at,
    );
    assert!(assignment.is_ok());
    assignment.unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn insert_role_rejects_case_insensitive_duplicate_name() {
    let repository = InMemoryAccessControlRepository::new();

    let first = repository
        .insert_role(role("Treasurer", 3, &[Permission::FinancialView]))
        .await;
    assert!(first.is_ok());

    let second = repository.insert_role(role("treasurer", 5, &[])).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let listed = repository.list_roles().await;
    assert_eq!(listed.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn insert_role_folds_non_ascii_case_for_uniqueness() {
    let repository = InMemoryAccessControlRepository::new();

    assert!(repository.insert_role(role("Élève", 90, &[])).await.is_ok());
    let second = repository.insert_role(role("ÉLÈVE", 91, &[])).await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn update_role_with_stale_snapshot_keeps_stored_permissions() {
    let repository = InMemoryAccessControlRepository::new();
    let auditor = role("Auditor", 7, &[Permission::FinancialView]);
    assert!(repository.insert_role(auditor.clone()).await.is_ok());

    let attached = repository
        .attach_role_permission(auditor.role_id(), Permission::FinancialVerify)
        .await;
    assert!(matches!(attached, Ok(true)));

    let mut stale = auditor.clone();
    stale.set_priority(6);
    stale.detach_permission(Permission::FinancialView);
    assert!(repository.update_role(stale).await.is_ok());

    let stored = repository.find_role(auditor.role_id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref value))
            if value.priority() == 6
                && value.grants(Permission::FinancialView)
                && value.grants(Permission::FinancialVerify)
    ));
}

#[tokio::test]
async fn concurrent_attach_and_detach_apply_independently() {
    let repository = InMemoryAccessControlRepository::new();
    let auditor = role("Auditor", 7, &[Permission::ReportView]);
    assert!(repository.insert_role(auditor.clone()).await.is_ok());

    let (view, verify, report) = tokio::join!(
        repository.attach_role_permission(auditor.role_id(), Permission::FinancialView),
        repository.attach_role_permission(auditor.role_id(), Permission::FinancialVerify),
        repository.detach_role_permission(auditor.role_id(), Permission::ReportView),
    );
    assert!(matches!(view, Ok(true)));
    assert!(matches!(verify, Ok(true)));
    assert!(matches!(report, Ok(true)));

    let again = repository
        .attach_role_permission(auditor.role_id(), Permission::FinancialView)
        .await;
    assert!(matches!(again, Ok(false)));
    let missing = repository
        .detach_role_permission(RoleId::new(), Permission::FinancialView)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let stored = repository.find_role(auditor.role_id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref value))
            if value.grants(Permission::FinancialView)
                && value.grants(Permission::FinancialVerify)
                && !value.grants(Permission::ReportView)
    ));
}

#[tokio::test]
async fn list_assignments_for_user_returns_newest_first() {
    let repository = InMemoryAccessControlRepository::new();
    let student = role("Student", 99, &[Permission::EventView]);
    assert!(repository.insert_role(student.clone()).await.is_ok());
    let user_id = UserId::new();

    let mut expected = Vec::new();
    for year in [2022, 2024, 2023] {
        let Ok(held) = RoleAssignment::new(
            AssignmentId::new(),
            user_id,
            student.role_id(),
            AcademicYearId::new(),
            timestamp(year, 9, 1),
            None,
        ) else {
            panic!("assignment fixture should be valid");
        };
        assert!(repository.insert_assignment(held.clone()).await.is_ok());
        expected.push(held);
    }
    expected.sort_by_key(|held| std::cmp::Reverse(held.starts_at()));

    let listed = repository.list_assignments_for_user(user_id).await;
    assert!(matches!(listed, Ok(ref values) if values == &expected));
}

#[tokio::test]
async fn list_roles_orders_by_priority_then_name() {
    let repository = InMemoryAccessControlRepository::new();
    for (name, priority) in [("Student", 99), ("Treasurer", 3), ("Auditor", 3), ("President", 1)] {
        assert!(repository.insert_role(role(name, priority, &[])).await.is_ok());
    }

    let names: Vec<String> = repository
        .list_roles()
        .await
        .unwrap_or_default()
        .iter()
        .map(|value| value.name().as_str().to_owned())
        .collect();

    assert_eq!(names, ["President", "Auditor", "Treasurer", "Student"]);
}

#[tokio::test]
async fn insert_assignment_requires_role_and_unique_year() {
    let repository = InMemoryAccessControlRepository::new();
    let student = role("Student", 99, &[Permission::EventView]);
    assert!(repository.insert_role(student.clone()).await.is_ok());

    let user_id = UserId::new();
    let academic_year_id = AcademicYearId::new();
    let first = repository
        .insert_assignment(assignment(user_id, &student, academic_year_id, None))
        .await;
    assert!(first.is_ok());

    let duplicate = repository
        .insert_assignment(assignment(user_id, &student, academic_year_id, None))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let next_year = repository
        .insert_assignment(assignment(user_id, &student, AcademicYearId::new(), None))
        .await;
    assert!(next_year.is_ok());

    let missing_role = role("Ghost", 1, &[]);
    let orphan = repository
        .insert_assignment(assignment(user_id, &missing_role, academic_year_id, None))
        .await;
    assert!(matches!(orphan, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_role_is_blocked_by_assignments() {
    let repository = InMemoryAccessControlRepository::new();
    let student = role("Student", 99, &[]);
    assert!(repository.insert_role(student.clone()).await.is_ok());
    let held = assignment(UserId::new(), &student, AcademicYearId::new(), None);
    assert!(repository.insert_assignment(held.clone()).await.is_ok());

    let blocked = repository.delete_role(student.role_id()).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    assert!(repository.delete_assignment(held.assignment_id()).await.is_ok());
    assert!(repository.delete_role(student.role_id()).await.is_ok());
    assert!(matches!(
        repository.find_role(student.role_id()).await,
        Ok(None)
    ));
}

#[tokio::test]
async fn failed_transfer_leaves_source_open() {
    let repository = InMemoryAccessControlRepository::new();
    let president = role("President", 1, &[Permission::SystemRoleManage]);
    assert!(repository.insert_role(president.clone()).await.is_ok());

    let academic_year_id = AcademicYearId::new();
    let incoming = UserId::new();
    let source = assignment(UserId::new(), &president, academic_year_id, None);
    let existing = assignment(incoming, &president, academic_year_id, None);
    assert!(repository.insert_assignment(source.clone()).await.is_ok());
    assert!(repository.insert_assignment(existing).await.is_ok());

    let effective_at = timestamp(2025, 1, 1);
    let replacement = RoleAssignment::new(
        AssignmentId::new(),
        incoming,
        president.role_id(),
        academic_year_id,
        effective_at,
        None,
    );
    assert!(replacement.is_ok());
    let transferred = repository
        .transfer_assignment(
            source.assignment_id(),
            effective_at,
            replacement.unwrap_or_else(|_| unreachable!()),
        )
        .await;
    assert!(matches!(transferred, Err(AppError::Conflict(_))));

    let stored = repository.find_assignment(source.assignment_id()).await;
    assert!(matches!(stored, Ok(Some(ref value)) if !value.is_closed()));
}

#[tokio::test]
async fn grants_include_overrides_and_skip_inactive_assignments() {
    let repository = InMemoryAccessControlRepository::new();
    let auditor = role("Auditor", 7, &[Permission::FinancialVerify]);
    let treasurer = role("Treasurer", 3, &[Permission::FinancialView]);
    assert!(repository.insert_role(auditor.clone()).await.is_ok());
    assert!(repository.insert_role(treasurer.clone()).await.is_ok());

    let user_id = UserId::new();
    let active = assignment(user_id, &auditor, AcademicYearId::new(), None);
    let expired = assignment(
        user_id,
        &treasurer,
        AcademicYearId::new(),
        Some(timestamp(2024, 9, 30)),
    );
    assert!(repository.insert_assignment(active.clone()).await.is_ok());
    assert!(repository.insert_assignment(expired).await.is_ok());
    let saved = repository
        .save_override(AssignmentPermissionOverride {
            assignment_id: active.assignment_id(),
            permission: Permission::FinancialVerify,
            is_granted: false,
        })
        .await;
    assert!(saved.is_ok());

    let grants = repository
        .load_assignment_grants(user_id, timestamp(2024, 10, 1))
        .await
        .unwrap_or_default();

    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].assignment().assignment_id(), active.assignment_id());
    assert_eq!(
        grants[0].override_for(Permission::FinancialVerify),
        Some(false)
    );
}

#[tokio::test]
async fn save_override_requires_existing_assignment() {
    let repository = InMemoryAccessControlRepository::new();

    let saved = repository
        .save_override(AssignmentPermissionOverride {
            assignment_id: AssignmentId::new(),
            permission: Permission::EventView,
            is_granted: true,
        })
        .await;

    assert!(matches!(saved, Err(AppError::NotFound(_))));
}

struct Services {
    authorization: AuthorizationService,
    admin: RoleAdminService,
    chair: UserIdentity,
    audit: Arc<InMemoryAuditRepository>,
}

async fn services() -> Services {
    let repository = Arc::new(InMemoryAccessControlRepository::new());
    let audit = Arc::new(InMemoryAuditRepository::new());
    let authorization = AuthorizationService::new(repository.clone());
    let admin = RoleAdminService::new(
        authorization.clone(),
        repository.clone(),
        audit.clone(),
        audit.clone(),
    );

    let president = role(
        "President",
        1,
        &[Permission::SystemRoleManage, Permission::SystemAuditRead],
    );
    assert!(repository.insert_role(president.clone()).await.is_ok());
    let chair = UserIdentity::new(UserId::new(), "Chair", None);
    let seeded = repository
        .insert_assignment(assignment(
            chair.user_id(),
            &president,
            AcademicYearId::new(),
            None,
        ))
        .await;
    assert!(seeded.is_ok());

    Services {
        authorization,
        admin,
        chair,
        audit,
    }
}

#[tokio::test]
async fn administered_roles_drive_permission_checks() {
    let services = services().await;
    let as_of = timestamp(2024, 10, 1);
    let academic_year_id = AcademicYearId::new();

    let treasurer = services
        .admin
        .create_role(
            &services.chair,
            CreateRoleInput {
                name: "Treasurer".to_owned(),
                description: Some("Keeps the books".to_owned()),
                priority: 3,
                permissions: vec!["financial.view".to_owned(), "financial.create".to_owned()],
            },
            as_of,
        )
        .await;
    assert!(treasurer.is_ok());
    let treasurer = treasurer.unwrap_or_else(|_| unreachable!());

    let member = UserId::new();
    let held = services
        .admin
        .assign_role(
            &services.chair,
            AssignRoleInput {
                user_id: member,
                role_id: treasurer.role_id(),
                academic_year_id,
                starts_at: timestamp(2024, 8, 1),
                ends_at: None,
            },
            as_of,
        )
        .await;
    assert!(held.is_ok());
    let held = held.unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        services
            .authorization
            .has_permission(member, "financial.create", as_of)
            .await,
        Ok(true)
    ));

    let revoked = services
        .admin
        .set_override(
            &services.chair,
            SetOverrideInput {
                assignment_id: held.assignment_id(),
                permission: "financial.create".to_owned(),
                is_granted: false,
            },
            as_of,
        )
        .await;
    assert!(revoked.is_ok());

    let decision = services
        .authorization
        .resolve(member, "financial.create", as_of)
        .await;
    assert!(matches!(
        decision,
        Ok(PermissionDecision::Override { granted: false, .. })
    ));
    assert!(matches!(
        services
            .authorization
            .has_permission(member, "financial.view", as_of)
            .await,
        Ok(true)
    ));

    let successor = UserId::new();
    let effective_at = timestamp(2025, 2, 1);
    let transferred = services
        .admin
        .transfer_role(
            &services.chair,
            TransferRoleInput {
                assignment_id: held.assignment_id(),
                to_user_id: successor,
                effective_at,
            },
            as_of,
        )
        .await;
    assert!(transferred.is_ok());

    let after = timestamp(2025, 3, 1);
    assert!(matches!(
        services
            .authorization
            .has_permission(member, "financial.view", after)
            .await,
        Ok(false)
    ));
    assert!(matches!(
        services
            .authorization
            .has_permission(successor, "financial.create", after)
            .await,
        Ok(true)
    ));

    assert_eq!(services.audit.len().await, 4);
}

#[tokio::test]
async fn admin_operations_require_manage_permission() {
    let services = services().await;
    let outsider = UserIdentity::new(UserId::new(), "Outsider", None);

    let created = services
        .admin
        .create_role(
            &outsider,
            CreateRoleInput {
                name: "Shadow".to_owned(),
                description: None,
                priority: 0,
                permissions: vec!["system.role.manage".to_owned()],
            },
            timestamp(2024, 10, 1),
        )
        .await;

    assert!(matches!(created, Err(AppError::Forbidden(_))));
    assert_eq!(services.audit.len().await, 0);
}

#[tokio::test]
async fn transfer_leaves_exactly_one_holder_at_every_instant() {
    let services = services().await;
    let as_of = timestamp(2024, 10, 1);

    let treasurer = services
        .admin
        .create_role(
            &services.chair,
            CreateRoleInput {
                name: "Treasurer".to_owned(),
                description: None,
                priority: 3,
                permissions: vec!["financial.view".to_owned()],
            },
            as_of,
        )
        .await;
    let Ok(treasurer) = treasurer else {
        panic!("role fixture should be created");
    };

    let outgoing = UserId::new();
    let held = services
        .admin
        .assign_role(
            &services.chair,
            AssignRoleInput {
                user_id: outgoing,
                role_id: treasurer.role_id(),
                academic_year_id: AcademicYearId::new(),
                starts_at: timestamp(2024, 8, 1),
                ends_at: None,
            },
            as_of,
        )
        .await;
    let Ok(held) = held else {
        panic!("assignment fixture should be created");
    };

    let incoming = UserId::new();
    let effective_at = timestamp(2025, 2, 1);
    let transferred = services
        .admin
        .transfer_role(
            &services.chair,
            TransferRoleInput {
                assignment_id: held.assignment_id(),
                to_user_id: incoming,
                effective_at,
            },
            as_of,
        )
        .await;
    assert!(transferred.is_ok());

    let just_before = effective_at - chrono::Duration::microseconds(1);
    for (instant, outgoing_holds, incoming_holds) in
        [(just_before, true, false), (effective_at, false, true)]
    {
        let outgoing_result = services
            .authorization
            .has_role(outgoing, "Treasurer", instant)
            .await;
        let incoming_result = services
            .authorization
            .has_role(incoming, "Treasurer", instant)
            .await;

        assert!(matches!(outgoing_result, Ok(value) if value == outgoing_holds));
        assert!(matches!(incoming_result, Ok(value) if value == incoming_holds));
    }
}

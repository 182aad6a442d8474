//! End-to-end decision scenarios across the full stack: permission table,
//! relationship grants, scope resolution and instance checks.

use std::sync::Arc;

use audit_trail::{AuditRepository, AuditTrail, InMemoryAuditRepository};
use authz_engine::{
    AuthorizationEngine, DenialKind, ScopeFilter, ScopeResolver, SpecialAccessResolver,
};
use care_identity::{CallerIdentity, InMemoryDirectory, Organization, Role};
use grant_store::{AssignmentData, InMemoryGrantRepository, RelationshipGrantStore};
use permission_registry::{seed, Action, InMemoryPermissionRepository, PermissionRegistry};
use uuid::Uuid;

struct World {
    engine: AuthorizationEngine,
    grants: Arc<RelationshipGrantStore>,
    directory: Arc<InMemoryDirectory>,
    audit: Arc<InMemoryAuditRepository>,
}

async fn world() -> World {
    let permissions = Arc::new(InMemoryPermissionRepository::new());
    seed::seed_defaults(permissions.as_ref()).await.unwrap();
    let registry = Arc::new(PermissionRegistry::new(permissions));

    let repo = Arc::new(InMemoryGrantRepository::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let audit_repo = Arc::new(InMemoryAuditRepository::new());
    let audit = Arc::new(AuditTrail::new(audit_repo.clone()));
    let grants = Arc::new(RelationshipGrantStore::new(
        repo.clone(),
        repo,
        directory.clone(),
        directory.clone(),
        audit.clone(),
    ));

    let scopes = Arc::new(ScopeResolver::new(grants.clone()));
    let special = Arc::new(SpecialAccessResolver::new(directory.clone(), grants.clone()));
    let engine = AuthorizationEngine::new(registry, scopes, special, audit);

    World {
        engine,
        grants,
        directory,
        audit: audit_repo,
    }
}

fn org(directory: &InMemoryDirectory) -> Uuid {
    let organization = Organization::new(Uuid::new_v4(), "Test Org");
    let id = organization.id;
    directory.insert_organization(organization);
    id
}

#[tokio::test]
async fn org_admin_cannot_read_patients_of_another_organization() {
    let w = world().await;
    let org_a = org(&w.directory);
    let org_b = org(&w.directory);
    let admin = CallerIdentity::new(Uuid::new_v4(), Role::OrgAdmin, org_a);
    let foreign_patient = w.directory.seed_profile(Role::Patient, org_b);

    // The role-level permission holds.
    let type_level = w.engine.check(&admin, "patients", Action::Read).await.unwrap();
    assert!(type_level.allowed);

    // The particular record does not.
    let instance = w
        .engine
        .check_resource(&admin, "patients", Action::Read, foreign_patient)
        .await
        .unwrap();
    assert!(!instance.allowed);
    assert_eq!(
        instance.reason.unwrap().kind,
        DenialKind::OwnershipRequired
    );
}

#[tokio::test]
async fn caretaker_access_follows_the_assignment_lifecycle() {
    let w = world().await;
    let org_id = org(&w.directory);
    let manager = CallerIdentity::new(Uuid::new_v4(), Role::CareManager, org_id);
    let caretaker_id = w.directory.seed_profile(Role::Caretaker, org_id);
    let patient_id = w.directory.seed_profile(Role::Patient, org_id);
    let caretaker = CallerIdentity::new(caretaker_id, Role::Caretaker, org_id);

    // No grant yet: type-level read passes, the record itself does not.
    let before = w
        .engine
        .check_resource(&caretaker, "patients", Action::Read, patient_id)
        .await
        .unwrap();
    assert!(!before.allowed);

    w.grants
        .create_or_renew_assignment(&manager, caretaker_id, patient_id, AssignmentData::default())
        .await
        .unwrap();

    let during = w
        .engine
        .check_resource(&caretaker, "patients", Action::Read, patient_id)
        .await
        .unwrap();
    assert!(during.allowed);

    w.grants
        .end_assignment(&manager, caretaker_id, patient_id, "care transfer")
        .await
        .unwrap();

    // No caching below the engine: the ended grant takes effect at once.
    let after = w
        .engine
        .check_resource(&caretaker, "patients", Action::Read, patient_id)
        .await
        .unwrap();
    assert!(!after.allowed);
    assert_eq!(after.reason.unwrap().kind, DenialKind::OwnershipRequired);
}

#[tokio::test]
async fn caretaker_scope_lists_exactly_the_active_patients() {
    let w = world().await;
    let org_id = org(&w.directory);
    let manager = CallerIdentity::new(Uuid::new_v4(), Role::CareManager, org_id);
    let caretaker_id = w.directory.seed_profile(Role::Caretaker, org_id);
    let caretaker = CallerIdentity::new(caretaker_id, Role::Caretaker, org_id);

    let patients: Vec<Uuid> = (0..3)
        .map(|_| w.directory.seed_profile(Role::Patient, org_id))
        .collect();
    for patient in &patients {
        w.grants
            .create_or_renew_assignment(&manager, caretaker_id, *patient, AssignmentData::default())
            .await
            .unwrap();
    }
    w.grants
        .end_assignment(&manager, caretaker_id, patients[2], "discharged")
        .await
        .unwrap();

    let scope = w.engine.scope_for(&caretaker, "patients").await.unwrap();
    let ScopeFilter::PatientSet(mut ids) = scope else {
        panic!("caretaker scope should be an explicit patient set");
    };
    ids.sort();
    let mut expected = vec![patients[0], patients[1]];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn patient_scope_is_self_only_and_self_access_allows() {
    let w = world().await;
    let org_id = org(&w.directory);
    let patient_id = w.directory.seed_profile(Role::Patient, org_id);
    let patient = CallerIdentity::new(patient_id, Role::Patient, org_id);

    let scope = w.engine.scope_for(&patient, "patients").await.unwrap();
    assert_eq!(scope, ScopeFilter::SelfOnly(patient_id));
    assert!(scope.permits(patient_id, org_id));
    assert!(!scope.permits(Uuid::new_v4(), org_id));

    let own_record = w
        .engine
        .check_resource(&patient, "patients", Action::Read, patient_id)
        .await
        .unwrap();
    assert!(own_record.allowed);
}

#[tokio::test]
async fn role_table_still_gates_actions_on_own_records() {
    let w = world().await;
    let org_id = org(&w.directory);
    let patient_id = w.directory.seed_profile(Role::Patient, org_id);
    let patient = CallerIdentity::new(patient_id, Role::Patient, org_id);

    // No row grants patient delete, so owning the record does not help.
    let decision = w
        .engine
        .check_resource(&patient, "patients", Action::Delete, patient_id)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason.unwrap().kind,
        DenialKind::PermissionDenied
    );

    // caller holds no rows at all, own record included.
    let caller = CallerIdentity::new(Uuid::new_v4(), Role::Caller, org_id);
    let decision = w
        .engine
        .check_resource(&caller, "patients", Action::Read, caller.id)
        .await
        .unwrap();
    assert!(!decision.allowed);
}

#[tokio::test]
async fn instance_decisions_are_audited_against_the_record() {
    let w = world().await;
    let org_id = org(&w.directory);
    let admin = CallerIdentity::new(Uuid::new_v4(), Role::OrgAdmin, org_id);
    let patient_id = w.directory.seed_profile(Role::Patient, org_id);

    let decision = w
        .engine
        .check_resource(&admin, "patients", Action::Read, patient_id)
        .await
        .unwrap();
    assert!(decision.allowed);

    // The audit write lands on a spawned task; poll briefly for it.
    let mut entries = Vec::new();
    for _ in 0..50 {
        entries = w
            .audit
            .for_resource("patients", &patient_id.to_string(), 10)
            .await
            .unwrap();
        if !entries.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_id, admin.id);
    assert_eq!(entries[0].resource_id, Some(patient_id.to_string()));
}

#[tokio::test]
async fn super_admin_bypasses_scope_and_instance_checks() {
    let w = world().await;
    let org_id = org(&w.directory);
    let root = CallerIdentity::new(Uuid::new_v4(), Role::SuperAdmin, org_id);
    let stranger = w.directory.seed_profile(Role::Patient, Uuid::new_v4());

    assert_eq!(
        w.engine.scope_for(&root, "patients").await.unwrap(),
        ScopeFilter::Unrestricted
    );
    let decision = w
        .engine
        .check_resource(&root, "patients", Action::Delete, stranger)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn composite_checks_report_every_missing_permission() {
    let w = world().await;
    let org_id = org(&w.directory);
    let caretaker = CallerIdentity::new(Uuid::new_v4(), Role::Caretaker, org_id);

    let any = w
        .engine
        .check_any(
            &caretaker,
            &[("organizations", Action::Delete), ("patients", Action::Read)],
        )
        .await
        .unwrap();
    assert!(any.allowed);

    let all = w
        .engine
        .check_all(
            &caretaker,
            &[
                ("patients", Action::Read),
                ("organizations", Action::Delete),
                ("mentors", Action::Authorize),
            ],
        )
        .await
        .unwrap();
    assert!(!all.allowed);
    assert_eq!(
        all.failed,
        vec![
            ("organizations".to_string(), Action::Delete),
            ("mentors".to_string(), Action::Authorize),
        ]
    );
}

#[tokio::test]
async fn cached_decisions_survive_until_invalidation() {
    let permissions = Arc::new(InMemoryPermissionRepository::new());
    seed::seed_defaults(permissions.as_ref()).await.unwrap();
    let registry = Arc::new(PermissionRegistry::new(permissions));

    let repo = Arc::new(InMemoryGrantRepository::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let audit = Arc::new(AuditTrail::new(Arc::new(InMemoryAuditRepository::new())));
    let grants = Arc::new(RelationshipGrantStore::new(
        repo.clone(),
        repo,
        directory.clone(),
        directory.clone(),
        audit.clone(),
    ));
    let scopes = Arc::new(ScopeResolver::new(grants.clone()));
    let special = Arc::new(SpecialAccessResolver::new(directory.clone(), grants));
    let engine =
        AuthorizationEngine::new(registry.clone(), scopes, special, audit).with_cache();

    let org_id = Uuid::new_v4();
    let caretaker = CallerIdentity::new(Uuid::new_v4(), Role::Caretaker, org_id);

    let first = engine.check(&caretaker, "patients", Action::Read).await.unwrap();
    assert!(first.allowed);

    registry
        .deactivate(Role::Caretaker, "patients", "read")
        .await
        .unwrap();

    // Stale until the table change is signalled.
    let stale = engine.check(&caretaker, "patients", Action::Read).await.unwrap();
    assert!(stale.allowed);

    engine.invalidate_cache();
    let fresh = engine.check(&caretaker, "patients", Action::Read).await.unwrap();
    assert!(!fresh.allowed);
}

//! Platform-operator baseline permission table.
//!
//! Seeded at bootstrap and rarely mutated afterwards. `super_admin` has no
//! rows here; it matches everything by convention. `caller` has none either,
//! it is unprivileged throughout the system.

use crate::models::{Action, ActionSpec, PermissionEntry, ResourceSpec};
use crate::repository::PermissionRepository;
use care_identity::Role;
use error_common::Result;

fn entry(role: Role, resource: &str, action: Action) -> PermissionEntry {
    PermissionEntry::new(role, ResourceSpec::named(resource), ActionSpec::Of(action))
}

fn wildcard_actions(role: Role, resource: &str) -> PermissionEntry {
    PermissionEntry::new(role, ResourceSpec::named(resource), ActionSpec::Any)
}

/// The default permission table.
pub fn default_entries() -> Vec<PermissionEntry> {
    use Action::*;

    let mut entries = Vec::new();

    // org_admin manages everything inside the organization boundary.
    for resource in ["patients", "caretakers", "mentors", "care_managers"] {
        entries.push(wildcard_actions(Role::OrgAdmin, resource));
    }
    entries.push(entry(Role::OrgAdmin, "organizations", Read));
    entries.push(entry(Role::OrgAdmin, "organizations", Update));
    entries.push(entry(Role::OrgAdmin, "audit_logs", Read));

    // care_manager coordinates assignments and mentor authorizations.
    for action in [Create, Read, Update, Assign] {
        entries.push(entry(Role::CareManager, "patients", action));
    }
    entries.push(entry(Role::CareManager, "caretakers", Read));
    entries.push(entry(Role::CareManager, "caretakers", Assign));
    entries.push(entry(Role::CareManager, "mentors", Read));
    entries.push(entry(Role::CareManager, "mentors", Authorize));
    entries.push(entry(Role::CareManager, "mentors", Revoke));

    // caretaker works with assigned patients' day-to-day records.
    entries.push(entry(Role::Caretaker, "patients", Read));
    entries.push(entry(Role::Caretaker, "patients", Update));
    entries.push(entry(Role::Caretaker, "call_logs", Create));
    entries.push(entry(Role::Caretaker, "call_logs", Read));
    entries.push(entry(Role::Caretaker, "health_journal", Create));
    entries.push(entry(Role::Caretaker, "health_journal", Read));

    // patient_mentor reads what their authorization's capability set allows.
    entries.push(entry(Role::PatientMentor, "patients", Read));
    entries.push(entry(Role::PatientMentor, "health_journal", Read));
    entries.push(entry(Role::PatientMentor, "call_logs", Read));

    // patient acts on their own records and manages their own mentors.
    entries.push(entry(Role::Patient, "profile", Read));
    entries.push(entry(Role::Patient, "profile", Update));
    entries.push(entry(Role::Patient, "patients", Read));
    entries.push(entry(Role::Patient, "caretakers", Read));
    entries.push(entry(Role::Patient, "mentors", Read));
    entries.push(entry(Role::Patient, "mentors", Authorize));
    entries.push(entry(Role::Patient, "mentors", Revoke));

    entries
}

/// Seed the default table into a repository.
pub async fn seed_defaults(repository: &dyn PermissionRepository) -> Result<()> {
    for entry in default_entries() {
        repository.upsert(entry).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PermissionRegistry;
    use crate::repository::InMemoryPermissionRepository;
    use std::sync::Arc;

    #[tokio::test]
    async fn seeded_table_covers_core_role_grants() {
        let repo = Arc::new(InMemoryPermissionRepository::new());
        seed_defaults(repo.as_ref()).await.unwrap();
        let registry = PermissionRegistry::new(repo);

        assert!(registry
            .has_permission(Role::CareManager, "patients", Action::Assign)
            .await
            .unwrap());
        assert!(registry
            .has_permission(Role::Patient, "mentors", Action::Authorize)
            .await
            .unwrap());
        assert!(registry
            .has_permission(Role::OrgAdmin, "caretakers", Action::Delete)
            .await
            .unwrap());

        // caller carries no rows at all.
        assert!(!registry
            .has_permission(Role::Caller, "patients", Action::Read)
            .await
            .unwrap());
    }

    #[test]
    fn no_rows_for_super_admin_or_caller() {
        for entry in default_entries() {
            assert_ne!(entry.role, Role::SuperAdmin);
            assert_ne!(entry.role, Role::Caller);
        }
    }
}

use crate::models::{
    AssignmentNote, AssignmentStatus, AuthorizationStatus, CaretakerAssignment, MentorAuthorization,
    MentorCapability,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use error_common::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

/// Storage for caretaker assignments, keyed by (caretaker_id, patient_id).
///
/// Every method is a single-document operation and must be atomic at that
/// granularity: concurrent mutations of the same key serialize, different
/// keys need no coordination.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Insert or replace the document for its (caretaker, patient) key.
    async fn upsert(&self, assignment: CaretakerAssignment) -> Result<CaretakerAssignment>;

    async fn find(&self, caretaker_id: Uuid, patient_id: Uuid)
        -> Result<Option<CaretakerAssignment>>;

    /// All assignments held by one caretaker, any status.
    async fn for_caretaker(&self, caretaker_id: Uuid) -> Result<Vec<CaretakerAssignment>>;

    /// Distinct patients with a status-`active` assignment in the
    /// organization. Schedule windows are ignored here: capacity counts
    /// enrolled patients, not patients currently inside a shift window.
    async fn active_patients(&self, organization_id: Uuid) -> Result<Vec<Uuid>>;

    /// Set status to `inactive` and append a note, atomically. Returns the
    /// updated document, or `None` when no document exists for the key.
    async fn end(
        &self,
        caretaker_id: Uuid,
        patient_id: Uuid,
        note: AssignmentNote,
    ) -> Result<Option<CaretakerAssignment>>;
}

/// Storage for mentor authorizations, keyed by (mentor_id, patient_id).
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    async fn upsert(&self, authorization: MentorAuthorization) -> Result<MentorAuthorization>;

    async fn find(&self, mentor_id: Uuid, patient_id: Uuid)
        -> Result<Option<MentorAuthorization>>;

    /// All authorizations held by one mentor, any status.
    async fn for_mentor(&self, mentor_id: Uuid) -> Result<Vec<MentorAuthorization>>;

    /// Set status to `revoked` and stamp the revocation fields, atomically.
    /// Restamps on an already-revoked document. `None` when the key is
    /// unknown.
    async fn revoke(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        revoked_by: Uuid,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<Option<MentorAuthorization>>;

    /// Replace the capability set, atomically. `None` when the key is
    /// unknown.
    async fn set_permissions(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        permissions: BTreeSet<MentorCapability>,
        at: DateTime<Utc>,
    ) -> Result<Option<MentorAuthorization>>;
}

/// In-memory grant repositories for tests and development. DashMap's
/// per-entry locking gives the single-document atomicity the traits ask for.
pub struct InMemoryGrantRepository {
    assignments: Arc<DashMap<(Uuid, Uuid), CaretakerAssignment>>,
    authorizations: Arc<DashMap<(Uuid, Uuid), MentorAuthorization>>,
}

impl InMemoryGrantRepository {
    pub fn new() -> Self {
        Self {
            assignments: Arc::new(DashMap::new()),
            authorizations: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryGrantRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryGrantRepository {
    async fn upsert(&self, assignment: CaretakerAssignment) -> Result<CaretakerAssignment> {
        let key = (assignment.caretaker_id, assignment.patient_id);
        self.assignments.insert(key, assignment.clone());
        Ok(assignment)
    }

    async fn find(
        &self,
        caretaker_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<CaretakerAssignment>> {
        Ok(self
            .assignments
            .get(&(caretaker_id, patient_id))
            .map(|a| a.value().clone()))
    }

    async fn for_caretaker(&self, caretaker_id: Uuid) -> Result<Vec<CaretakerAssignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.caretaker_id == caretaker_id)
            .map(|a| a.value().clone())
            .collect())
    }

    async fn active_patients(&self, organization_id: Uuid) -> Result<Vec<Uuid>> {
        let mut patients: Vec<Uuid> = self
            .assignments
            .iter()
            .filter(|a| {
                a.organization_id == organization_id && a.status == AssignmentStatus::Active
            })
            .map(|a| a.patient_id)
            .collect();
        patients.sort();
        patients.dedup();
        Ok(patients)
    }

    async fn end(
        &self,
        caretaker_id: Uuid,
        patient_id: Uuid,
        note: AssignmentNote,
    ) -> Result<Option<CaretakerAssignment>> {
        match self.assignments.get_mut(&(caretaker_id, patient_id)) {
            Some(mut entry) => {
                entry.status = AssignmentStatus::Inactive;
                entry.updated_at = note.noted_at;
                entry.notes.push(note);
                Ok(Some(entry.value().clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryGrantRepository {
    async fn upsert(&self, authorization: MentorAuthorization) -> Result<MentorAuthorization> {
        let key = (authorization.mentor_id, authorization.patient_id);
        self.authorizations.insert(key, authorization.clone());
        Ok(authorization)
    }

    async fn find(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<MentorAuthorization>> {
        Ok(self
            .authorizations
            .get(&(mentor_id, patient_id))
            .map(|a| a.value().clone()))
    }

    async fn for_mentor(&self, mentor_id: Uuid) -> Result<Vec<MentorAuthorization>> {
        Ok(self
            .authorizations
            .iter()
            .filter(|a| a.mentor_id == mentor_id)
            .map(|a| a.value().clone())
            .collect())
    }

    async fn revoke(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        revoked_by: Uuid,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<Option<MentorAuthorization>> {
        match self.authorizations.get_mut(&(mentor_id, patient_id)) {
            Some(mut entry) => {
                entry.status = AuthorizationStatus::Revoked;
                entry.revoked_at = Some(at);
                entry.revoked_by = Some(revoked_by);
                entry.revocation_reason = Some(reason);
                entry.updated_at = at;
                Ok(Some(entry.value().clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_permissions(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        permissions: BTreeSet<MentorCapability>,
        at: DateTime<Utc>,
    ) -> Result<Option<MentorAuthorization>> {
        match self.authorizations.get_mut(&(mentor_id, patient_id)) {
            Some(mut entry) => {
                entry.permissions = permissions;
                entry.updated_at = at;
                Ok(Some(entry.value().clone()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(caretaker: Uuid, patient: Uuid, org: Uuid) -> CaretakerAssignment {
        let now = Utc::now();
        CaretakerAssignment {
            id: Uuid::new_v4(),
            caretaker_id: caretaker,
            patient_id: patient,
            organization_id: org,
            assigned_by: Uuid::new_v4(),
            status: AssignmentStatus::Active,
            schedule: None,
            notes: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_is_keyed_by_pair() {
        let repo = InMemoryGrantRepository::new();
        let (caretaker, patient, org) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        AssignmentRepository::upsert(&repo, assignment(caretaker, patient, org))
            .await
            .unwrap();
        AssignmentRepository::upsert(&repo, assignment(caretaker, patient, org))
            .await
            .unwrap();

        assert_eq!(repo.for_caretaker(caretaker).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn active_patients_is_distinct_per_organization() {
        let repo = InMemoryGrantRepository::new();
        let org = Uuid::new_v4();
        let other_org = Uuid::new_v4();
        let patient = Uuid::new_v4();

        // Same patient assigned to two caretakers: one distinct patient.
        AssignmentRepository::upsert(&repo, assignment(Uuid::new_v4(), patient, org))
            .await
            .unwrap();
        AssignmentRepository::upsert(&repo, assignment(Uuid::new_v4(), patient, org))
            .await
            .unwrap();
        AssignmentRepository::upsert(&repo, assignment(Uuid::new_v4(), Uuid::new_v4(), other_org))
            .await
            .unwrap();

        assert_eq!(repo.active_patients(org).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_appends_note_and_flips_status() {
        let repo = InMemoryGrantRepository::new();
        let (caretaker, patient, org) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        AssignmentRepository::upsert(&repo, assignment(caretaker, patient, org))
            .await
            .unwrap();

        let note = AssignmentNote {
            author_id: Uuid::new_v4(),
            text: "patient moved away".to_string(),
            noted_at: Utc::now(),
        };
        let ended = repo.end(caretaker, patient, note).await.unwrap().unwrap();
        assert_eq!(ended.status, AssignmentStatus::Inactive);
        assert_eq!(ended.notes.len(), 1);

        // Unknown key reports nothing to end.
        let missing = repo
            .end(
                Uuid::new_v4(),
                patient,
                AssignmentNote {
                    author_id: Uuid::new_v4(),
                    text: "x".to_string(),
                    noted_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

use crate::models::{
    AssignmentData, AssignmentNote, AssignmentStatus, AuthorizationData, AuthorizationStatus,
    CaretakerAssignment, MentorAuthorization, MentorCapability,
};
use crate::repository::{AssignmentRepository, AuthorizationRepository};
use audit_trail::{AuditEvent, AuditOutcome, AuditTrail};
use care_identity::{CallerIdentity, OrganizationDirectory, ProfileDirectory, Role};
use chrono::{DateTime, Utc};
use error_common::{AccessError, Result};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Actor-gated mutation surface over the two grant kinds.
///
/// Collaborator stores arrive by constructor injection; every mutation is
/// audited on the fire-and-forget path, so an audit outage never fails the
/// grant operation itself.
pub struct RelationshipGrantStore {
    assignments: Arc<dyn AssignmentRepository>,
    authorizations: Arc<dyn AuthorizationRepository>,
    profiles: Arc<dyn ProfileDirectory>,
    organizations: Arc<dyn OrganizationDirectory>,
    audit: Arc<AuditTrail>,
}

impl RelationshipGrantStore {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        authorizations: Arc<dyn AuthorizationRepository>,
        profiles: Arc<dyn ProfileDirectory>,
        organizations: Arc<dyn OrganizationDirectory>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            assignments,
            authorizations,
            profiles,
            organizations,
            audit,
        }
    }

    // =========================================================================
    // Caretaker assignments
    // =========================================================================

    /// Create a caretaker↔patient assignment, or renew the existing one for
    /// the pair. Renewal updates the document in place and resets status to
    /// `active`.
    pub async fn create_or_renew_assignment(
        &self,
        actor: &CallerIdentity,
        caretaker_id: Uuid,
        patient_id: Uuid,
        data: AssignmentData,
    ) -> Result<CaretakerAssignment> {
        self.require_grant_admin(actor, "caretakers", "assign")?;

        let caretaker = self
            .profiles
            .require_role(caretaker_id, Role::Caretaker, "caretakerId")
            .await?;
        let patient = self
            .profiles
            .require_role(patient_id, Role::Patient, "patientId")
            .await?;

        // Both parties must share an organization; non-super-admin actors
        // must also belong to it themselves.
        if caretaker.organization_id != patient.organization_id {
            return Err(AccessError::validation(
                "organizationId",
                "caretaker and patient must belong to the same organization",
            ));
        }
        if actor.role != Role::SuperAdmin && caretaker.organization_id != actor.organization_id {
            return Err(AccessError::validation(
                "organizationId",
                "caretaker and patient must belong to the actor's organization",
            ));
        }

        let existing = self.assignments.find(caretaker_id, patient_id).await?;
        self.check_patient_capacity(patient.organization_id, patient_id)
            .await?;

        let now = Utc::now();
        let mut assignment = match existing {
            Some(mut current) => {
                current.status = AssignmentStatus::Active;
                current.assigned_by = actor.id;
                current.schedule = data.schedule;
                current.updated_at = now;
                current
            }
            None => CaretakerAssignment {
                id: Uuid::new_v4(),
                caretaker_id,
                patient_id,
                organization_id: patient.organization_id,
                assigned_by: actor.id,
                status: AssignmentStatus::Active,
                schedule: data.schedule,
                notes: vec![],
                created_at: now,
                updated_at: now,
            },
        };
        if let Some(text) = data.note {
            assignment.notes.push(AssignmentNote {
                author_id: actor.id,
                text,
                noted_at: now,
            });
        }

        let assignment = self.assignments.upsert(assignment).await?;
        info!(caretaker = %caretaker_id, patient = %patient_id, "caretaker assignment active");

        let _ = self.audit.record(
            AuditEvent::new(actor.id, "caretaker_assigned", AuditOutcome::Success)
                .resource("caretakers", caretaker_id)
                .details(json!({
                    "caretakerId": caretaker_id,
                    "patientId": patient_id,
                    "organizationId": patient.organization_id,
                })),
        );
        Ok(assignment)
    }

    /// End an assignment: status becomes `inactive` and a timestamped note
    /// is appended. History is retained, nothing is deleted.
    pub async fn end_assignment(
        &self,
        actor: &CallerIdentity,
        caretaker_id: Uuid,
        patient_id: Uuid,
        reason: &str,
    ) -> Result<CaretakerAssignment> {
        self.require_grant_admin(actor, "caretakers", "assign")?;

        let existing = self
            .assignments
            .find(caretaker_id, patient_id)
            .await?
            .ok_or_else(|| AccessError::not_found("assignment", format!("{caretaker_id}/{patient_id}")))?;
        if actor.role != Role::SuperAdmin && existing.organization_id != actor.organization_id {
            return Err(AccessError::validation(
                "organizationId",
                "assignment belongs to another organization",
            ));
        }

        let note = AssignmentNote {
            author_id: actor.id,
            text: reason.to_string(),
            noted_at: Utc::now(),
        };
        let ended = self
            .assignments
            .end(caretaker_id, patient_id, note)
            .await?
            .ok_or_else(|| AccessError::not_found("assignment", format!("{caretaker_id}/{patient_id}")))?;

        let _ = self.audit.record(
            AuditEvent::new(actor.id, "caretaker_assignment_ended", AuditOutcome::Success)
                .resource("caretakers", caretaker_id)
                .details(json!({
                    "caretakerId": caretaker_id,
                    "patientId": patient_id,
                    "reason": reason,
                })),
        );
        Ok(ended)
    }

    // =========================================================================
    // Mentor authorizations
    // =========================================================================

    /// Authorize a mentor for a patient, or re-authorize the existing pair.
    /// Re-authorization upserts the same document and resets status to
    /// `active`, clearing any previous revocation.
    pub async fn authorize_mentor(
        &self,
        actor: &CallerIdentity,
        mentor_id: Uuid,
        patient_id: Uuid,
        data: AuthorizationData,
    ) -> Result<MentorAuthorization> {
        let patient_self = actor.id == patient_id;
        if !patient_self && !actor.role.is_grant_admin() {
            return Err(AccessError::permission_denied("mentors", "authorize"));
        }

        let mentor = self
            .profiles
            .require_role(mentor_id, Role::PatientMentor, "mentorId")
            .await?;
        let patient = self
            .profiles
            .require_role(patient_id, Role::Patient, "patientId")
            .await?;

        // Admin-class actors stay inside their organization; the patient
        // may authorize across organizations, which is flagged for audit.
        if actor.role.is_grant_admin() && actor.role != Role::SuperAdmin {
            if mentor.organization_id != actor.organization_id
                || patient.organization_id != actor.organization_id
            {
                return Err(AccessError::validation(
                    "organizationId",
                    "mentor and patient must belong to the actor's organization",
                ));
            }
        }
        let cross_organization = mentor.organization_id != patient.organization_id;

        let permissions = match data.permissions {
            Some(raw) => parse_capabilities(&raw)?,
            None => MentorCapability::default_set(),
        };

        let now = Utc::now();
        let existing = self.authorizations.find(mentor_id, patient_id).await?;
        let authorization = match existing {
            Some(mut current) => {
                current.status = AuthorizationStatus::Active;
                current.authorized_by = actor.id;
                current.permissions = permissions;
                current.access_schedule = data.access_schedule;
                current.cross_organization = cross_organization;
                current.revoked_at = None;
                current.revoked_by = None;
                current.revocation_reason = None;
                current.updated_at = now;
                current
            }
            None => MentorAuthorization {
                id: Uuid::new_v4(),
                mentor_id,
                patient_id,
                authorized_by: actor.id,
                status: AuthorizationStatus::Active,
                permissions,
                access_schedule: data.access_schedule,
                cross_organization,
                revoked_at: None,
                revoked_by: None,
                revocation_reason: None,
                created_at: now,
                updated_at: now,
            },
        };

        let authorization = self.authorizations.upsert(authorization).await?;
        info!(mentor = %mentor_id, patient = %patient_id, "mentor authorization active");

        let mut details = json!({
            "mentorId": mentor_id,
            "patientId": patient_id,
        });
        if patient_self && cross_organization {
            details["crossOrgAuth"] = json!(true);
        }
        let _ = self.audit.record(
            AuditEvent::new(actor.id, "mentor_authorized", AuditOutcome::Success)
                .resource("mentors", mentor_id)
                .details(details),
        );
        Ok(authorization)
    }

    /// Revoke an authorization. Terminal until the pair is re-authorized;
    /// revoking an already-revoked grant restamps the revocation fields
    /// without erroring.
    pub async fn revoke_authorization(
        &self,
        actor: &CallerIdentity,
        mentor_id: Uuid,
        patient_id: Uuid,
        reason: &str,
    ) -> Result<MentorAuthorization> {
        let self_party = actor.id == patient_id || actor.id == mentor_id;
        if !self_party && !actor.role.is_grant_admin() {
            return Err(AccessError::permission_denied("mentors", "revoke"));
        }
        if !self_party && actor.role != Role::SuperAdmin {
            let patient = self.profiles.require_profile(patient_id).await?;
            if patient.organization_id != actor.organization_id {
                return Err(AccessError::validation(
                    "organizationId",
                    "authorization belongs to another organization",
                ));
            }
        }

        let revoked = self
            .authorizations
            .revoke(mentor_id, patient_id, actor.id, reason.to_string(), Utc::now())
            .await?
            .ok_or_else(|| {
                AccessError::not_found("authorization", format!("{mentor_id}/{patient_id}"))
            })?;

        let _ = self.audit.record(
            AuditEvent::new(actor.id, "mentor_authorization_revoked", AuditOutcome::Success)
                .resource("mentors", mentor_id)
                .details(json!({
                    "mentorId": mentor_id,
                    "patientId": patient_id,
                    "reason": reason,
                })),
        );
        Ok(revoked)
    }

    /// Replace an authorization's capability set. All-or-nothing: a single
    /// unknown capability string rejects the whole update.
    pub async fn update_permissions(
        &self,
        actor: &CallerIdentity,
        mentor_id: Uuid,
        patient_id: Uuid,
        new_permissions: &[String],
    ) -> Result<MentorAuthorization> {
        let patient_self = actor.id == patient_id;
        if !patient_self && !actor.role.is_grant_admin() {
            return Err(AccessError::permission_denied("mentors", "authorize"));
        }
        // Same organization boundary as authorize: admin-class actors may
        // only touch grants whose parties live in their own organization.
        if !patient_self && actor.role != Role::SuperAdmin {
            let mentor = self.profiles.require_profile(mentor_id).await?;
            let patient = self.profiles.require_profile(patient_id).await?;
            if mentor.organization_id != actor.organization_id
                || patient.organization_id != actor.organization_id
            {
                return Err(AccessError::validation(
                    "organizationId",
                    "authorization belongs to another organization",
                ));
            }
        }

        // Validate the whole list before touching the store.
        let permissions = parse_capabilities(new_permissions)?;

        let previous = self
            .authorizations
            .find(mentor_id, patient_id)
            .await?
            .ok_or_else(|| {
                AccessError::not_found("authorization", format!("{mentor_id}/{patient_id}"))
            })?;

        let updated = self
            .authorizations
            .set_permissions(mentor_id, patient_id, permissions, Utc::now())
            .await?
            .ok_or_else(|| {
                AccessError::not_found("authorization", format!("{mentor_id}/{patient_id}"))
            })?;

        let _ = self.audit.record(
            AuditEvent::new(actor.id, "mentor_permissions_updated", AuditOutcome::Success)
                .resource("mentors", mentor_id)
                .previous_values(json!({
                    "permissions": previous.permissions,
                }))
                .new_values(json!({
                    "permissions": updated.permissions,
                })),
        );
        Ok(updated)
    }

    /// Does this mentor currently hold `capability` for this patient?
    pub async fn has_permission(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        capability: MentorCapability,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .authorizations
            .find(mentor_id, patient_id)
            .await?
            .map(|auth| auth.permits(capability, now))
            .unwrap_or(false))
    }

    // =========================================================================
    // Read views used by scope and special-access resolution
    // =========================================================================

    /// Patients the caretaker currently has an active assignment to.
    pub async fn active_patient_ids_for_caretaker(
        &self,
        caretaker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        Ok(self
            .assignments
            .for_caretaker(caretaker_id)
            .await?
            .into_iter()
            .filter(|a| a.is_active(now))
            .map(|a| a.patient_id)
            .collect())
    }

    /// Patients the mentor currently holds an active authorization for.
    pub async fn active_patient_ids_for_mentor(
        &self,
        mentor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        Ok(self
            .authorizations
            .for_mentor(mentor_id)
            .await?
            .into_iter()
            .filter(|a| a.is_active(now))
            .map(|a| a.patient_id)
            .collect())
    }

    pub async fn assignment_is_active(
        &self,
        caretaker_id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .assignments
            .find(caretaker_id, patient_id)
            .await?
            .map(|a| a.is_active(now))
            .unwrap_or(false))
    }

    pub async fn authorization_is_active(
        &self,
        mentor_id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .authorizations
            .find(mentor_id, patient_id)
            .await?
            .map(|a| a.is_active(now))
            .unwrap_or(false))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_grant_admin(
        &self,
        actor: &CallerIdentity,
        resource: &str,
        action: &str,
    ) -> Result<()> {
        if actor.role.is_grant_admin() {
            Ok(())
        } else {
            Err(AccessError::permission_denied(resource, action))
        }
    }

    /// Enforce the organization's patient-capacity ceiling at grant time.
    /// Already-assigned patients never trip the ceiling: it gates net-new
    /// active patients only.
    async fn check_patient_capacity(&self, organization_id: Uuid, patient_id: Uuid) -> Result<()> {
        let organization = self.organizations.require_organization(organization_id).await?;
        let Some(capacity) = organization.patient_capacity else {
            return Ok(());
        };

        let assigned = self.assignments.active_patients(organization_id).await?;
        if assigned.contains(&patient_id) {
            return Ok(());
        }
        if assigned.len() as u32 >= capacity {
            debug!(org = %organization_id, capacity, "patient capacity reached");
            return Err(AccessError::validation(
                "organizationId",
                format!("patient capacity of {capacity} reached"),
            ));
        }
        Ok(())
    }
}

fn parse_capabilities(raw: &[String]) -> Result<BTreeSet<MentorCapability>> {
    raw.iter()
        .map(|s| {
            s.parse::<MentorCapability>()
                .map_err(|_| AccessError::validation("permissions", format!("unknown capability: {s}")))
        })
        .collect()
}

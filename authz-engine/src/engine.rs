use audit_trail::{AuditEvent, AuditOutcome, AuditTrail};
use care_identity::{CallerIdentity, Role};
use chrono::Utc;
use dashmap::DashMap;
use error_common::{AccessError, Result};
use permission_registry::{Action, PermissionRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::scope::{ScopeFilter, ScopeResolver};
use crate::special::SpecialAccessResolver;

/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The role does not hold the permission at all.
    PermissionDenied,
    /// The role holds the permission, but not for this record.
    OwnershipRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialReason {
    pub resource: String,
    pub action: Action,
    pub role: Role,
    pub kind: DenialKind,
}

/// Outcome of a single check. Convert to a `Result` with [`into_result`]
/// when the caller wants to bail with `?`.
///
/// [`into_result`]: AccessDecision::into_result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(resource: &str, action: Action, role: Role, kind: DenialKind) -> Self {
        Self {
            allowed: false,
            reason: Some(DenialReason {
                resource: resource.to_string(),
                action,
                role,
                kind,
            }),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.reason {
            None if self.allowed => Ok(()),
            Some(reason) => Err(match reason.kind {
                DenialKind::PermissionDenied => {
                    AccessError::permission_denied(&reason.resource, reason.action.as_str())
                }
                DenialKind::OwnershipRequired => {
                    AccessError::ownership_required(&reason.resource, reason.action.as_str())
                }
            }),
            None => Err(AccessError::permission_denied("unknown", "unknown")),
        }
    }
}

/// Outcome of an all-of check: carries every failing pair, not just the
/// first, so the caller can report the complete shortfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeDecision {
    pub allowed: bool,
    pub failed: Vec<(String, Action)>,
}

/// Front door for every access question the platform asks.
///
/// Composes the permission table, scope resolution and instance-level grant
/// checks, and writes each decision to the audit trail off the request path.
pub struct AuthorizationEngine {
    registry: Arc<PermissionRegistry>,
    scopes: Arc<ScopeResolver>,
    special: Arc<SpecialAccessResolver>,
    audit: Arc<AuditTrail>,
    cache: Option<Arc<DashMap<String, bool>>>,
}

impl AuthorizationEngine {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        scopes: Arc<ScopeResolver>,
        special: Arc<SpecialAccessResolver>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            registry,
            scopes,
            special,
            audit,
            cache: None,
        }
    }

    pub fn with_config(self, config: &EngineConfig) -> Self {
        if config.cache_enabled {
            self.with_cache()
        } else {
            self
        }
    }

    /// Cache role-level lookups. Callers mutating the permission table must
    /// follow up with [`invalidate_cache`].
    ///
    /// [`invalidate_cache`]: AuthorizationEngine::invalidate_cache
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Arc::new(DashMap::new()));
        self
    }

    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("authorization cache invalidated");
        }
    }

    /// Turn an optional identity into a required one.
    pub fn authenticate(caller: Option<CallerIdentity>) -> Result<CallerIdentity> {
        caller.ok_or(AccessError::AuthenticationRequired)
    }

    /// Role-level check: may this role perform `action` on `resource` as a
    /// type, ignoring which record is involved.
    pub async fn check(
        &self,
        actor: &CallerIdentity,
        resource: &str,
        action: Action,
    ) -> Result<AccessDecision> {
        let allowed = self.role_allows(actor.role, resource, action).await?;
        let decision = if allowed {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(resource, action, actor.role, DenialKind::PermissionDenied)
        };
        self.audit_decision(actor, resource, action, actor.id, &decision);
        Ok(decision)
    }

    /// Any-of check: allowed when at least one pair passes. Stops probing at
    /// the first success.
    pub async fn check_any(
        &self,
        actor: &CallerIdentity,
        pairs: &[(&str, Action)],
    ) -> Result<AccessDecision> {
        for (resource, action) in pairs {
            if self.role_allows(actor.role, resource, *action).await? {
                let decision = AccessDecision::allow();
                self.audit_decision(actor, resource, *action, actor.id, &decision);
                return Ok(decision);
            }
        }
        let (resource, action) = pairs
            .first()
            .map(|(r, a)| (*r, *a))
            .unwrap_or(("unknown", Action::Read));
        let decision =
            AccessDecision::deny(resource, action, actor.role, DenialKind::PermissionDenied);
        self.audit_decision(actor, resource, action, actor.id, &decision);
        Ok(decision)
    }

    /// All-of check: evaluates every pair even after a failure, so the
    /// decision names the complete set of missing permissions.
    pub async fn check_all(
        &self,
        actor: &CallerIdentity,
        pairs: &[(&str, Action)],
    ) -> Result<CompositeDecision> {
        let mut failed = Vec::new();
        for (resource, action) in pairs {
            if !self.role_allows(actor.role, resource, *action).await? {
                failed.push((resource.to_string(), *action));
            }
        }
        let decision = CompositeDecision {
            allowed: failed.is_empty(),
            failed,
        };
        if !decision.allowed {
            debug!(actor = %actor.id, ?decision.failed, "composite check failed");
            let _ = self.audit.record(
                AuditEvent::new(actor.id, "access_check", AuditOutcome::Failure).details(json!({
                    "role": actor.role,
                    "failed": decision.failed,
                })),
            );
        }
        Ok(decision)
    }

    /// Instance-level check against a concrete record.
    ///
    /// The role-level permission must hold first, for owned records too:
    /// owning the record waives the instance-path resolution below, never
    /// the permission table. Past that, read, update and delete on someone
    /// else's record additionally need an organization or relationship path
    /// to this particular owner.
    pub async fn check_resource(
        &self,
        actor: &CallerIdentity,
        resource: &str,
        action: Action,
        owner_id: Uuid,
    ) -> Result<AccessDecision> {
        if actor.role == Role::SuperAdmin {
            let decision = AccessDecision::allow();
            self.audit_decision(actor, resource, action, owner_id, &decision);
            return Ok(decision);
        }

        if !self.role_allows(actor.role, resource, action).await? {
            let decision =
                AccessDecision::deny(resource, action, actor.role, DenialKind::PermissionDenied);
            self.audit_decision(actor, resource, action, owner_id, &decision);
            return Ok(decision);
        }

        let needs_instance_path = actor.id != owner_id
            && matches!(action, Action::Read | Action::Update | Action::Delete);
        let decision = if !needs_instance_path
            || self
                .special
                .can_access_owned(actor, resource, action, owner_id, Utc::now())
                .await?
        {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(resource, action, actor.role, DenialKind::OwnershipRequired)
        };
        self.audit_decision(actor, resource, action, owner_id, &decision);
        Ok(decision)
    }

    /// The data slice `actor` may see of `resource` right now.
    pub async fn scope_for(&self, actor: &CallerIdentity, resource: &str) -> Result<ScopeFilter> {
        self.scopes
            .scope(
                actor.role,
                actor.id,
                actor.organization_id,
                resource,
                Utc::now(),
            )
            .await
    }

    async fn role_allows(&self, role: Role, resource: &str, action: Action) -> Result<bool> {
        let key = format!("{role}|{resource}|{action}");
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                return Ok(*hit);
            }
        }
        let allowed = self.registry.has_permission(role, resource, action).await?;
        if let Some(cache) = &self.cache {
            cache.insert(key, allowed);
        }
        Ok(allowed)
    }

    /// `subject_id` is the record the decision was about; role-level checks
    /// have no record, so they pass the actor's own id.
    fn audit_decision(
        &self,
        actor: &CallerIdentity,
        resource: &str,
        action: Action,
        subject_id: Uuid,
        decision: &AccessDecision,
    ) {
        let outcome = if decision.allowed {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        let mut details = json!({
            "role": actor.role,
            "action": action,
        });
        if let Some(reason) = &decision.reason {
            details["denial"] = json!(reason.kind);
        }
        let _ = self.audit.record(
            AuditEvent::new(actor.id, "access_check", outcome)
                .resource(resource, subject_id)
                .details(details),
        );
    }
}

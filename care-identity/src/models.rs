use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed role enumeration.
///
/// `super_admin` is a universal override everywhere permissions are checked;
/// no other hierarchy is implied by the ordering here. `caller` exists in the
/// wider system but carries no permission-registry rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    CareManager,
    Caretaker,
    PatientMentor,
    Patient,
    Caller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OrgAdmin => "org_admin",
            Role::CareManager => "care_manager",
            Role::Caretaker => "caretaker",
            Role::PatientMentor => "patient_mentor",
            Role::Patient => "patient",
            Role::Caller => "caller",
        }
    }

    /// Admin-class roles that may manage relationship grants.
    pub fn is_grant_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::OrgAdmin | Role::CareManager)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "org_admin" => Ok(Role::OrgAdmin),
            "care_manager" => Ok(Role::CareManager),
            "caretaker" => Ok(Role::Caretaker),
            "patient_mentor" => Ok(Role::PatientMentor),
            "patient" => Ok(Role::Patient),
            "caller" => Ok(Role::Caller),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved caller identity attached to every inbound request.
///
/// Produced by the external identity-verification step; the engine treats it
/// as already authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: Uuid,
    pub role: Role,
    pub organization_id: Uuid,
}

impl CallerIdentity {
    pub fn new(id: Uuid, role: Role, organization_id: Uuid) -> Self {
        Self {
            id,
            role,
            organization_id,
        }
    }
}

/// Directory view of a user profile, as much as access decisions need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub organization_id: Uuid,
    pub is_active: bool,
}

impl Profile {
    pub fn new(id: Uuid, role: Role, organization_id: Uuid) -> Self {
        Self {
            id,
            role,
            organization_id,
            is_active: true,
        }
    }
}

/// Organization record with the grant-time patient-capacity ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Maximum distinct actively-assigned patients; `None` is unbounded.
    /// Enforced when an assignment is created, never retroactively.
    pub patient_capacity: Option<u32>,
}

impl Organization {
    pub fn new(id: Uuid, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            patient_capacity: None,
        }
    }

    pub fn with_patient_capacity(mut self, capacity: u32) -> Self {
        self.patient_capacity = Some(capacity);
        self
    }
}

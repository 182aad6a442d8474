use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a caretaker assignment.
///
/// `suspended` and `terminated` are reachable only through direct
/// administrative mutation; the named store operations move between
/// `active` and `inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Inactive,
    Suspended,
    Terminated,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Inactive => "inactive",
            AssignmentStatus::Suspended => "suspended",
            AssignmentStatus::Terminated => "terminated",
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AssignmentStatus::Active),
            "inactive" => Ok(AssignmentStatus::Inactive),
            "suspended" => Ok(AssignmentStatus::Suspended),
            "terminated" => Ok(AssignmentStatus::Terminated),
            other => Err(format!("unknown assignment status: {other}")),
        }
    }
}

/// Lifecycle status of a mentor authorization.
///
/// `expired` is never written by the named store operations — a lapsed
/// schedule window is inferred at read time; only `revoke` also stamps the
/// revocation fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Active,
    Revoked,
    Expired,
    Suspended,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Active => "active",
            AuthorizationStatus::Revoked => "revoked",
            AuthorizationStatus::Expired => "expired",
            AuthorizationStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AuthorizationStatus::Active),
            "revoked" => Ok(AuthorizationStatus::Revoked),
            "expired" => Ok(AuthorizationStatus::Expired),
            "suspended" => Ok(AuthorizationStatus::Suspended),
            other => Err(format!("unknown authorization status: {other}")),
        }
    }
}

/// Fixed capability enumeration a mentor authorization may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorCapability {
    ViewMedicalInfo,
    ViewMedications,
    ViewCallLogs,
    ViewHealthJournal,
    ViewAppointments,
    ViewCareNotes,
    ContactCareTeam,
}

impl MentorCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorCapability::ViewMedicalInfo => "view_medical_info",
            MentorCapability::ViewMedications => "view_medications",
            MentorCapability::ViewCallLogs => "view_call_logs",
            MentorCapability::ViewHealthJournal => "view_health_journal",
            MentorCapability::ViewAppointments => "view_appointments",
            MentorCapability::ViewCareNotes => "view_care_notes",
            MentorCapability::ContactCareTeam => "contact_care_team",
        }
    }

    /// Capability subset granted when an authorization does not specify one.
    pub fn default_set() -> BTreeSet<MentorCapability> {
        [
            MentorCapability::ViewMedicalInfo,
            MentorCapability::ViewMedications,
            MentorCapability::ViewCallLogs,
            MentorCapability::ViewHealthJournal,
        ]
        .into_iter()
        .collect()
    }
}

impl FromStr for MentorCapability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view_medical_info" => Ok(MentorCapability::ViewMedicalInfo),
            "view_medications" => Ok(MentorCapability::ViewMedications),
            "view_call_logs" => Ok(MentorCapability::ViewCallLogs),
            "view_health_journal" => Ok(MentorCapability::ViewHealthJournal),
            "view_appointments" => Ok(MentorCapability::ViewAppointments),
            "view_care_notes" => Ok(MentorCapability::ViewCareNotes),
            "contact_care_team" => Ok(MentorCapability::ContactCareTeam),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

impl fmt::Display for MentorCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of week, serialized snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Work schedule attached to a caretaker assignment. Any absent bound is
/// unbounded on that side; bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentSchedule {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub days_of_week: Vec<DayOfWeek>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl AssignmentSchedule {
    /// Does `now` fall inside this window?
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_date {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if now > end {
                return false;
            }
        }
        if !self.days_of_week.is_empty()
            && !self.days_of_week.contains(&now.weekday().into())
        {
            return false;
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            let time = now.time();
            if time < start || time > end {
                return false;
            }
        }
        true
    }
}

/// Access window attached to a mentor authorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSchedule {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub allowed_days: Vec<DayOfWeek>,
    pub allowed_hours: Option<HourWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl AccessSchedule {
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_date {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if now > end {
                return false;
            }
        }
        if !self.allowed_days.is_empty()
            && !self.allowed_days.contains(&now.weekday().into())
        {
            return false;
        }
        if let Some(ref hours) = self.allowed_hours {
            let time = now.time();
            if time < hours.start || time > hours.end {
                return false;
            }
        }
        true
    }
}

/// Timestamped note appended to an assignment's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentNote {
    pub author_id: Uuid,
    pub text: String,
    pub noted_at: DateTime<Utc>,
}

/// One caretaker↔patient grant. Unique per (caretaker_id, patient_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaretakerAssignment {
    pub id: Uuid,
    pub caretaker_id: Uuid,
    pub patient_id: Uuid,
    /// Shared organization of both parties.
    pub organization_id: Uuid,
    pub assigned_by: Uuid,
    pub status: AssignmentStatus,
    pub schedule: Option<AssignmentSchedule>,
    pub notes: Vec<AssignmentNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaretakerAssignment {
    /// Computed, never stored: active status AND inside the schedule window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Active
            && self.schedule.as_ref().map_or(true, |s| s.covers(now))
    }
}

/// One mentor↔patient grant. Unique per (mentor_id, patient_id).
/// Cross-organization authorization is explicitly permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorAuthorization {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub patient_id: Uuid,
    pub authorized_by: Uuid,
    pub status: AuthorizationStatus,
    pub permissions: BTreeSet<MentorCapability>,
    pub access_schedule: Option<AccessSchedule>,
    /// True when mentor and patient belong to different organizations.
    pub cross_organization: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub revocation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MentorAuthorization {
    /// Computed, never stored: active status AND inside the access window.
    /// A lapsed window with a stored `active` status is functionally denied.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == AuthorizationStatus::Active
            && self.access_schedule.as_ref().map_or(true, |s| s.covers(now))
    }

    /// Capability check used by record-level callers: active status, the
    /// capability present, and any end date not yet passed.
    pub fn permits(&self, capability: MentorCapability, now: DateTime<Utc>) -> bool {
        if self.status != AuthorizationStatus::Active {
            return false;
        }
        if !self.permissions.contains(&capability) {
            return false;
        }
        if let Some(end) = self.access_schedule.as_ref().and_then(|s| s.end_date) {
            if now > end {
                return false;
            }
        }
        true
    }
}

/// Caller-supplied payload for assignment creation/renewal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentData {
    pub schedule: Option<AssignmentSchedule>,
    pub note: Option<String>,
}

/// Caller-supplied payload for mentor authorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationData {
    /// Capability strings; `None` grants the default subset.
    pub permissions: Option<Vec<String>>,
    pub access_schedule: Option<AccessSchedule>,
}

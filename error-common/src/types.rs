use thiserror::Error;

/// Engine-wide error taxonomy.
///
/// Variants map one-to-one onto the failure classes the engine can report:
/// the route layer is expected to translate these into its own protocol
/// (HTTP statuses, RPC codes) and must not need anything finer-grained.
#[derive(Error, Debug)]
pub enum AccessError {
    /// No caller identity was supplied with the request.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// No active permission entry matched the caller's role.
    #[error("Permission denied: {action} on {resource}")]
    PermissionDenied { resource: String, action: String },

    /// Role-level permission passed but the specific instance is out of
    /// the caller's reach (not owned, no special access).
    #[error("Ownership required: {action} on {resource}")]
    OwnershipRequired { resource: String, action: String },

    /// A referenced profile, grant, or organization does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Role mismatch, cross-organization violation, unknown permission
    /// string, capacity ceiling, and similar request defects. Carries the
    /// offending field and the constraint so the caller can correct it.
    #[error("Validation failed on {field}: {constraint}")]
    ValidationFailed { field: String, constraint: String },

    /// The backing store failed; retryable from the caller's side, the
    /// engine itself never retries.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A role reached a code path that has no mapping for it. This is a
    /// deployment defect, not a user error, and is fatal to the request.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Wrapped internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    pub fn permission_denied(resource: &str, action: &str) -> Self {
        Self::PermissionDenied {
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    pub fn ownership_required(resource: &str, action: &str) -> Self {
        Self::OwnershipRequired {
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, constraint: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.to_string(),
            constraint: constraint.into(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    /// True for failures worth retrying against the backing store.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Async logging hook for errors that are handled rather than propagated.
pub async fn log_error(context: &str, error: &AccessError) {
    tracing::error!(
        context = context,
        error = %error,
        "access engine error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_messages_stay_information_poor() {
        let err = AccessError::permission_denied("patients", "read");
        assert_eq!(err.to_string(), "Permission denied: read on patients");
    }

    #[test]
    fn validation_names_field_and_constraint() {
        let err = AccessError::validation("patientId", "must have role patient");
        assert!(err.to_string().contains("patientId"));
        assert!(err.to_string().contains("must have role patient"));
    }

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(AccessError::store("connection reset").is_retryable());
        assert!(!AccessError::AuthenticationRequired.is_retryable());
    }
}

use thiserror::Error;

/// Every failure the admin core surfaces to a view layer.
///
/// Transport errors never escape the crate as-is: the HTTP client converts
/// them into one of these kinds at the operation boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    /// Local pre-submission check failed. Never reaches the network.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// A create or update hit a uniqueness constraint.
    #[error("{0}")]
    Conflict(String),

    /// A delete was refused because dependent records exist.
    #[error("{0}")]
    DependencyConflict(String),

    /// The request never produced a usable response (offline, timeout, 5xx).
    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Any other server-side rejection, message kept verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Illegal session transition.
    #[error("session error: {0}")]
    Session(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub type AdminResult<T> = Result<T, AdminError>;

impl AdminError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Field name for inline display, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Kind of call being made, used to classify a 409 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    /// Map an HTTP status and the server's message to an error kind.
    ///
    /// The backend reports integrity violations on delete as 409, but older
    /// endpoints let them escape as 400/500 with the constraint in the text.
    pub fn classify(self, status: u16, message: String) -> AdminError {
        match (status, self) {
            (401 | 403, _) => AdminError::Unauthorized(message),
            (404, _) => AdminError::NotFound(message),
            (409, OperationKind::Delete) => AdminError::DependencyConflict(message),
            (409, _) => AdminError::Conflict(message),
            (400 | 500, OperationKind::Delete) if mentions_constraint(&message) => {
                AdminError::DependencyConflict(message)
            }
            (400 | 500, OperationKind::Create | OperationKind::Update)
                if mentions_duplicate(&message) =>
            {
                AdminError::Conflict(message)
            }
            (s, _) if s >= 500 => AdminError::Network(message),
            (s, _) => AdminError::Rejected { status: s, message },
        }
    }
}

fn mentions_constraint(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("constraint") || lower.contains("foreign key") || lower.contains("dependent")
}

fn mentions_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("duplicate") || lower.contains("already exists") || lower.contains("unique")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_depends_on_operation() {
        let on_delete = OperationKind::Delete.classify(409, "has subjects".to_string());
        assert_eq!(on_delete, AdminError::DependencyConflict("has subjects".to_string()));

        let on_create = OperationKind::Create.classify(409, "code taken".to_string());
        assert_eq!(on_create, AdminError::Conflict("code taken".to_string()));
    }

    #[test]
    fn test_constraint_message_on_500_delete() {
        let err = OperationKind::Delete.classify(
            500,
            "Internal Server Error: could not execute statement; constraint [fk_chapter]".to_string(),
        );
        assert!(matches!(err, AdminError::DependencyConflict(_)));

        let err = OperationKind::Read.classify(503, "down".to_string());
        assert!(matches!(err, AdminError::Network(_)));
    }

    #[test]
    fn test_rejected_keeps_message_verbatim() {
        let err = OperationKind::Create.classify(422, "Marks must be positive".to_string());
        assert_eq!(err.to_string(), "Marks must be positive");
    }
}

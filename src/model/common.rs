use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque server-assigned identifier (UUIDs on the wire).
pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// `{ "id": ... }` reference used by the backend to bind a question to its
/// academic mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: Id,
}

impl IdRef {
    pub fn new(id: impl Into<Id>) -> Self {
        Self { id: id.into() }
    }
}

/// Envelope used by the auth endpoints: `{ success, message, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Error body shape. The backend always sends `message`; some handlers also
/// send `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

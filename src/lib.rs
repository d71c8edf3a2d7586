pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod forms;
pub mod model;
pub mod selector;
pub mod services;
pub mod session;

// Export client types
pub use client::{AdminApi, HttpApiClient, MemoryApi};

pub use confirm::{AssumeYes, Confirm, DeleteOutcome, Gated};
pub use error::{AdminError, AdminResult};

// Export all model types
pub use model::*;

pub use selector::{CascadingSelector, HierarchyNode, Level, LevelDef, LevelState};
pub use session::{SessionContext, SessionState};

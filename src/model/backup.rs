use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupType {
    #[default]
    Full,
    Tenant,
    Question,
    User,
    Settings,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "FULL",
            BackupType::Tenant => "TENANT",
            BackupType::Question => "QUESTION",
            BackupType::User => "USER",
            BackupType::Settings => "SETTINGS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupStatus {
    InProgress,
    Success,
    Failed,
}

/// Entry of the backup history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: Id,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub file_path: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub status: BackupStatus,
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub triggered_by: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

/// Downloaded archive with its SHA-256 digest, hex encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupArchive {
    pub id: Id,
    pub bytes: Vec<u8>,
    pub sha256: String,
}

impl BackupArchive {
    pub fn new(id: Id, bytes: Vec<u8>) -> Self {
        use sha2::{Digest, Sha256};

        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self { id, bytes, sha256 }
    }
}

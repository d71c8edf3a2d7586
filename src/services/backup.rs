use std::sync::Arc;

use crate::client::BackupApi;
use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::{AdminError, AdminResult};
use crate::model::{BackupArchive, BackupRecord, BackupStatus, BackupType, Id};

/// Backup history and restore. Restore and delete ask for confirmation
/// first; a declined prompt sends nothing.
pub struct BackupService {
    api: Arc<dyn BackupApi>,
    tenant_id: Option<String>,
}

impl BackupService {
    pub fn new(api: Arc<dyn BackupApi>) -> Self {
        Self {
            api,
            tenant_id: None,
        }
    }

    /// Limit history and manual backups to one institute.
    pub fn for_tenant(api: Arc<dyn BackupApi>, tenant_id: impl Into<String>) -> Self {
        Self {
            api,
            tenant_id: Some(tenant_id.into()),
        }
    }

    pub async fn trigger(&self, backup_type: BackupType) -> AdminResult<BackupRecord> {
        let record = self
            .api
            .trigger_backup(backup_type, self.tenant_id.as_deref())
            .await?;
        log::info!(
            "Backup {} ({}) finished with {:?}",
            record.id,
            backup_type.as_str(),
            record.status
        );
        Ok(record)
    }

    /// Newest first.
    pub async fn history(&self) -> AdminResult<Vec<BackupRecord>> {
        let mut records = self.api.backup_history(self.tenant_id.as_deref()).await?;
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    pub async fn restore(
        &self,
        record: &BackupRecord,
        confirm: &dyn Confirm,
    ) -> AdminResult<Gated<String>> {
        let prompt = format!(
            "Restore backup {}? Current data will be overwritten.",
            record.file_path
        );
        if !confirm.confirm(&prompt) {
            return Ok(Gated::Cancelled);
        }
        let message = self.api.restore_backup(&record.id).await?;
        log::info!("Restored backup {}: {}", record.id, message);
        Ok(Gated::Done(message))
    }

    pub async fn delete(&self, id: &Id, confirm: &dyn Confirm) -> AdminResult<DeleteOutcome> {
        if !confirm.confirm(&format!("Delete backup {}?", id)) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_backup(id).await?;
        log::info!("Deleted backup {}", id);
        Ok(Gated::Done(()))
    }

    /// Fetch the archive of a successful backup and hash it.
    pub async fn download(&self, record: &BackupRecord) -> AdminResult<BackupArchive> {
        if record.status != BackupStatus::Success {
            return Err(AdminError::validation(
                "backup",
                "only successful backups can be downloaded",
            ));
        }
        let bytes = self.api.download_backup(&record.id).await?;
        let archive = BackupArchive::new(record.id.clone(), bytes);
        log::debug!(
            "Downloaded {} ({} bytes, sha256 {})",
            record.id,
            archive.bytes.len(),
            archive.sha256
        );
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;
    use crate::confirm::AssumeYes;

    #[tokio::test]
    async fn test_declined_restore_is_not_dispatched() {
        let api = Arc::new(MemoryApi::new());
        let service = BackupService::new(api.clone());
        let record = service.trigger(BackupType::Full).await.unwrap();
        api.clear_calls();

        let outcome = service.restore(&record, &|_: &str| false).await.unwrap();
        assert!(outcome.is_cancelled());
        let outcome = service.delete(&record.id, &|_: &str| false).await.unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_and_delete() {
        let api = Arc::new(MemoryApi::new());
        let service = BackupService::for_tenant(api.clone(), "inst-1");
        let record = service.trigger(BackupType::Tenant).await.unwrap();
        assert_eq!(record.tenant_id.as_deref(), Some("inst-1"));

        let message = service.restore(&record, &AssumeYes).await.unwrap().done();
        assert_eq!(message.as_deref(), Some("Restore completed successfully"));

        service.delete(&record.id, &AssumeYes).await.unwrap();
        assert!(service.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_hashes_archive() {
        let api = Arc::new(MemoryApi::new());
        let service = BackupService::new(api);
        let record = service.trigger(BackupType::Settings).await.unwrap();

        let archive = service.download(&record).await.unwrap();
        assert_eq!(archive.id, record.id);
        assert_eq!(archive.sha256.len(), 64);
    }
}

use std::sync::Arc;

use crate::client::AcademicApi;
use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::{AdminError, AdminResult};
use crate::model::{AcademicSession, Id, NewSession};

/// Academic-session management. New subject assignments land in the
/// active session, so activation switches it for every class at once.
pub struct SessionService {
    api: Arc<dyn AcademicApi>,
}

impl SessionService {
    pub fn new(api: Arc<dyn AcademicApi>) -> Self {
        Self { api }
    }

    /// Most recent start date first; undated sessions last.
    pub async fn list(&self) -> AdminResult<Vec<AcademicSession>> {
        let mut sessions = self.api.list_sessions().await?;
        sessions.sort_by(|a, b| match (a.start_date, b.start_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(sessions)
    }

    pub async fn active(&self) -> AdminResult<AcademicSession> {
        self.api.active_session().await
    }

    pub async fn create(&self, session: NewSession) -> AdminResult<AcademicSession> {
        validate(&session)?;
        let created = self.api.create_session(session).await?;
        log::info!("Created academic session {}", created.name);
        Ok(created)
    }

    pub async fn update(&self, id: &Id, session: NewSession) -> AdminResult<AcademicSession> {
        validate(&session)?;
        self.api.update_session(id, session).await
    }

    pub async fn delete(
        &self,
        session: &AcademicSession,
        confirm: &dyn Confirm,
    ) -> AdminResult<DeleteOutcome> {
        if session.active {
            return Err(AdminError::validation(
                "session",
                "activate another session before deleting this one",
            ));
        }
        if !confirm.confirm(&format!("Delete session {}?", session.name)) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_session(&session.id).await?;
        log::info!("Deleted academic session {}", session.name);
        Ok(Gated::Done(()))
    }

    /// Returns the session the server now reports as active.
    pub async fn activate(&self, id: &Id) -> AdminResult<AcademicSession> {
        self.api.activate_session(id).await?;
        let active = self.api.active_session().await?;
        log::info!("Active academic session is now {}", active.name);
        Ok(active)
    }
}

fn validate(session: &NewSession) -> AdminResult<()> {
    if session.name.trim().is_empty() {
        return Err(AdminError::validation("name", "session name is required"));
    }
    if let (Some(start), Some(end)) = (session.start_date, session.end_date) {
        if end < start {
            return Err(AdminError::validation(
                "endDate",
                "end date must not be before start date",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;
    use crate::confirm::AssumeYes;
    use chrono::NaiveDate;

    fn dated(name: &str, year: i32) -> NewSession {
        NewSession {
            name: name.to_string(),
            start_date: NaiveDate::from_ymd_opt(year, 1, 1),
            end_date: NaiveDate::from_ymd_opt(year, 12, 31),
        }
    }

    #[tokio::test]
    async fn test_activation_leaves_one_active() {
        let api = Arc::new(MemoryApi::new());
        let service = SessionService::new(api.clone());
        let old = service.create(dated("2024", 2024)).await.unwrap();
        let new = service.create(dated("2025", 2025)).await.unwrap();
        assert!(!old.active && !new.active);

        service.activate(&old.id).await.unwrap();
        let active = service.activate(&new.id).await.unwrap();
        assert_eq!(active.id, new.id);

        let sessions = service.list().await.unwrap();
        assert_eq!(sessions[0].name, "2025");
        assert_eq!(sessions.iter().filter(|s| s.active).count(), 1);
        assert!(api
            .calls()
            .iter()
            .any(|c| c.is("PUT", &format!("/academic/sessions/{}/activate", new.id))));
    }

    #[tokio::test]
    async fn test_dates_and_name_checked_locally() {
        let api = Arc::new(MemoryApi::new());
        let service = SessionService::new(api.clone());

        let mut backwards = dated("2025", 2025);
        backwards.end_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        let err = service.create(backwards).await.unwrap_err();
        assert_eq!(err.field(), Some("endDate"));

        let err = service.create(NewSession::named("  ")).await.unwrap_err();
        assert_eq!(err.field(), Some("name"));
        assert_eq!(api.call_count(), 0);

        service.create(NewSession::named("2025")).await.unwrap();
        let err = service.create(NewSession::named("2025")).await.unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_active_or_assigned_session_is_refused() {
        let api = Arc::new(MemoryApi::new());
        let service = SessionService::new(api.clone());
        let session = service.create(NewSession::named("2025")).await.unwrap();
        let active = service.activate(&session.id).await.unwrap();
        assert!(service.delete(&active, &AssumeYes).await.unwrap_err().is_validation());

        let spare = service.create(NewSession::named("2026")).await.unwrap();
        let subject = api
            .create_subject(crate::model::NewSubject {
                name: "Physics".to_string(),
                code: "PHY-101".to_string(),
                description: None,
            })
            .await
            .unwrap();
        api.assign_subject(&"1".to_string(), &subject.id, &spare.id)
            .await
            .unwrap();

        let err = service.delete(&spare, &AssumeYes).await.unwrap_err();
        assert!(matches!(err, AdminError::DependencyConflict(_)));

        let renamed = service
            .update(&spare.id, NewSession::named("2026-2027"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "2026-2027");
        let mappings = api.list_class_subjects(&"1".to_string()).await.unwrap();
        assert_eq!(mappings[0].session_name.as_deref(), Some("2026-2027"));
    }
}

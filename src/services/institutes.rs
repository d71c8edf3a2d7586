use std::sync::Arc;

use crate::client::InstituteApi;
use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::{AdminError, AdminResult};
use crate::model::{Id, Institute, InstituteQuery, NewInstitute, Page, SubscriptionPlan};

/// Tenant lifecycle for super admins.
pub struct InstituteService {
    api: Arc<dyn InstituteApi>,
}

impl InstituteService {
    pub fn new(api: Arc<dyn InstituteApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &InstituteQuery) -> AdminResult<Page<Institute>> {
        self.api.list_institutes(query).await
    }

    pub async fn get(&self, id: &Id) -> AdminResult<Institute> {
        self.api.get_institute(id).await
    }

    pub async fn create(&self, institute: NewInstitute) -> AdminResult<Institute> {
        validate(&institute)?;
        let created = self.api.create_institute(institute).await?;
        log::info!("Created institute {} ({})", created.name, created.code);
        Ok(created)
    }

    pub async fn update(&self, id: &Id, institute: NewInstitute) -> AdminResult<Institute> {
        validate(&institute)?;
        self.api.update_institute(id, institute).await
    }

    pub async fn delete(
        &self,
        institute: &Institute,
        confirm: &dyn Confirm,
    ) -> AdminResult<DeleteOutcome> {
        let prompt = format!(
            "Delete {} ({})? All of its data is removed.",
            institute.name, institute.code
        );
        if !confirm.confirm(&prompt) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_institute(&institute.id).await?;
        log::info!("Deleted institute {}", institute.id);
        Ok(Gated::Done(()))
    }

    pub async fn activate(&self, id: &Id) -> AdminResult<Institute> {
        self.api.activate_institute(id).await?;
        log::info!("Activated institute {}", id);
        self.api.get_institute(id).await
    }

    /// Suspending locks every user of the institute out, so it is gated.
    pub async fn suspend(&self, id: &Id, confirm: &dyn Confirm) -> AdminResult<Gated<Institute>> {
        let institute = self.api.get_institute(id).await?;
        if !confirm.confirm(&format!("Suspend {}?", institute.name)) {
            return Ok(Gated::Cancelled);
        }
        self.api.suspend_institute(id).await?;
        log::info!("Suspended institute {}", id);
        self.api.get_institute(id).await.map(Gated::Done)
    }

    pub async fn upgrade_plan(
        &self,
        id: &Id,
        plan: SubscriptionPlan,
        duration_months: u32,
    ) -> AdminResult<Institute> {
        if duration_months == 0 {
            return Err(AdminError::validation(
                "durationMonths",
                "duration must be at least one month",
            ));
        }
        self.api.upgrade_plan(id, plan, duration_months).await?;
        log::info!(
            "Institute {} moved to {} for {} months",
            id,
            plan.as_str(),
            duration_months
        );
        self.api.get_institute(id).await
    }
}

fn validate(institute: &NewInstitute) -> AdminResult<()> {
    if institute.name.trim().is_empty() {
        return Err(AdminError::validation("name", "institute name is required"));
    }
    if institute.code.trim().is_empty() {
        return Err(AdminError::validation("code", "institute code is required"));
    }
    if institute.max_teachers == 0 || institute.max_students == 0 {
        return Err(AdminError::validation(
            "maxTeachers",
            "teacher and student limits must be at least one",
        ));
    }
    Ok(())
}

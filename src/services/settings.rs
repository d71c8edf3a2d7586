use std::sync::Arc;

use crate::client::SettingsApi;
use crate::error::AdminResult;
use crate::model::{PasswordPolicy, SettingCategory, SettingsMap, SettingsScope};
use crate::session::SessionContext;

/// Settings editor bound to one scope.
///
/// The scope is taken from the session role when the service is built and
/// does not change afterwards; a failed call is reported, never retried
/// against the other scope.
pub struct SettingsService {
    api: Arc<dyn SettingsApi>,
    scope: SettingsScope,
}

impl SettingsService {
    pub fn for_session(api: Arc<dyn SettingsApi>, session: &SessionContext) -> AdminResult<Self> {
        let scope = session.settings_scope()?;
        log::debug!("Settings scope resolved to {}", scope.path_segment());
        Ok(Self { api, scope })
    }

    pub fn with_scope(api: Arc<dyn SettingsApi>, scope: SettingsScope) -> Self {
        Self { api, scope }
    }

    pub fn scope(&self) -> SettingsScope {
        self.scope
    }

    pub async fn load(&self, category: SettingCategory) -> AdminResult<SettingsMap> {
        self.api.get_settings(self.scope, category).await
    }

    /// Save the given keys; keys not present are left as they are.
    pub async fn save(&self, category: SettingCategory, settings: &SettingsMap) -> AdminResult<()> {
        self.api
            .update_settings(self.scope, category, settings)
            .await?;
        log::info!(
            "Saved {} {} settings in {} scope",
            settings.len(),
            category.as_str(),
            self.scope.path_segment()
        );
        Ok(())
    }
}

impl SettingsService {
    pub async fn load_security(&self) -> AdminResult<SettingsMap> {
        self.api.get_security_settings(self.scope).await
    }

    pub async fn save_security(&self, settings: &SettingsMap) -> AdminResult<()> {
        self.api
            .update_security_settings(self.scope, settings)
            .await?;
        log::info!(
            "Saved {} security settings in {} scope",
            settings.len(),
            self.scope.path_segment()
        );
        Ok(())
    }

    /// Password rules in effect for this scope.
    pub async fn password_policy(&self) -> AdminResult<PasswordPolicy> {
        let settings = self.load_security().await?;
        Ok(PasswordPolicy::from_settings(&settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;
    use crate::error::AdminError;
    use crate::model::{Role, UserContext};

    #[tokio::test]
    async fn test_scope_follows_role() {
        let api = Arc::new(MemoryApi::new());
        let session = SessionContext::new();

        session.login("a".to_string(), UserContext::new("admin", Role::SuperAdmin));
        let admin = SettingsService::for_session(api.clone(), &session).unwrap();
        assert_eq!(admin.scope(), SettingsScope::Global);

        session.login("b".to_string(), UserContext::new("ia", Role::InstituteAdmin));
        let institute = SettingsService::for_session(api.clone(), &session).unwrap();
        assert_eq!(institute.scope(), SettingsScope::Institute);

        session.logout();
        assert!(SettingsService::for_session(api, &session).is_err());
    }

    #[tokio::test]
    async fn test_failure_does_not_fall_back_to_global() {
        let api = Arc::new(MemoryApi::new());
        api.fail_path("/settings/general/institute/GENERAL");
        let service = SettingsService::with_scope(api.clone(), SettingsScope::Institute);

        let err = service.load(SettingCategory::General).await.unwrap_err();
        assert!(matches!(err, AdminError::Network(_)));
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is("GET", "/settings/general/institute/GENERAL"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let api = Arc::new(MemoryApi::new());
        let service = SettingsService::with_scope(api, SettingsScope::Global);

        let mut settings = SettingsMap::new();
        settings.insert("site_name".to_string(), "QuestionShaper".to_string());
        service.save(SettingCategory::Branding, &settings).await.unwrap();

        let loaded = service.load(SettingCategory::Branding).await.unwrap();
        assert_eq!(loaded.get("site_name").map(String::as_str), Some("QuestionShaper"));
        assert!(service.load(SettingCategory::Exam).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_security_policy_per_scope() {
        let api = Arc::new(MemoryApi::new());
        let institute = SettingsService::with_scope(api.clone(), SettingsScope::Institute);

        let mut settings = SettingsMap::new();
        settings.insert("PASSWORD_MIN_LENGTH".to_string(), "12".to_string());
        institute.save_security(&settings).await.unwrap();
        assert!(api.calls()[0].is("PUT", "/settings/security/institute"));

        let policy = institute.password_policy().await.unwrap();
        assert_eq!(policy.min_length, 12);
        assert!(policy.check("Str0ng#pw").is_err());

        let global = SettingsService::with_scope(api, SettingsScope::Global);
        assert_eq!(global.password_policy().await.unwrap(), PasswordPolicy::default());
    }
}

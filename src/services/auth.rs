use std::sync::Arc;

use crate::client::AuthApi;
use crate::error::{AdminError, AdminResult};
use crate::model::UserContext;
use crate::session::{SessionContext, SessionState};

/// Drives the session state machine through the auth endpoints.
///
/// The backend only returns a token, so the caller supplies the
/// [`UserContext`] the token is issued for.
pub struct AuthService {
    api: Arc<dyn AuthApi>,
    session: Arc<SessionContext>,
}

impl AuthService {
    pub fn new(api: Arc<dyn AuthApi>, session: Arc<SessionContext>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str, user: UserContext) -> AdminResult<()> {
        let token = self.api.login(email, password).await?;
        self.session.login(token, user);
        Ok(())
    }

    /// Act as `user`. Only a super admin who is not already impersonating
    /// may do this; otherwise no request is sent.
    pub async fn impersonate(&self, user: UserContext) -> AdminResult<()> {
        match self.session.state() {
            SessionState::Authenticated(creds) if creds.user.is_super_admin() => {}
            SessionState::Authenticated(_) => {
                return Err(AdminError::Session(
                    "only a super admin can impersonate".to_string(),
                ))
            }
            SessionState::Impersonating { .. } => {
                return Err(AdminError::Session("already impersonating".to_string()))
            }
            SessionState::Anonymous => {
                return Err(AdminError::Session("not logged in".to_string()))
            }
        }

        let token = self.api.impersonate(&user.user_id).await?;
        self.session.impersonate(token, user)
    }

    pub fn revert(&self) -> AdminResult<()> {
        self.session.revert()
    }

    pub fn logout(&self) {
        self.session.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;
    use crate::model::Role;

    async fn service() -> (Arc<MemoryApi>, AuthService) {
        let api = Arc::new(MemoryApi::new());
        api.add_user("admin@qs.test", "secret", "admin").await;
        api.add_user("teacher@qs.test", "secret", "t-1").await;
        let service = AuthService::new(api.clone(), Arc::new(SessionContext::new()));
        (api, service)
    }

    #[tokio::test]
    async fn test_login_impersonate_revert() {
        let (_, auth) = service().await;
        auth.login("admin@qs.test", "secret", UserContext::new("admin", Role::SuperAdmin))
            .await
            .unwrap();
        assert_eq!(auth.session().bearer_token().as_deref(), Some("token-admin"));

        auth.impersonate(UserContext::new("t-1", Role::Teacher))
            .await
            .unwrap();
        assert_eq!(auth.session().bearer_token().as_deref(), Some("token-t-1"));

        auth.revert().unwrap();
        assert_eq!(auth.session().bearer_token().as_deref(), Some("token-admin"));

        auth.logout();
        assert_eq!(auth.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_bad_password_keeps_anonymous() {
        let (_, auth) = service().await;
        let err = auth
            .login("admin@qs.test", "wrong", UserContext::new("admin", Role::SuperAdmin))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Unauthorized(_)));
        assert_eq!(auth.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_teacher_cannot_impersonate() {
        let (api, auth) = service().await;
        auth.login("teacher@qs.test", "secret", UserContext::new("t-1", Role::Teacher))
            .await
            .unwrap();
        api.clear_calls();

        let err = auth
            .impersonate(UserContext::new("admin", Role::SuperAdmin))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Session(_)));
        assert_eq!(api.call_count(), 0);
    }
}

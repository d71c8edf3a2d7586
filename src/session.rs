use parking_lot::RwLock;

use crate::error::{AdminError, AdminResult};
use crate::model::{SettingsScope, UserContext};

/// Bearer token together with the user it was issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub token: String,
    pub user: UserContext,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Credentials),
    /// A super admin acting as another user. `admin` is restored on revert.
    Impersonating {
        admin: Credentials,
        acting_as: Credentials,
    },
}

/// Session shared between the API client and the views.
///
/// Transitions:
/// - `login`: any state → Authenticated
/// - `impersonate`: Authenticated (super admin) → Impersonating
/// - `revert`: Impersonating → Authenticated (admin credentials)
/// - `logout`: any state → Anonymous
#[derive(Debug, Default)]
pub struct SessionContext {
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Token to attach to outgoing requests.
    pub fn bearer_token(&self) -> Option<String> {
        match &*self.state.read() {
            SessionState::Anonymous => None,
            SessionState::Authenticated(creds) => Some(creds.token.clone()),
            SessionState::Impersonating { acting_as, .. } => Some(acting_as.token.clone()),
        }
    }

    /// The effective user, i.e. the impersonated one while impersonating.
    pub fn current_user(&self) -> Option<UserContext> {
        match &*self.state.read() {
            SessionState::Anonymous => None,
            SessionState::Authenticated(creds) => Some(creds.user.clone()),
            SessionState::Impersonating { acting_as, .. } => Some(acting_as.user.clone()),
        }
    }

    pub fn is_impersonating(&self) -> bool {
        matches!(&*self.state.read(), SessionState::Impersonating { .. })
    }

    pub fn settings_scope(&self) -> AdminResult<SettingsScope> {
        self.current_user()
            .map(|user| user.settings_scope())
            .ok_or_else(|| AdminError::Session("not logged in".to_string()))
    }

    pub fn login(&self, token: String, user: UserContext) {
        log::info!("Session authenticated as {}", user.user_id);
        *self.state.write() = SessionState::Authenticated(Credentials { token, user });
    }

    pub fn impersonate(&self, token: String, user: UserContext) -> AdminResult<()> {
        let mut state = self.state.write();
        let admin = match &*state {
            SessionState::Authenticated(creds) if creds.user.is_super_admin() => creds.clone(),
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
        };

        log::info!("{} now impersonating {}", admin.user.user_id, user.user_id);
        *state = SessionState::Impersonating {
            admin,
            acting_as: Credentials { token, user },
        };
        Ok(())
    }

    pub fn revert(&self) -> AdminResult<()> {
        let mut state = self.state.write();
        let SessionState::Impersonating { admin, .. } = &*state else {
            return Err(AdminError::Session("not impersonating".to_string()));
        };

        log::info!("Impersonation ended, back to {}", admin.user.user_id);
        *state = SessionState::Authenticated(admin.clone());
        Ok(())
    }

    pub fn logout(&self) {
        *self.state.write() = SessionState::Anonymous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn admin_session() -> SessionContext {
        let session = SessionContext::new();
        session.login("admin-token".to_string(), UserContext::new("admin", Role::SuperAdmin));
        session
    }

    #[test]
    fn test_impersonate_and_revert_restores_admin_token() {
        let session = admin_session();
        session
            .impersonate("teacher-token".to_string(), UserContext::new("t-1", Role::Teacher))
            .unwrap();

        assert!(session.is_impersonating());
        assert_eq!(session.bearer_token().as_deref(), Some("teacher-token"));
        assert_eq!(session.settings_scope().unwrap(), SettingsScope::Institute);

        session.revert().unwrap();
        assert_eq!(session.bearer_token().as_deref(), Some("admin-token"));
        assert_eq!(session.current_user().unwrap().user_id, "admin");
    }

    #[test]
    fn test_revert_requires_impersonation() {
        let session = admin_session();
        assert!(matches!(session.revert(), Err(AdminError::Session(_))));
    }

    #[test]
    fn test_only_super_admin_may_impersonate() {
        let session = SessionContext::new();
        session.login("t".to_string(), UserContext::new("t-1", Role::Teacher));
        let result = session.impersonate("s".to_string(), UserContext::new("s-1", Role::Student));
        assert!(result.is_err());
        assert_eq!(session.bearer_token().as_deref(), Some("t"));
    }

    #[test]
    fn test_logout_from_impersonation() {
        let session = admin_session();
        session
            .impersonate("x".to_string(), UserContext::new("t-1", Role::Teacher))
            .unwrap();
        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.bearer_token().is_none());
        assert!(session.settings_scope().is_err());
    }
}

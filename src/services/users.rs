use std::sync::Arc;

use crate::client::{RoleApi, UserApi};
use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::{AdminError, AdminResult};
use crate::model::{
    Id, IdRef, NewRole, NewUser, Page, PasswordPolicy, Permission, RoleDefinition, User,
    UserQuery, UserUpdate,
};

/// User management for super and institute admins.
///
/// Passwords are checked against the security policy before a create is
/// sent; [`PasswordPolicy::default`] mirrors the server defaults when the
/// scope's settings are not loaded.
pub struct UserService {
    api: Arc<dyn UserApi>,
    policy: PasswordPolicy,
}

impl UserService {
    pub fn new(api: Arc<dyn UserApi>) -> Self {
        Self::with_policy(api, PasswordPolicy::default())
    }

    pub fn with_policy(api: Arc<dyn UserApi>, policy: PasswordPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn list(&self, query: &UserQuery) -> AdminResult<Page<User>> {
        self.api.list_users(query).await
    }

    pub async fn get(&self, id: &Id) -> AdminResult<User> {
        self.api.get_user(id).await
    }

    pub async fn create(&self, user: NewUser) -> AdminResult<User> {
        check_profile(&user.name, &user.email)?;
        self.policy.check(&user.password)?;
        let created = self.api.create_user(user).await?;
        log::info!("Created user {} ({})", created.email, created.roles.join(","));
        Ok(created)
    }

    pub async fn update(&self, id: &Id, user: UserUpdate) -> AdminResult<User> {
        check_profile(&user.name, &user.email)?;
        self.api.update_user(id, user).await
    }

    /// Enable or disable sign-in. Returns the refreshed user.
    pub async fn set_active(&self, id: &Id, active: bool) -> AdminResult<User> {
        if active {
            self.api.activate_user(id).await?;
        } else {
            self.api.deactivate_user(id).await?;
        }
        log::info!("User {} {}", id, if active { "activated" } else { "deactivated" });
        self.api.get_user(id).await
    }

    pub async fn delete(&self, user: &User, confirm: &dyn Confirm) -> AdminResult<DeleteOutcome> {
        if !confirm.confirm(&format!("Delete user {}?", user.email)) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_user(&user.id).await?;
        log::info!("Deleted user {}", user.email);
        Ok(Gated::Done(()))
    }

    /// Replaces the user's password with a generated one, also gated.
    pub async fn reset_password(
        &self,
        user: &User,
        confirm: &dyn Confirm,
    ) -> AdminResult<Gated<()>> {
        if !confirm.confirm(&format!("Reset the password of {}?", user.email)) {
            return Ok(Gated::Cancelled);
        }
        self.api.reset_password(&user.id).await?;
        log::info!("Password reset for {}", user.email);
        Ok(Gated::Done(()))
    }
}

fn check_profile(name: &str, email: &str) -> AdminResult<()> {
    if name.trim().is_empty() {
        return Err(AdminError::validation("name", "Name is required"));
    }
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AdminError::validation("email", "Invalid email format"));
    }
    Ok(())
}

/// Roles and the permissions they grant.
pub struct RoleService {
    api: Arc<dyn RoleApi>,
}

impl RoleService {
    pub fn new(api: Arc<dyn RoleApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> AdminResult<Vec<RoleDefinition>> {
        self.api.list_roles().await
    }

    pub async fn permissions(&self) -> AdminResult<Vec<Permission>> {
        self.api.list_permissions().await
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        permissions: &[Permission],
    ) -> AdminResult<RoleDefinition> {
        let role = role_body(name, description, permissions)?;
        let created = self.api.create_role(role).await?;
        log::info!(
            "Created role {} with {} permissions",
            created.name,
            created.permissions.len()
        );
        Ok(created)
    }

    /// Replaces the role's name, description and whole permission set.
    pub async fn update(
        &self,
        id: &Id,
        name: &str,
        description: Option<String>,
        permissions: &[Permission],
    ) -> AdminResult<RoleDefinition> {
        let role = role_body(name, description, permissions)?;
        self.api.update_role(id, role).await
    }

    pub async fn delete(
        &self,
        role: &RoleDefinition,
        confirm: &dyn Confirm,
    ) -> AdminResult<DeleteOutcome> {
        if !confirm.confirm(&format!("Delete role {}?", role.name)) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_role(&role.id).await?;
        log::info!("Deleted role {}", role.name);
        Ok(Gated::Done(()))
    }
}

fn role_body(
    name: &str,
    description: Option<String>,
    permissions: &[Permission],
) -> AdminResult<NewRole> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::validation("name", "role name is required"));
    }
    Ok(NewRole {
        name: name.to_string(),
        description: description.filter(|d| !d.trim().is_empty()),
        permissions: permissions.iter().map(|p| IdRef::new(p.id.clone())).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AuthApi, MemoryApi};
    use crate::confirm::AssumeYes;

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            name: "Karim".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: None,
            institute_id: Some("i-1".to_string()),
            roles: vec!["ROLE_TEACHER".to_string()],
        }
    }

    #[tokio::test]
    async fn test_weak_password_never_sent() {
        let api = Arc::new(MemoryApi::new());
        let service = UserService::new(api.clone());

        let err = service
            .create(new_user("karim@qs.test", "password"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("password"));
        let err = service
            .create(new_user("karim-at-qs", "Str0ng#pw"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("email"));
        assert_eq!(api.call_count(), 0);

        let created = service
            .create(new_user("karim@qs.test", "Str0ng#pw"))
            .await
            .unwrap();
        assert!(created.is_active);
        assert!(api.calls()[0].body.as_ref().unwrap().get("password").is_none());

        let err = service
            .create(new_user("karim@qs.test", "Str0ng#pw"))
            .await
            .unwrap_err();
        assert_eq!(err, AdminError::Conflict("Email already exists".to_string()));
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_log_in() {
        let api = Arc::new(MemoryApi::new());
        let service = UserService::new(api.clone());
        let user = service
            .create(new_user("karim@qs.test", "Str0ng#pw"))
            .await
            .unwrap();
        assert!(api.login("karim@qs.test", "Str0ng#pw").await.is_ok());

        let disabled = service.set_active(&user.id, false).await.unwrap();
        assert!(!disabled.is_active);
        let err = api.login("karim@qs.test", "Str0ng#pw").await.unwrap_err();
        assert!(matches!(err, AdminError::Unauthorized(_)));

        let page = service
            .list(&UserQuery {
                active: Some(true),
                ..UserQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_elements, 0);

        service.set_active(&user.id, true).await.unwrap();
        assert!(api.login("karim@qs.test", "Str0ng#pw").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_moves_login_to_new_email() {
        let api = Arc::new(MemoryApi::new());
        let service = UserService::new(api.clone());
        let user = service
            .create(new_user("karim@qs.test", "Str0ng#pw"))
            .await
            .unwrap();

        let mut update = UserUpdate::from(&user);
        update.email = "k.rahman@qs.test".to_string();
        let updated = service.update(&user.id, update).await.unwrap();
        assert_eq!(updated.email, "k.rahman@qs.test");
        assert!(api.login("k.rahman@qs.test", "Str0ng#pw").await.is_ok());
        assert!(api.login("karim@qs.test", "Str0ng#pw").await.is_err());

        let declined = service
            .reset_password(&updated, &|_: &str| false)
            .await
            .unwrap();
        assert!(declined.is_cancelled());
        service.delete(&updated, &AssumeYes).await.unwrap();
        assert!(matches!(
            service.get(&user.id).await,
            Err(AdminError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_permissions_resolved_by_id() {
        let api = Arc::new(MemoryApi::new());
        for (id, name) in [("p-1", "QUESTION_APPROVE"), ("p-2", "USER_MANAGE")] {
            api.seed_permission(Permission {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
            })
            .await;
        }
        let service = RoleService::new(api.clone());
        let permissions = service.permissions().await.unwrap();

        let reviewer = service
            .create("ROLE_REVIEWER", Some(" ".to_string()), &permissions[..1])
            .await
            .unwrap();
        assert!(reviewer.grants("QUESTION_APPROVE"));
        assert!(!reviewer.grants("USER_MANAGE"));
        assert_eq!(reviewer.description, None);

        let err = service
            .create("ROLE_REVIEWER", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        let updated = service
            .update(&reviewer.id, "ROLE_REVIEWER", None, &permissions)
            .await
            .unwrap();
        assert!(updated.grants("USER_MANAGE"));

        assert!(service.delete(&updated, &|_: &str| false).await.unwrap().is_cancelled());
        service.delete(&updated, &AssumeYes).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }
}

use serde::{Deserialize, Serialize};

use crate::model::{Id, SettingsScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    InstituteAdmin,
    Teacher,
    Student,
}

/// Who the current token belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Id,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub institute_id: Option<Id>,
}

impl UserContext {
    pub fn new(user_id: impl Into<Id>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            name: None,
            role,
            institute_id: None,
        }
    }

    pub fn with_details(
        user_id: impl Into<Id>,
        role: Role,
        email: Option<String>,
        name: Option<String>,
        institute_id: Option<Id>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            name,
            role,
            institute_id,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Settings tree this user edits. Resolved from the role alone.
    pub fn settings_scope(&self) -> SettingsScope {
        if self.is_super_admin() {
            SettingsScope::Global
        } else {
            SettingsScope::Institute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_scope_follows_role() {
        let admin = UserContext::new("u-1", Role::SuperAdmin);
        assert_eq!(admin.settings_scope(), SettingsScope::Global);

        let teacher = UserContext::with_details(
            "u-2",
            Role::InstituteAdmin,
            Some("head@school.edu".to_string()),
            None,
            Some("inst-1".to_string()),
        );
        assert_eq!(teacher.settings_scope(), SettingsScope::Institute);
    }

    #[test]
    fn test_role_wire_names() {
        let role: Role = serde_json::from_str("\"INSTITUTE_ADMIN\"").unwrap();
        assert_eq!(role, Role::InstituteAdmin);
    }
}

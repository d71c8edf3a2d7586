use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AdminError, AdminResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettingCategory {
    General,
    Branding,
    Communication,
    Ai,
    Exam,
    Storage,
    Security,
}

impl SettingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::General => "GENERAL",
            SettingCategory::Branding => "BRANDING",
            SettingCategory::Communication => "COMMUNICATION",
            SettingCategory::Ai => "AI",
            SettingCategory::Exam => "EXAM",
            SettingCategory::Storage => "STORAGE",
            SettingCategory::Security => "SECURITY",
        }
    }
}

/// Which settings tree a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsScope {
    Global,
    Institute,
}

impl SettingsScope {
    pub fn path_segment(&self) -> &'static str {
        match self {
            SettingsScope::Global => "global",
            SettingsScope::Institute => "institute",
        }
    }
}

/// Key/value settings of one category.
pub type SettingsMap = BTreeMap<String, String>;

/// Security keys the server falls back to when a scope has no value.
pub const SECURITY_DEFAULTS: [(&str, &str); 9] = [
    ("PASSWORD_MIN_LENGTH", "8"),
    ("PASSWORD_REQUIRE_UPPERCASE", "true"),
    ("PASSWORD_REQUIRE_LOWERCASE", "true"),
    ("PASSWORD_REQUIRE_NUMBER", "true"),
    ("PASSWORD_REQUIRE_SPECIAL", "true"),
    ("MAX_LOGIN_ATTEMPTS", "5"),
    ("ACCOUNT_LOCK_DURATION_MINUTES", "15"),
    ("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", "60"),
    ("JWT_REFRESH_TOKEN_EXPIRY_DAYS", "30"),
];

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Password rules read from the security settings of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from_settings(&SettingsMap::new())
    }
}

impl PasswordPolicy {
    /// Missing or unparsable keys take the server default.
    pub fn from_settings(settings: &SettingsMap) -> Self {
        fn value<T: std::str::FromStr>(settings: &SettingsMap, key: &str) -> Option<T> {
            settings
                .get(key)
                .map(String::as_str)
                .or_else(|| {
                    SECURITY_DEFAULTS
                        .iter()
                        .find(|(k, _)| *k == key)
                        .map(|(_, v)| *v)
                })
                .and_then(|raw| raw.trim().parse().ok())
        }

        Self {
            min_length: value(settings, "PASSWORD_MIN_LENGTH").unwrap_or(8),
            require_uppercase: value(settings, "PASSWORD_REQUIRE_UPPERCASE").unwrap_or(true),
            require_lowercase: value(settings, "PASSWORD_REQUIRE_LOWERCASE").unwrap_or(true),
            require_number: value(settings, "PASSWORD_REQUIRE_NUMBER").unwrap_or(true),
            require_special: value(settings, "PASSWORD_REQUIRE_SPECIAL").unwrap_or(true),
        }
    }

    pub fn check(&self, password: &str) -> AdminResult<()> {
        let fail = |message: String| Err(AdminError::validation("password", message));

        if password.chars().count() < self.min_length {
            return fail(format!(
                "Password must be at least {} characters long.",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return fail("Password must contain at least one uppercase letter.".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return fail("Password must contain at least one lowercase letter.".to_string());
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return fail("Password must contain at least one number.".to_string());
        }
        if self.require_special && !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            return fail("Password must contain at least one special character.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_rules() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.min_length, 8);
        assert!(policy.check("Secret#12").is_ok());

        let err = policy.check("secret#12").unwrap_err();
        assert_eq!(err.field(), Some("password"));
        assert_eq!(
            err.to_string(),
            "Password must contain at least one uppercase letter."
        );
        assert!(policy.check("Sh#1").is_err());
    }

    #[test]
    fn test_policy_reads_scope_overrides() {
        let mut settings = SettingsMap::new();
        settings.insert("PASSWORD_MIN_LENGTH".to_string(), "4".to_string());
        settings.insert("PASSWORD_REQUIRE_SPECIAL".to_string(), "false".to_string());
        settings.insert("PASSWORD_REQUIRE_UPPERCASE".to_string(), "not-a-bool".to_string());

        let policy = PasswordPolicy::from_settings(&settings);
        assert_eq!(policy.min_length, 4);
        assert!(!policy.require_special);
        assert!(policy.require_uppercase);
        assert!(policy.check("Ab12").is_ok());
    }
}

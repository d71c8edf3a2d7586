use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstituteType {
    School,
    College,
    University,
    Coaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstituteStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "FREE",
            SubscriptionPlan::Basic => "BASIC",
            SubscriptionPlan::Premium => "PREMIUM",
            SubscriptionPlan::Enterprise => "ENTERPRISE",
        }
    }
}

/// A tenant of the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institute {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    pub code: String,
    #[serde(default, rename = "type")]
    pub institute_type: Option<InstituteType>,
    pub status: InstituteStatus,
    #[serde(default)]
    pub plan_type: SubscriptionPlan,
    #[serde(default)]
    pub plan_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_teachers: u32,
    #[serde(default)]
    pub max_students: u32,
}

/// Editable part of an institute, sent on create and update. Status and
/// plan changes go through their own routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstitute {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    pub code: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub institute_type: Option<InstituteType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub max_teachers: u32,
    pub max_students: u32,
}

impl NewInstitute {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: None,
            code: code.into(),
            institute_type: None,
            contact_email: None,
            contact_phone: None,
            address: None,
            max_teachers: 5,
            max_students: 50,
        }
    }
}

/// One page of a paged listing (`Page<T>` on the backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
}

/// Query for the institute listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstituteQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InstituteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

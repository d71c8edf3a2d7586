use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A class/grade, e.g. "Class 10". `order` drives display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicClass {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Subject in the global library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Class ↔ Subject link. The selector's subject level lists these, keyed by
/// `class_subject_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSubject {
    pub class_subject_id: Id,
    pub subject_id: Id,
    pub subject_name: String,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default = "default_true", alias = "active")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Id,
    pub name: String,
}

/// Academic year, e.g. "2025" or "2024-2025". At most one is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicSession {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, alias = "isActive")]
    pub active: bool,
}

/// Body for creating or renaming a session. Activation has its own route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl NewSession {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClass {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Body for both the global subject library and "create and assign to class".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChapter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTopic {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_subject_wire_format() {
        let value = json!({
            "classSubjectId": "cs-1",
            "subjectId": "s-1",
            "subjectName": "Physics",
            "subjectCode": "PHY-101",
            "sessionId": null,
            "isActive": true
        });
        let mapping: ClassSubject = serde_json::from_value(value).unwrap();
        assert_eq!(mapping.class_subject_id, "cs-1");
        assert_eq!(mapping.subject_code.as_deref(), Some("PHY-101"));
        assert!(mapping.session_id.is_none());
    }

    #[test]
    fn test_session_reads_is_active() {
        let session: AcademicSession = serde_json::from_value(json!({
            "id": "sess-1",
            "name": "2025",
            "startDate": "2025-01-01",
            "isActive": true
        }))
        .unwrap();
        assert!(session.active);
        assert_eq!(session.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert!(session.end_date.is_none());
    }

    #[test]
    fn test_new_chapter_omits_missing_number() {
        let body = serde_json::to_value(NewChapter {
            name: "Motion".to_string(),
            chapter_number: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "name": "Motion" }));
    }
}

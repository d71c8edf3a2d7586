use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::{Id, IdRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Mcq,
    Cq,
    Short,
    TrueFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Bangla,
    English,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

/// A stored question as returned by the question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Id,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub difficulty: Difficulty,
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub language: Language,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub option_label: String,
    pub option_text: String,
    #[serde(alias = "correct")]
    pub is_correct: bool,
}

/// Body shared by all three create endpoints. The MCQ endpoint wraps it
/// together with its options in [`NewMcq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub question_text: String,
    pub marks: f64,
    pub difficulty: Difficulty,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub academic_class: IdRef,
    pub class_subject: IdRef,
    pub chapter: IdRef,
    pub topic: Option<IdRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMcq {
    pub question: NewQuestion,
    pub options: Vec<QuestionOption>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_deserializes_backend_shape() {
        let value = json!({
            "id": "q-1",
            "type": "MCQ",
            "questionText": "<p>What is velocity?</p>",
            "difficulty": "EASY",
            "marks": 1.0,
            "language": "English",
            "status": "PENDING",
            "approvedAt": null
        });
        let question: Question = serde_json::from_value(value).unwrap();
        assert_eq!(question.question_type, QuestionType::Mcq);
        assert_eq!(question.status, QuestionStatus::Pending);
        assert_eq!(question.language, Language::English);
    }

    #[test]
    fn test_option_accepts_bean_style_correct_flag() {
        let option: QuestionOption = serde_json::from_value(json!({
            "optionLabel": "A",
            "optionText": "10 m/s",
            "correct": true
        }))
        .unwrap();
        assert!(option.is_correct);

        let out = serde_json::to_value(&option).unwrap();
        assert_eq!(out["isCorrect"], json!(true));
    }
}

use std::sync::Arc;

use crate::client::QuestionApi;
use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::AdminResult;
use crate::model::{Id, Question, QuestionStatus, QuestionType};

/// Question bank listing and moderation.
pub struct QuestionBank {
    api: Arc<dyn QuestionApi>,
}

impl QuestionBank {
    pub fn new(api: Arc<dyn QuestionApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> AdminResult<Vec<Question>> {
        self.api.list_questions().await
    }

    pub async fn list_filtered(
        &self,
        question_type: Option<QuestionType>,
        status: Option<QuestionStatus>,
    ) -> AdminResult<Vec<Question>> {
        let questions = self.api.list_questions().await?;
        Ok(questions
            .into_iter()
            .filter(|q| question_type.map_or(true, |t| q.question_type == t))
            .filter(|q| status.map_or(true, |s| q.status == s))
            .collect())
    }

    pub async fn approve(&self, id: &Id) -> AdminResult<Question> {
        let question = self.api.approve_question(id).await?;
        log::info!("Approved question {}", id);
        Ok(question)
    }

    pub async fn reject(&self, id: &Id) -> AdminResult<Question> {
        let question = self.api.reject_question(id).await?;
        log::info!("Rejected question {}", id);
        Ok(question)
    }

    pub async fn delete(&self, id: &Id, confirm: &dyn Confirm) -> AdminResult<DeleteOutcome> {
        if !confirm.confirm(&format!("Delete question {}?", id)) {
            return Ok(Gated::Cancelled);
        }
        self.api.delete_question(id).await?;
        log::info!("Deleted question {}", id);
        Ok(Gated::Done(()))
    }
}

use std::sync::Arc;

use crate::client::{AcademicApi, QuestionApi};
use crate::error::AdminResult;
use crate::forms::{build_question, require_positive_marks, require_text, QuestionMeta, Tagging};
use crate::model::{NewQuestion, Question};
use crate::selector::{AcademicHierarchy, CascadingSelector};

/// Short-answer form. The sample answer travels as the explanation.
pub struct ShortForm {
    selector: CascadingSelector,
    questions: Arc<dyn QuestionApi>,
    pub body: String,
    pub meta: QuestionMeta,
}

impl ShortForm {
    pub fn new<A>(api: Arc<A>) -> Self
    where
        A: AcademicApi + QuestionApi + 'static,
    {
        let selector = CascadingSelector::new(Arc::new(AcademicHierarchy::new(api.clone())));
        Self::with_selector(selector, api)
    }

    pub fn with_selector(selector: CascadingSelector, questions: Arc<dyn QuestionApi>) -> Self {
        Self {
            selector,
            questions,
            body: String::new(),
            meta: QuestionMeta::with_marks(2.0),
        }
    }

    pub fn selector(&self) -> &CascadingSelector {
        &self.selector
    }

    pub fn set_sample_answer(&mut self, answer: impl Into<String>) {
        self.meta.explanation = Some(answer.into());
    }

    pub fn validate(&self) -> AdminResult<NewQuestion> {
        require_text("body", &self.body, "question text is required")?;
        let tagging = Tagging::from_selector(&self.selector)?;
        require_positive_marks("marks", self.meta.marks)?;
        Ok(build_question(self.body.clone(), &self.meta, tagging))
    }

    pub async fn submit(&self) -> AdminResult<Question> {
        let question = self.validate()?;
        let created = self.questions.create_short(question).await?;
        log::info!("Created short question {}", created.id);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;

    #[test]
    fn test_default_marks() {
        let form = ShortForm::new(Arc::new(MemoryApi::new()));
        assert_eq!(form.meta.marks, 2.0);
        assert!(form.meta.explanation.is_none());
    }

    #[tokio::test]
    async fn test_submit_without_selection_sends_nothing() {
        let api = Arc::new(MemoryApi::new());
        let mut form = ShortForm::new(api.clone());
        form.body = "Define momentum.".to_string();
        form.set_sample_answer("p = mv");

        let err = form.submit().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(api.call_count(), 0);
    }
}

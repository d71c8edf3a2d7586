use std::fmt::Write as _;
use std::sync::Arc;

use crate::client::{AcademicApi, QuestionApi};
use crate::error::{AdminError, AdminResult};
use crate::forms::{build_question, require_positive_marks, require_text, QuestionMeta, Tagging};
use crate::model::{NewQuestion, Question};
use crate::selector::{AcademicHierarchy, CascadingSelector};

pub const SUB_QUESTION_LABELS: [char; 4] = ['a', 'b', 'c', 'd'];
const DEFAULT_SUB_MARKS: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

#[derive(Debug, Clone, PartialEq)]
pub struct SubQuestion {
    pub label: char,
    pub text: String,
    pub marks: f64,
}

/// Creative question: a stem followed by exactly four sub-questions (a–d).
/// The backend stores one question text, so the parts are rendered to HTML
/// on submit and the total marks are the sum of the parts.
pub struct CqForm {
    selector: CascadingSelector,
    questions: Arc<dyn QuestionApi>,
    pub stem: String,
    sub_questions: [SubQuestion; 4],
    pub meta: QuestionMeta,
}

impl CqForm {
    pub fn new<A>(api: Arc<A>) -> Self
    where
        A: AcademicApi + QuestionApi + 'static,
    {
        let selector = CascadingSelector::new(Arc::new(AcademicHierarchy::new(api.clone())));
        Self::with_selector(selector, api)
    }

    pub fn with_selector(selector: CascadingSelector, questions: Arc<dyn QuestionApi>) -> Self {
        let sub_questions = std::array::from_fn(|i| SubQuestion {
            label: SUB_QUESTION_LABELS[i],
            text: String::new(),
            marks: DEFAULT_SUB_MARKS[i],
        });
        Self {
            selector,
            questions,
            stem: String::new(),
            sub_questions,
            meta: QuestionMeta::with_marks(DEFAULT_SUB_MARKS.iter().sum()),
        }
    }

    pub fn selector(&self) -> &CascadingSelector {
        &self.selector
    }

    pub fn sub_questions(&self) -> &[SubQuestion] {
        &self.sub_questions
    }

    pub fn set_sub_question(
        &mut self,
        index: usize,
        text: impl Into<String>,
        marks: f64,
    ) -> AdminResult<()> {
        let sub = self.sub_questions.get_mut(index).ok_or_else(|| {
            AdminError::validation("subQuestions", format!("no sub-question at {}", index))
        })?;
        sub.text = text.into();
        sub.marks = marks;
        self.meta.marks = self.total_marks();
        Ok(())
    }

    pub fn total_marks(&self) -> f64 {
        self.sub_questions.iter().map(|s| s.marks).sum()
    }

    /// Stem and sub-questions as the single HTML body the backend stores.
    pub fn render_html(&self) -> String {
        let mut html = format!(
            "<div class=\"cq-stem\">{}</div><div class=\"cq-questions\"><ol type=\"a\">",
            self.stem
        );
        for sub in &self.sub_questions {
            let _ = write!(
                html,
                "<li data-marks=\"{marks}\"><span class=\"cq-text\">{text}</span> \
                 <span class=\"cq-marks\">({marks})</span></li>",
                marks = sub.marks,
                text = sub.text
            );
        }
        html.push_str("</ol></div>");
        html
    }

    pub fn validate(&self) -> AdminResult<NewQuestion> {
        require_text("stem", &self.stem, "stem is required")?;
        let tagging = Tagging::from_selector(&self.selector)?;

        for sub in &self.sub_questions {
            require_text(
                "subQuestions",
                &sub.text,
                &format!("sub-question ({}) needs text", sub.label),
            )?;
            require_positive_marks("subQuestions", sub.marks)?;
        }

        let meta = QuestionMeta {
            marks: self.total_marks(),
            ..self.meta.clone()
        };
        Ok(build_question(self.render_html(), &meta, tagging))
    }

    pub async fn submit(&self) -> AdminResult<Question> {
        let question = self.validate()?;
        let created = self.questions.create_cq(question).await?;
        log::info!("Created CQ {} ({} marks)", created.id, created.marks);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;

    #[test]
    fn test_default_marks_total_ten() {
        let form = CqForm::new(Arc::new(MemoryApi::new()));
        let marks: Vec<_> = form.sub_questions().iter().map(|s| s.marks).collect();
        assert_eq!(marks, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(form.total_marks(), 10.0);
        assert_eq!(form.meta.marks, 10.0);
    }

    #[test]
    fn test_render_html_keeps_order_and_marks() {
        let mut form = CqForm::new(Arc::new(MemoryApi::new()));
        form.stem = "A car accelerates.".to_string();
        for (i, text) in ["Define", "Explain", "Compute", "Compare"].iter().enumerate() {
            form.set_sub_question(i, *text, (i + 1) as f64).unwrap();
        }

        let html = form.render_html();
        assert!(html.starts_with("<div class=\"cq-stem\">A car accelerates.</div>"));
        assert!(html.contains("<li data-marks=\"4\"><span class=\"cq-text\">Compare</span>"));
        let define = html.find("Define").unwrap();
        let compare = html.find("Compare").unwrap();
        assert!(define < compare);
    }

    #[test]
    fn test_tagging_checked_before_parts() {
        let mut form = CqForm::new(Arc::new(MemoryApi::new()));
        form.stem = "Stem".to_string();
        let err = form.validate().unwrap_err();
        assert_eq!(err.field(), Some("class"));
        assert!(form.set_sub_question(4, "e", 1.0).is_err());
    }
}

use std::sync::Arc;

use crate::client::{AcademicApi, QuestionApi};
use crate::error::{AdminError, AdminResult};
use crate::forms::{build_question, require_positive_marks, require_text, QuestionMeta, Tagging};
use crate::model::{NewMcq, Question, QuestionOption};
use crate::selector::{AcademicHierarchy, CascadingSelector};

pub const OPTION_LABELS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = OPTION_LABELS.len();

#[derive(Debug, Clone, PartialEq)]
pub struct McqOption {
    pub label: &'static str,
    pub text: String,
    pub correct: bool,
}

/// Multiple-choice authoring form. Starts with four blank options A–D.
pub struct McqForm {
    selector: CascadingSelector,
    questions: Arc<dyn QuestionApi>,
    pub body: String,
    pub meta: QuestionMeta,
    options: Vec<McqOption>,
}

impl McqForm {
    pub fn new<A>(api: Arc<A>) -> Self
    where
        A: AcademicApi + QuestionApi + 'static,
    {
        let selector = CascadingSelector::new(Arc::new(AcademicHierarchy::new(api.clone())));
        Self::with_selector(selector, api)
    }

    pub fn with_selector(selector: CascadingSelector, questions: Arc<dyn QuestionApi>) -> Self {
        let options = OPTION_LABELS[..4]
            .iter()
            .map(|&label| McqOption {
                label,
                text: String::new(),
                correct: false,
            })
            .collect();
        Self {
            selector,
            questions,
            body: String::new(),
            meta: QuestionMeta::with_marks(1.0),
            options,
        }
    }

    pub fn selector(&self) -> &CascadingSelector {
        &self.selector
    }

    pub fn options(&self) -> &[McqOption] {
        &self.options
    }

    pub fn set_option_text(&mut self, index: usize, text: impl Into<String>) -> AdminResult<()> {
        self.option_mut(index)?.text = text.into();
        Ok(())
    }

    /// Append a blank option with the next free label.
    pub fn add_option(&mut self) -> AdminResult<()> {
        if self.options.len() >= MAX_OPTIONS {
            return Err(AdminError::validation(
                "options",
                format!("at most {} options are allowed", MAX_OPTIONS),
            ));
        }
        self.options.push(McqOption {
            label: OPTION_LABELS[self.options.len()],
            text: String::new(),
            correct: false,
        });
        Ok(())
    }

    /// Remove an option and relabel the rest in order.
    pub fn remove_option(&mut self, index: usize) -> AdminResult<()> {
        if self.options.len() <= MIN_OPTIONS {
            return Err(AdminError::validation(
                "options",
                format!("at least {} options are required", MIN_OPTIONS),
            ));
        }
        self.option_mut(index)?;
        self.options.remove(index);
        for (option, label) in self.options.iter_mut().zip(OPTION_LABELS) {
            option.label = label;
        }
        Ok(())
    }

    /// Make `index` the only correct option.
    pub fn mark_correct(&mut self, index: usize) -> AdminResult<()> {
        self.option_mut(index)?;
        for (i, option) in self.options.iter_mut().enumerate() {
            option.correct = i == index;
        }
        Ok(())
    }

    /// Set a single option's flag without touching the others.
    pub fn set_correct(&mut self, index: usize, correct: bool) -> AdminResult<()> {
        self.option_mut(index)?.correct = correct;
        Ok(())
    }

    fn option_mut(&mut self, index: usize) -> AdminResult<&mut McqOption> {
        self.options
            .get_mut(index)
            .ok_or_else(|| AdminError::validation("options", format!("no option at {}", index)))
    }

    /// Check the form and build the create body.
    pub fn validate(&self) -> AdminResult<NewMcq> {
        require_text("body", &self.body, "question text is required")?;
        let tagging = Tagging::from_selector(&self.selector)?;

        if self.options.iter().filter(|o| o.correct).count() != 1 {
            return Err(AdminError::validation(
                "options",
                "select exactly one correct answer",
            ));
        }
        for option in &self.options {
            require_text(
                "options",
                &option.text,
                &format!("option {} needs text", option.label),
            )?;
        }
        require_positive_marks("marks", self.meta.marks)?;

        Ok(NewMcq {
            question: build_question(self.body.clone(), &self.meta, tagging),
            options: self
                .options
                .iter()
                .map(|o| QuestionOption {
                    option_label: o.label.to_string(),
                    option_text: o.text.clone(),
                    is_correct: o.correct,
                })
                .collect(),
        })
    }

    /// Validate and create. Form state is kept either way.
    pub async fn submit(&self) -> AdminResult<Question> {
        let mcq = self.validate()?;
        let created = self.questions.create_mcq(mcq).await?;
        log::info!("Created MCQ {}", created.id);
        Ok(created)
    }
}

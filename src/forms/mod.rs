pub mod cq;
pub mod mcq;
pub mod short;

pub use cq::*;
pub use mcq::*;
pub use short::*;

use crate::error::{AdminError, AdminResult};
use crate::model::{Difficulty, IdRef, Language, NewQuestion};
use crate::selector::{CascadingSelector, Level};

/// Fields every authoring form carries besides its body.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionMeta {
    pub marks: f64,
    pub difficulty: Difficulty,
    pub language: Language,
    pub explanation: Option<String>,
}

impl QuestionMeta {
    pub fn with_marks(marks: f64) -> Self {
        Self {
            marks,
            difficulty: Difficulty::default(),
            language: Language::default(),
            explanation: None,
        }
    }
}

/// Where a question is filed in the academic hierarchy. Topic is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagging {
    pub class: IdRef,
    pub class_subject: IdRef,
    pub chapter: IdRef,
    pub topic: Option<IdRef>,
}

impl Tagging {
    /// Read the current selection, requiring everything down to chapter.
    pub fn from_selector(selector: &CascadingSelector) -> AdminResult<Self> {
        let required = |level: Level| {
            selector.selected(level).map(IdRef::new).ok_or_else(|| {
                let label = &selector.def(level).label;
                AdminError::validation(label.clone(), format!("{} is required", label))
            })
        };

        Ok(Self {
            class: required(Level::Class)?,
            class_subject: required(Level::Subject)?,
            chapter: required(Level::Chapter)?,
            topic: selector.selected(Level::Topic).map(IdRef::new),
        })
    }
}

/// Spellings of a non-breaking space the editor may emit.
const NBSP_ENTITIES: [&str; 4] = ["&nbsp;", "&#160;", "&#xA0;", "&#xa0;"];

/// Text content of a rich-text body, tags dropped and non-breaking spaces
/// turned into plain ones. Other entities are left encoded.
pub fn visible_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    NBSP_ENTITIES
        .iter()
        .fold(text, |text, entity| text.replace(*entity, " "))
        .replace('\u{a0}', " ")
}

pub(crate) fn require_text(field: &str, value: &str, message: &str) -> AdminResult<()> {
    if visible_text(value).trim().is_empty() {
        return Err(AdminError::validation(field, message));
    }
    Ok(())
}

pub(crate) fn require_positive_marks(field: &str, marks: f64) -> AdminResult<()> {
    if !(marks.is_finite() && marks > 0.0) {
        return Err(AdminError::validation(field, "marks must be greater than zero"));
    }
    Ok(())
}

/// Assemble the common create body once the form has validated.
pub(crate) fn build_question(
    question_text: String,
    meta: &QuestionMeta,
    tagging: Tagging,
) -> NewQuestion {
    NewQuestion {
        question_text,
        marks: meta.marks,
        difficulty: meta.difficulty,
        language: meta.language,
        explanation: meta
            .explanation
            .clone()
            .filter(|e| !visible_text(e).trim().is_empty()),
        academic_class: tagging.class,
        class_subject: tagging.class_subject,
        chapter: tagging.chapter,
        topic: tagging.topic,
    }
}

/// Destructive-action gate. Asked once before a delete/restore is sent.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirms everything. For scripted use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Result of a gated action.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
    Done(T),
    /// The user declined; nothing was sent.
    Cancelled,
}

impl<T> Gated<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Gated::Cancelled)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Gated::Done(value) => Some(value),
            Gated::Cancelled => None,
        }
    }
}

pub type DeleteOutcome = Gated<()>;

// ABOUTME: Yes/no decisions the deploy may need from an operator.
// ABOUTME: The CLI answers interactively; tests and unattended runs use fixed answers.

/// Answers a yes/no question.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str, default: bool) -> bool;
}

/// Always answers yes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str, _default: bool) -> bool {
        tracing::debug!("{} -> yes (assumed)", prompt);
        true
    }
}

/// Takes the default answer of every question. Used when nobody can be asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeDefault;

impl Confirm for AssumeDefault {
    fn confirm(&self, prompt: &str, default: bool) -> bool {
        tracing::debug!("{} -> {} (default)", prompt, if default { "yes" } else { "no" });
        default
    }
}

/// Gives the same answer to every question.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _prompt: &str, _default: bool) -> bool {
        self.0
    }
}

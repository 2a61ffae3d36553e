use crate::event::UnknownStageError;

/// Reasons for the hook to answer `FAILED` without a check verdict
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The payload is not a [`crate::HookEvent`]
    #[error("malformed hook event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
    /// The event names a stage the hook does not know
    #[error(transparent)]
    UnknownStage(#[from] UnknownStageError),
    /// The check returned an error or panicked
    #[error("check execution failed: {0:#}")]
    CheckExecution(anyhow::Error),
}

impl HookError {
    /// Short machine readable name, used in audit entries
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "MalformedEvent",
            Self::UnknownStage(_) => "UnknownStageError",
            Self::CheckExecution(_) => "CheckExecutionError",
        }
    }
}

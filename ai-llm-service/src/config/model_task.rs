/// The job a prompt is sent for. Each task maps to its own model profile
/// (model, temperature, timeout) inside [`crate::LlmServiceProfiles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTask {
    /// Grounded answer generation.
    Answer,
    /// Relevance grading of an answer (1..=10).
    Judge,
    /// Query reformulation before a new retrieval attempt.
    Rewrite,
}

impl ModelTask {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelTask::Answer => "answer",
            ModelTask::Judge => "judge",
            ModelTask::Rewrite => "rewrite",
        }
    }
}

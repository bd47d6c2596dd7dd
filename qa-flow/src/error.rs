//! Typed error for the qa-flow crate.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// A question was asked without any file to answer from.
    #[error("[QA Flow] no files selected")]
    NoFilesSelected,

    #[error("[QA Flow] question is empty")]
    EmptyQuery,

    #[error("[QA Flow] invalid configuration: {0}")]
    Config(String),

    /// Raised by a [`crate::ChunkRetriever`]; the flow degrades it to "no documents".
    #[error("[QA Flow] retrieval failed: {0}")]
    Retrieval(String),

    /// Raised by a [`crate::TextGenerator`]; the flow degrades it per step.
    #[error("[QA Flow] generation failed: {0}")]
    Generation(String),

    /// A retrieval or model call outlived its time budget.
    #[error("[QA Flow] call timed out after {0:?}")]
    Timeout(Duration),
}

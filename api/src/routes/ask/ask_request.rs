use qa_flow::FlowReport;
use serde::{Deserialize, Serialize};

/// Request payload for `POST /ask`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// Natural language question.
    pub question: String,
    /// User-visible names of the files to answer from.
    pub files: Vec<String>,
}

/// Response payload for `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// Sorted selection the exchange was recorded under.
    pub chat: Vec<String>,
    #[serde(flatten)]
    pub report: FlowReport,
}

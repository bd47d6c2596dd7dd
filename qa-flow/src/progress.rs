//! Step notifications for the correction flow.
//!
//! Purely observational: implementations see every transition but cannot
//! change the state. Use `NoopProgress` where nobody listens and
//! `TracingProgress` on the server.

use serde::Serialize;
use tracing::info;

use crate::state::QueryState;

/// States of the correction flow, in the order they can be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Retrieve,
    Generate,
    Evaluate,
    Accept,
    CountRetry,
    RewriteQuery,
    ExpandRetrieval,
    Fail,
}

impl FlowStep {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowStep::Retrieve => "retrieve",
            FlowStep::Generate => "generate",
            FlowStep::Evaluate => "evaluate",
            FlowStep::Accept => "accept",
            FlowStep::CountRetry => "count_retry",
            FlowStep::RewriteQuery => "rewrite_query",
            FlowStep::ExpandRetrieval => "expand_retrieval",
            FlowStep::Fail => "fail",
        }
    }
}

/// Receives a notification after each step completes.
pub trait Progress: Send + Sync {
    fn step(&self, _step: FlowStep, _state: &QueryState) {}
}

/// No-op reporter.
#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

/// Emits one `info` event per step.
#[derive(Default, Clone, Copy)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn step(&self, step: FlowStep, state: &QueryState) {
        info!(
            step = step.as_str(),
            retry = state.retry_count(),
            breadth = state.retrieval_breadth,
            documents = state.retrieved_documents.len(),
            score = state.relevance_score.map(|s| s.value()),
            "qa flow step"
        );
    }
}

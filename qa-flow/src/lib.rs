//! Question answering over uploaded documents with a self-correcting loop.
//!
//! Public API: [`CorrectiveRag::answer_question`]. It retrieves chunks of the
//! selected files, generates an answer, has a judge model score it and, on a
//! low score, walks a fixed ladder: rewrite the query, widen retrieval, give
//! up with a fixed message. The flow never fails because a collaborator
//! failed; see [`flow`] for how each failure degrades.
//!
//! # Example
//! ```no_run
//! # use std::sync::Arc;
//! # use qa_flow::{CorrectiveRag, FlowConfig, ProfilesGenerator, StoreRetriever};
//! # async fn run(store: Arc<dyn rag_store::ChunkStore>, svc: Arc<ai_llm_service::LlmServiceProfiles>) {
//! let rag = CorrectiveRag::new(
//!     Arc::new(StoreRetriever::new(store)),
//!     Arc::new(ProfilesGenerator::new(svc)),
//!     FlowConfig::default(),
//! );
//! let report = rag
//!     .answer_question("What is the refund policy?", &["policies.pdf".to_string()])
//!     .await
//!     .unwrap();
//! println!("{}", report.answer);
//! # }
//! ```

mod cfg;
mod error;
pub mod flow;
mod ports;
mod progress;
mod prompt;
mod state;

pub use cfg::{BREADTH_STEP, FlowConfig, INITIAL_RETRIEVAL_BREADTH};
pub use error::FlowError;
pub use flow::{
    CorrectiveRag, FlowOutcome, FlowReport, GENERATION_ERROR_ANSWER, NO_RELEVANT_ANSWER, SourceRef,
};
pub use ports::{ChunkRetriever, FlowFuture, ProfilesGenerator, StoreRetriever, TextGenerator};
pub use progress::{FlowStep, NoopProgress, Progress, TracingProgress};
pub use state::{Correction, FileSelection, MAX_RETRIES, QueryState, RETRY_LADDER, RelevanceScore};

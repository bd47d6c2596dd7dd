//! The correction state machine.
//!
//! ```text
//! Retrieve -> Generate -> Evaluate -> Accept
//!                            |
//!                            v
//!                        CountRetry -> RewriteQuery    -> Retrieve
//!                                   -> ExpandRetrieval -> Retrieve
//!                                   -> Fail
//! ```
//!
//! Collaborator failures never escape: retrieval degrades to no documents,
//! generation to a fixed apology, judging to the minimum score and rewriting
//! to the unchanged query. Every call is bounded by the per-call timeout and
//! by what is left of the question's deadline.

use std::future::Future;
use std::sync::Arc;

use ai_llm_service::ModelTask;
use rag_store::ChunkHit;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cfg::FlowConfig;
use crate::error::FlowError;
use crate::ports::{ChunkRetriever, TextGenerator};
use crate::progress::{FlowStep, NoopProgress, Progress};
use crate::prompt::{answer_prompt, judge_prompt, rewrite_prompt};
use crate::state::{Correction, FileSelection, QueryState, RelevanceScore};

/// Answer used when the answer model fails.
pub const GENERATION_ERROR_ANSWER: &str =
    "I apologize, but I encountered an error while generating the answer.";

/// Answer returned after the last rung of the ladder.
pub const NO_RELEVANT_ANSWER: &str = "I apologize, but I was unable to find a relevant answer \
in the uploaded file(s). Please try rephrasing your question for better results.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOutcome {
    Accepted,
    GaveUp,
}

/// A chunk the final answer was generated from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub file_name: String,
    pub ordinal: Option<u32>,
    pub score: f32,
}

/// Result of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub answer: String,
    pub outcome: FlowOutcome,
    /// Low-score rounds the question went through (0..=3).
    pub retries: u8,
    pub relevance_score: RelevanceScore,
    /// Query of the last attempt, after any rewrite.
    pub final_query: String,
    pub retrieval_breadth: usize,
    /// Empty when the flow gave up.
    pub sources: Vec<SourceRef>,
}

/// Self-correcting question answering over a retriever and a generator.
pub struct CorrectiveRag {
    retriever: Arc<dyn ChunkRetriever>,
    generator: Arc<dyn TextGenerator>,
    progress: Arc<dyn Progress>,
    cfg: FlowConfig,
}

impl CorrectiveRag {
    pub fn new(
        retriever: Arc<dyn ChunkRetriever>,
        generator: Arc<dyn TextGenerator>,
        cfg: FlowConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            progress: Arc::new(NoopProgress),
            cfg,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.cfg
    }

    /// Answers `query` from the chunks of `file_names`.
    ///
    /// Always terminates with an answer once the inputs are valid; at most
    /// three full attempts are made.
    ///
    /// # Errors
    /// [`FlowError::EmptyQuery`] or [`FlowError::NoFilesSelected`] only.
    #[instrument(skip_all, fields(files = file_names.len()))]
    pub async fn answer_question(
        &self,
        query: &str,
        file_names: &[String],
    ) -> Result<FlowReport, FlowError> {
        if query.trim().is_empty() {
            return Err(FlowError::EmptyQuery);
        }
        let selection = FileSelection::new(file_names.iter().cloned())?;
        let deadline = Instant::now() + self.cfg.deadline;
        let mut state = QueryState::new(query.trim(), selection, self.cfg.initial_breadth);

        loop {
            state.retrieved_documents = self.retrieve(&state, deadline).await;
            self.progress.step(FlowStep::Retrieve, &state);

            state.answer = self.generate(&state, deadline).await;
            self.progress.step(FlowStep::Generate, &state);

            let score = self.evaluate(&state, deadline).await;
            state.relevance_score = Some(score);
            self.progress.step(FlowStep::Evaluate, &state);

            if score.accepts() {
                self.progress.step(FlowStep::Accept, &state);
                return Ok(report(state, FlowOutcome::Accepted, score));
            }

            let correction = state.count_retry();
            self.progress.step(FlowStep::CountRetry, &state);

            match correction {
                Correction::RewriteQuery => {
                    if let Some(rewritten) = self.rewrite(&state, deadline).await {
                        debug!(query = %rewritten, "query rewritten");
                        state.query = rewritten;
                    }
                    self.progress.step(FlowStep::RewriteQuery, &state);
                }
                Correction::ExpandRetrieval => {
                    state.retrieval_breadth += self.cfg.breadth_step;
                    self.progress.step(FlowStep::ExpandRetrieval, &state);
                }
                Correction::GiveUp => {
                    state.answer = NO_RELEVANT_ANSWER.to_string();
                    self.progress.step(FlowStep::Fail, &state);
                    return Ok(report(state, FlowOutcome::GaveUp, score));
                }
            }
        }
    }

    async fn retrieve(&self, state: &QueryState, deadline: Instant) -> Vec<ChunkHit> {
        let call = self.retriever.retrieve(
            &state.query,
            state.retrieval_breadth,
            state.selection.as_slice(),
        );
        match self.bounded(deadline, call).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "retrieval failed; continuing without documents");
                Vec::new()
            }
        }
    }

    async fn generate(&self, state: &QueryState, deadline: Instant) -> String {
        let prompt = answer_prompt(&state.query, &state.context());
        let call = self.generator.generate(ModelTask::Answer, &prompt);
        match self.bounded(deadline, call).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                GENERATION_ERROR_ANSWER.to_string()
            }
        }
    }

    async fn evaluate(&self, state: &QueryState, deadline: Instant) -> RelevanceScore {
        if state.retrieved_documents.is_empty() {
            return RelevanceScore::MIN;
        }
        let prompt = judge_prompt(&state.query, &state.context(), &state.answer);
        let call = self.generator.generate(ModelTask::Judge, &prompt);
        match self.bounded(deadline, call).await {
            Ok(reply) => RelevanceScore::parse_reply(&reply),
            Err(e) => {
                warn!(error = %e, "judge failed; scoring as irrelevant");
                RelevanceScore::MIN
            }
        }
    }

    /// `None` keeps the current query.
    async fn rewrite(&self, state: &QueryState, deadline: Instant) -> Option<String> {
        let prompt = rewrite_prompt(&state.query, &state.context());
        let call = self.generator.generate(ModelTask::Rewrite, &prompt);
        match self.bounded(deadline, call).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                warn!(error = %e, "query rewrite failed; keeping the query");
                None
            }
        }
    }

    /// Runs `call` under `min(call_timeout, time left until deadline)`.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        call: impl Future<Output = Result<T, FlowError>>,
    ) -> Result<T, FlowError> {
        let left = deadline.saturating_duration_since(Instant::now());
        let limit = self.cfg.call_timeout.min(left);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(FlowError::Timeout(limit)),
        }
    }
}

fn report(state: QueryState, outcome: FlowOutcome, score: RelevanceScore) -> FlowReport {
    let sources = match outcome {
        FlowOutcome::Accepted => state
            .retrieved_documents
            .iter()
            .map(|h| SourceRef {
                file_name: h.chunk.file_name.clone(),
                ordinal: h.chunk.ordinal,
                score: h.score,
            })
            .collect(),
        FlowOutcome::GaveUp => Vec::new(),
    };
    FlowReport {
        retries: state.retry_count(),
        answer: state.answer,
        outcome,
        relevance_score: score,
        final_query: state.query,
        retrieval_breadth: state.retrieval_breadth,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FlowFuture;
    use rag_store::Chunk;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Scripted<T> = Mutex<VecDeque<Result<T, FlowError>>>;

    /// Replays queued results; an exhausted queue answers with no documents.
    #[derive(Default)]
    struct ScriptedRetriever {
        replies: Scripted<Vec<ChunkHit>>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedRetriever {
        fn push(&self, reply: Result<Vec<ChunkHit>, FlowError>) -> &Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChunkRetriever for ScriptedRetriever {
        fn retrieve<'a>(
            &'a self,
            query: &'a str,
            k: usize,
            _file_names: &'a [String],
        ) -> FlowFuture<'a, Vec<ChunkHit>> {
            self.calls.lock().unwrap().push((query.to_string(), k));
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
            Box::pin(async move { reply })
        }
    }

    /// Per-task queues; `hang` makes every call of that task never finish.
    #[derive(Default)]
    struct ScriptedGenerator {
        answers: Scripted<String>,
        judge: Scripted<String>,
        rewrites: Scripted<String>,
        hang: Option<ModelTask>,
        calls: Mutex<Vec<ModelTask>>,
    }

    impl ScriptedGenerator {
        fn queue(&self, task: ModelTask) -> &Scripted<String> {
            match task {
                ModelTask::Answer => &self.answers,
                ModelTask::Judge => &self.judge,
                ModelTask::Rewrite => &self.rewrites,
            }
        }

        fn push(&self, task: ModelTask, reply: Result<&str, FlowError>) -> &Self {
            self.queue(task)
                .lock()
                .unwrap()
                .push_back(reply.map(str::to_string));
            self
        }

        fn count(&self, task: ModelTask) -> usize {
            self.calls.lock().unwrap().iter().filter(|t| **t == task).count()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate<'a>(&'a self, task: ModelTask, _prompt: &'a str) -> FlowFuture<'a, String> {
            self.calls.lock().unwrap().push(task);
            if self.hang == Some(task) {
                return Box::pin(std::future::pending());
            }
            let reply = self
                .queue(task)
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("{} reply", task.as_str())));
            Box::pin(async move { reply })
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<FlowStep>>);

    impl Progress for RecordingProgress {
        fn step(&self, step: FlowStep, _state: &QueryState) {
            self.0.lock().unwrap().push(step);
        }
    }

    fn hits(texts: &[&str]) -> Vec<ChunkHit> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkHit {
                score: 0.9 - i as f32 * 0.1,
                chunk: Chunk::text("policies.pdf", Some(i as u32 + 1), *t),
            })
            .collect()
    }

    fn files() -> Vec<String> {
        vec!["policies.pdf".to_string()]
    }

    fn engine(
        retriever: Arc<ScriptedRetriever>,
        generator: Arc<ScriptedGenerator>,
    ) -> (CorrectiveRag, Arc<RecordingProgress>) {
        let progress = Arc::new(RecordingProgress::default());
        let rag = CorrectiveRag::new(retriever, generator, FlowConfig::default())
            .with_progress(progress.clone());
        (rag, progress)
    }

    #[tokio::test]
    async fn relevant_first_answer_is_accepted_in_one_cycle() {
        let retriever = Arc::new(ScriptedRetriever::default());
        retriever.push(Ok(hits(&["Refunds are issued within 30 days."])));
        let generator = Arc::new(ScriptedGenerator::default());
        generator
            .push(ModelTask::Answer, Ok("- Refunds within 30 days"))
            .push(ModelTask::Judge, Ok("8"));

        let (rag, progress) = engine(retriever.clone(), generator.clone());
        let report = rag
            .answer_question("What is the refund policy?", &files())
            .await
            .unwrap();

        assert_eq!(report.outcome, FlowOutcome::Accepted);
        assert_eq!(report.answer, "- Refunds within 30 days");
        assert_eq!(report.relevance_score.value(), 8);
        assert_eq!(report.retries, 0);
        assert_eq!(report.retrieval_breadth, 5);
        assert_eq!(report.sources.len(), 1);
        assert_eq!(retriever.calls(), vec![("What is the refund policy?".to_string(), 5)]);
        assert_eq!(
            *progress.0.lock().unwrap(),
            vec![FlowStep::Retrieve, FlowStep::Generate, FlowStep::Evaluate, FlowStep::Accept]
        );
    }

    #[tokio::test]
    async fn nothing_retrieved_walks_the_whole_ladder_without_judging() {
        let retriever = Arc::new(ScriptedRetriever::default());
        let generator = Arc::new(ScriptedGenerator::default());
        generator.push(ModelTask::Rewrite, Ok("  refund rules for returned goods \n"));

        let (rag, progress) = engine(retriever.clone(), generator.clone());
        let report = rag.answer_question("refunds?", &files()).await.unwrap();

        assert_eq!(report.outcome, FlowOutcome::GaveUp);
        assert_eq!(report.answer, NO_RELEVANT_ANSWER);
        assert_eq!(report.retries, 3);
        assert_eq!(report.relevance_score, RelevanceScore::MIN);
        assert!(report.sources.is_empty());
        assert_eq!(generator.count(ModelTask::Judge), 0);
        assert_eq!(generator.count(ModelTask::Answer), 3);

        // Rewrite changes the query only; expand widens only.
        assert_eq!(
            retriever.calls(),
            vec![
                ("refunds?".to_string(), 5),
                ("refund rules for returned goods".to_string(), 5),
                ("refund rules for returned goods".to_string(), 10),
            ]
        );
        let steps = progress.0.lock().unwrap().clone();
        let ladder: Vec<FlowStep> = steps
            .into_iter()
            .filter(|s| {
                matches!(
                    s,
                    FlowStep::RewriteQuery | FlowStep::ExpandRetrieval | FlowStep::Fail
                )
            })
            .collect();
        assert_eq!(
            ladder,
            vec![FlowStep::RewriteQuery, FlowStep::ExpandRetrieval, FlowStep::Fail]
        );
    }

    #[tokio::test]
    async fn retrieval_failure_then_success_after_rewrite() {
        let retriever = Arc::new(ScriptedRetriever::default());
        retriever
            .push(Err(FlowError::Retrieval("store unreachable".into())))
            .push(Ok(hits(&["Refunds are issued within 30 days."])));
        let generator = Arc::new(ScriptedGenerator::default());
        generator
            .push(ModelTask::Rewrite, Ok("refund policy duration"))
            .push(ModelTask::Judge, Ok("8"));

        let (rag, _) = engine(retriever.clone(), generator.clone());
        let report = rag.answer_question("refund?", &files()).await.unwrap();

        assert_eq!(report.outcome, FlowOutcome::Accepted);
        assert_eq!(report.retries, 1);
        assert_eq!(report.final_query, "refund policy duration");
        assert_eq!(generator.count(ModelTask::Judge), 1);
        assert_eq!(retriever.calls().len(), 2);
    }

    #[tokio::test]
    async fn low_scores_force_failure_on_third_round() {
        let retriever = Arc::new(ScriptedRetriever::default());
        for _ in 0..3 {
            retriever.push(Ok(hits(&["Office plants need water."])));
        }
        let generator = Arc::new(ScriptedGenerator::default());
        generator
            .push(ModelTask::Judge, Ok("5"))
            .push(ModelTask::Judge, Ok("not sure"))
            .push(ModelTask::Judge, Err(FlowError::Generation("quota".into())));

        let (rag, _) = engine(retriever.clone(), generator.clone());
        let report = rag.answer_question("refund?", &files()).await.unwrap();

        assert_eq!(report.outcome, FlowOutcome::GaveUp);
        assert_eq!(report.answer, NO_RELEVANT_ANSWER);
        assert_eq!(report.retries, 3);
        assert_eq!(generator.count(ModelTask::Judge), 3);
    }

    #[tokio::test]
    async fn accepted_answer_is_left_untouched_even_if_generation_failed() {
        let retriever = Arc::new(ScriptedRetriever::default());
        retriever.push(Ok(hits(&["text"])));
        let generator = Arc::new(ScriptedGenerator::default());
        generator
            .push(ModelTask::Answer, Err(FlowError::Generation("boom".into())))
            .push(ModelTask::Judge, Ok("12"));

        let (rag, _) = engine(retriever, generator);
        let report = rag.answer_question("q", &files()).await.unwrap();
        assert_eq!(report.answer, GENERATION_ERROR_ANSWER);
        assert_eq!(report.relevance_score, RelevanceScore::MAX);
    }

    #[tokio::test]
    async fn blank_or_failed_rewrite_keeps_query() {
        let retriever = Arc::new(ScriptedRetriever::default());
        let generator = Arc::new(ScriptedGenerator::default());
        generator.push(ModelTask::Rewrite, Ok("   "));

        let (rag, _) = engine(retriever.clone(), generator.clone());
        let report = rag.answer_question("original", &files()).await.unwrap();
        assert_eq!(report.final_query, "original");
        assert_eq!(generator.count(ModelTask::Rewrite), 1);
        assert!(retriever.calls().iter().all(|(q, _)| q == "original"));

        let retriever = Arc::new(ScriptedRetriever::default());
        let generator = Arc::new(ScriptedGenerator::default());
        generator.push(
            ModelTask::Rewrite,
            Err(FlowError::Generation("model unavailable".into())),
        );

        let (rag, _) = engine(retriever.clone(), generator.clone());
        let report = rag.answer_question("original", &files()).await.unwrap();
        assert_eq!(report.outcome, FlowOutcome::GaveUp);
        assert_eq!(report.final_query, "original");
        assert_eq!(generator.count(ModelTask::Rewrite), 1);
        assert_eq!(retriever.calls().len(), 3);
        assert!(retriever.calls().iter().all(|(q, _)| q == "original"));
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected() {
        let (rag, _) = engine(
            Arc::new(ScriptedRetriever::default()),
            Arc::new(ScriptedGenerator::default()),
        );
        assert!(matches!(
            rag.answer_question("q", &[]).await,
            Err(FlowError::NoFilesSelected)
        ));
        assert!(matches!(
            rag.answer_question("  ", &files()).await,
            Err(FlowError::EmptyQuery)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_judge_times_out_within_deadline() {
        let retriever = Arc::new(ScriptedRetriever::default());
        for _ in 0..3 {
            retriever.push(Ok(hits(&["Refunds are issued within 30 days."])));
        }
        let generator = Arc::new(ScriptedGenerator {
            hang: Some(ModelTask::Judge),
            ..Default::default()
        });
        let cfg = FlowConfig {
            call_timeout: Duration::from_secs(60),
            deadline: Duration::from_secs(100),
            ..FlowConfig::default()
        };
        let rag = CorrectiveRag::new(retriever, generator.clone(), cfg);

        let started = Instant::now();
        let report = rag.answer_question("refund?", &files()).await.unwrap();

        assert_eq!(report.outcome, FlowOutcome::GaveUp);
        assert_eq!(generator.count(ModelTask::Judge), 3);
        assert!(started.elapsed() <= Duration::from_secs(100));
    }

    #[test]
    fn report_serializes_outcome_in_snake_case() {
        let report = FlowReport {
            answer: "a".into(),
            outcome: FlowOutcome::GaveUp,
            retries: 3,
            relevance_score: RelevanceScore::MIN,
            final_query: "q".into(),
            retrieval_breadth: 10,
            sources: Vec::new(),
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["outcome"], "gave_up");
        assert_eq!(v["relevance_score"], 1);
    }
}

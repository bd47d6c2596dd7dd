//! Flow state: the file selection, the per-question state and the retry ladder.

use rag_store::ChunkHit;
use serde::Serialize;

use crate::error::FlowError;

/// Low-score rounds a question may go through before the flow gives up.
pub const MAX_RETRIES: u8 = 3;

/// Correction applied after the n-th low score, indexed by `n - 1`.
pub const RETRY_LADDER: [Correction; MAX_RETRIES as usize] = [
    Correction::RewriteQuery,
    Correction::ExpandRetrieval,
    Correction::GiveUp,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Reformulate the query from what was retrieved so far.
    RewriteQuery,
    /// Widen retrieval by the configured step.
    ExpandRetrieval,
    /// Stop with the fixed failure message.
    GiveUp,
}

/// Non-empty, duplicate-free list of file names, in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileSelection(Vec<String>);

impl FileSelection {
    /// # Errors
    /// [`FlowError::NoFilesSelected`] when `names` is empty.
    pub fn new<I, S>(names: I) -> Result<Self, FlowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        if out.is_empty() {
            return Err(FlowError::NoFilesSelected);
        }
        Ok(Self(out))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Judge verdict, always within `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RelevanceScore(u8);

impl RelevanceScore {
    pub const MIN: RelevanceScore = RelevanceScore(1);
    pub const MAX: RelevanceScore = RelevanceScore(10);

    /// Clamps any integer into `1..=10`.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(1, 10) as u8)
    }

    /// Parses a judge reply: trimmed integer, clamped; anything else is the minimum.
    pub fn parse_reply(reply: &str) -> Self {
        reply
            .trim()
            .parse::<i64>()
            .map(Self::clamped)
            .unwrap_or(Self::MIN)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Scores above 5 accept the answer.
    pub fn accepts(self) -> bool {
        self.0 > 5
    }
}

/// Everything one question carries through the flow.
#[derive(Debug, Clone)]
pub struct QueryState {
    /// Current query text; the rewrite step may replace it.
    pub query: String,
    pub selection: FileSelection,
    pub retrieved_documents: Vec<ChunkHit>,
    pub answer: String,
    pub relevance_score: Option<RelevanceScore>,
    pub retrieval_breadth: usize,
    retry_count: u8,
}

impl QueryState {
    pub fn new(query: impl Into<String>, selection: FileSelection, breadth: usize) -> Self {
        Self {
            query: query.into(),
            selection,
            retrieved_documents: Vec::new(),
            answer: String::new(),
            relevance_score: None,
            retrieval_breadth: breadth,
            retry_count: 0,
        }
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Records one more low score and returns the correction it calls for.
    ///
    /// The count saturates at [`MAX_RETRIES`], so every call past the third
    /// keeps answering [`Correction::GiveUp`].
    pub fn count_retry(&mut self) -> Correction {
        self.retry_count = (self.retry_count + 1).min(MAX_RETRIES);
        RETRY_LADDER[usize::from(self.retry_count) - 1]
    }

    /// Retrieved chunk texts in retrieval order, separated by blank lines.
    pub fn context(&self) -> String {
        self.retrieved_documents
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::Chunk;

    fn selection() -> FileSelection {
        FileSelection::new(["a.pdf"]).unwrap()
    }

    #[test]
    fn selection_dedups_in_order_and_rejects_empty() {
        let s = FileSelection::new(["b.pdf", "a.pdf", "b.pdf"]).unwrap();
        assert_eq!(s.as_slice(), ["b.pdf".to_string(), "a.pdf".to_string()]);
        assert!(matches!(
            FileSelection::new(Vec::<String>::new()),
            Err(FlowError::NoFilesSelected)
        ));
    }

    #[test]
    fn ladder_order_and_saturation() {
        let mut st = QueryState::new("q", selection(), 5);
        assert_eq!(st.retry_count(), 0);
        assert_eq!(st.count_retry(), Correction::RewriteQuery);
        assert_eq!(st.count_retry(), Correction::ExpandRetrieval);
        assert_eq!(st.count_retry(), Correction::GiveUp);
        assert_eq!(st.count_retry(), Correction::GiveUp);
        assert_eq!(st.retry_count(), MAX_RETRIES);
    }

    #[test]
    fn judge_replies_are_parsed_and_clamped() {
        assert_eq!(RelevanceScore::parse_reply(" 8\n").value(), 8);
        assert_eq!(RelevanceScore::parse_reply("12").value(), 10);
        assert_eq!(RelevanceScore::parse_reply("0").value(), 1);
        assert_eq!(RelevanceScore::parse_reply("-4").value(), 1);
        assert_eq!(RelevanceScore::parse_reply("eight"), RelevanceScore::MIN);
        assert_eq!(RelevanceScore::parse_reply("7/10"), RelevanceScore::MIN);
        assert!(RelevanceScore::clamped(6).accepts());
        assert!(!RelevanceScore::clamped(5).accepts());
    }

    #[test]
    fn context_joins_with_blank_lines() {
        let mut st = QueryState::new("q", selection(), 5);
        st.retrieved_documents = ["first", "second"]
            .into_iter()
            .map(|t| ChunkHit {
                score: 0.5,
                chunk: Chunk::text("a.pdf", Some(1), t),
            })
            .collect();
        assert_eq!(st.context(), "first\n\nsecond");
    }
}

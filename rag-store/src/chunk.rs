//! Core data models: stored chunks and retrieval hits.

use serde::{Deserialize, Serialize};

/// Payload field holding the original file name; also the keyword-indexed filter key.
pub const FILE_NAME_FIELD: &str = "file_name";
pub(crate) const TEXT_FIELD: &str = "text";
pub(crate) const ORDINAL_FIELD: &str = "ordinal";
pub(crate) const KIND_FIELD: &str = "kind";

/// What a chunk was cut from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Text,
    /// Markdown rendering of a table detected on a page.
    Table,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkKind::Text => "text",
            ChunkKind::Table => "table",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        if s == "table" {
            ChunkKind::Table
        } else {
            ChunkKind::Text
        }
    }
}

/// A piece of document text tagged with the user-visible file name.
///
/// `ordinal` is the 1-based page or slide number the text came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub file_name: String,
    pub ordinal: Option<u32>,
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn text(file_name: impl Into<String>, ordinal: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file_name: file_name.into(),
            ordinal,
            kind: ChunkKind::Text,
        }
    }
}

/// A single retrieval hit, best first in result lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChunkHit {
    pub score: f32,
    pub chunk: Chunk,
}

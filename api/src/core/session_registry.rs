//! In-process bookkeeping of uploaded files and per-selection chat history.
//!
//! One registry lives in [`crate::core::app_state::AppState`]. Files are keyed
//! by their user-visible name; chats by the sorted set of file names they were
//! asked against. Removing a file drops its staged temp file and every chat
//! that involved it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::TempPath;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Ingesting,
    Ready,
}

/// Registry entry of one uploaded file.
#[derive(Debug)]
pub struct FileEntry {
    pub status: FileStatus,
    pub chunks: usize,
    pub uploaded_at: DateTime<Utc>,
    /// Staged upload; deleted from disk when the entry is dropped.
    temp_path: TempPath,
}

/// Public view of a [`FileEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub status: FileStatus,
    pub chunks: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Order-insensitive identity of a file selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChatKey(Vec<String>);

impl ChatKey {
    pub fn new<S: AsRef<str>>(file_names: &[S]) -> Self {
        let set: BTreeSet<String> = file_names.iter().map(|s| s.as_ref().to_string()).collect();
        Self(set.into_iter().collect())
    }

    pub fn file_names(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.0.iter().any(|f| f == file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Returned when a file name is already registered.
#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyRegistered(pub String);

#[derive(Default)]
struct Registry {
    files: BTreeMap<String, FileEntry>,
    chats: HashMap<ChatKey, Vec<ChatMessage>>,
}

#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Registry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file_name` as ingesting and takes ownership of its staged upload.
    ///
    /// Fails without touching the registry when the name is taken; the
    /// rejected `temp_path` is dropped (and deleted) by the caller.
    pub async fn begin_ingest(
        &self,
        file_name: &str,
        temp_path: TempPath,
    ) -> Result<(), (AlreadyRegistered, TempPath)> {
        let mut reg = self.inner.write().await;
        if reg.files.contains_key(file_name) {
            return Err((AlreadyRegistered(file_name.to_string()), temp_path));
        }
        reg.files.insert(
            file_name.to_string(),
            FileEntry {
                status: FileStatus::Ingesting,
                chunks: 0,
                uploaded_at: Utc::now(),
                temp_path,
            },
        );
        Ok(())
    }

    pub async fn mark_ready(&self, file_name: &str, chunks: usize) {
        if let Some(entry) = self.inner.write().await.files.get_mut(file_name) {
            entry.status = FileStatus::Ready;
            entry.chunks = chunks;
        }
    }

    /// Drops the file entry and every chat whose selection includes it.
    pub async fn remove_file(&self, file_name: &str) -> Option<FileEntry> {
        let mut reg = self.inner.write().await;
        let entry = reg.files.remove(file_name);
        reg.chats.retain(|key, _| !key.contains(file_name));
        entry
    }

    pub async fn status(&self, file_name: &str) -> Option<FileStatus> {
        self.inner.read().await.files.get(file_name).map(|e| e.status)
    }

    /// Every registered file name, ingesting ones included.
    pub async fn active_file_names(&self) -> BTreeSet<String> {
        self.inner.read().await.files.keys().cloned().collect()
    }

    pub async fn files(&self) -> Vec<FileSummary> {
        self.inner
            .read()
            .await
            .files
            .iter()
            .map(|(name, e)| FileSummary {
                file_name: name.clone(),
                status: e.status,
                chunks: e.chunks,
                uploaded_at: e.uploaded_at,
            })
            .collect()
    }

    /// Appends a question and its answer to the chat of `key`, creating it on first use.
    pub async fn append_exchange(&self, key: ChatKey, question: &str, answer: &str) {
        let now = Utc::now();
        let mut reg = self.inner.write().await;
        let chat = reg.chats.entry(key).or_default();
        chat.push(ChatMessage {
            role: ChatRole::User,
            content: question.to_string(),
            at: now,
        });
        chat.push(ChatMessage {
            role: ChatRole::Assistant,
            content: answer.to_string(),
            at: now,
        });
    }

    /// Chat of `key`; empty when nothing was asked yet.
    pub async fn history(&self, key: &ChatKey) -> Vec<ChatMessage> {
        self.inner
            .read()
            .await
            .chats
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

impl FileEntry {
    pub fn temp_path(&self) -> &std::path::Path {
        &self.temp_path
    }
}

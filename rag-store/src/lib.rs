//! Chunk storage and retrieval over Qdrant.
//!
//! This crate provides a clean API to:
//! - Store document chunks tagged with their original file name
//! - Retrieve top-K chunks for a textual query, restricted to a set of files
//! - Delete and enumerate stored files
//!
//! Everything goes through the object-safe [`ChunkStore`] trait; [`RagStore`]
//! is the Qdrant implementation and, behind the `memory` feature,
//! [`memory::InMemoryStore`] is an in-process one.

mod chunk;
mod config;
mod embed;
mod embed_pool;
mod errors;
mod filters;
mod ids;
mod qdrant_facade;
mod store;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use chunk::{Chunk, ChunkHit, ChunkKind, FILE_NAME_FIELD};
pub use config::{DistanceKind, RagConfig};
pub use embed::profiles::ProfilesEmbedder;
pub use embed::{EmbedFuture, EmbeddingsProvider};
pub use errors::RagError;
pub use ids::stable_uuid;
pub use store::{ChunkStore, RagStore, StoreFuture};

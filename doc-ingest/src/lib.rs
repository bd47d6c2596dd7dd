//! Turns uploaded PDF and PPTX files into chunks in a [`rag_store::ChunkStore`].
//!
//! Pipeline: detect format from the user-visible file name, extract per-page
//! (or per-slide) text plus PDF tables, split recursively, store. A failed
//! ingestion removes whatever it had already written.

mod errors;
mod ingestor;
mod loader;
mod splitter;
mod tables;

pub use errors::IngestError;
pub use ingestor::{IngestReport, Ingestor, splitter_from};
pub use loader::{DocumentFormat, LoadedSection, load_file};
pub use splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RecursiveSplitter};
pub use tables::{Table, detect_tables};

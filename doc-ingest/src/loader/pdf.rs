use std::path::Path;

use rag_store::ChunkKind;
use tracing::{debug, warn};

use super::LoadedSection;
use crate::errors::IngestError;
use crate::tables::detect_tables;

/// Page text via `lopdf`, falling back to whole-document `pdf-extract`
/// when per-page extraction fails or yields nothing. Detected tables are
/// appended as [`ChunkKind::Table`] sections carrying their page number.
pub fn load_pdf(path: &Path) -> Result<Vec<LoadedSection>, IngestError> {
    let mut sections = match per_page_text(path) {
        Ok(pages) if pages.iter().any(|p| !p.text.trim().is_empty()) => pages,
        Ok(_) => {
            debug!(path = %path.display(), "per-page extraction empty; using whole-document fallback");
            whole_document_text(path)?
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "per-page extraction failed; using whole-document fallback");
            whole_document_text(path)?
        }
    };

    let tables: Vec<LoadedSection> = sections
        .iter()
        .flat_map(|page| {
            detect_tables(&page.text)
                .into_iter()
                .map(move |t| LoadedSection {
                    text: t.to_markdown(),
                    ordinal: page.ordinal,
                    kind: ChunkKind::Table,
                })
        })
        .collect();
    debug!(pages = sections.len(), tables = tables.len(), "pdf loaded");
    sections.extend(tables);
    Ok(sections)
}

fn per_page_text(path: &Path) -> Result<Vec<LoadedSection>, IngestError> {
    let doc = lopdf::Document::load(path).map_err(|e| IngestError::Pdf(e.to_string()))?;
    let mut out = Vec::new();
    for page in doc.get_pages().keys().copied() {
        let text = doc
            .extract_text(&[page])
            .map_err(|e| IngestError::Pdf(format!("page {page}: {e}")))?;
        out.push(LoadedSection {
            text,
            ordinal: Some(page),
            kind: ChunkKind::Text,
        });
    }
    Ok(out)
}

/// `pdf-extract` separates pages with form feeds.
fn whole_document_text(path: &Path) -> Result<Vec<LoadedSection>, IngestError> {
    let text = pdf_extract::extract_text(path).map_err(|e| IngestError::Pdf(e.to_string()))?;
    Ok(split_form_feeds(&text))
}

fn split_form_feeds(text: &str) -> Vec<LoadedSection> {
    text.split('\u{c}')
        .enumerate()
        .map(|(i, page)| LoadedSection {
            text: page.to_string(),
            ordinal: u32::try_from(i + 1).ok(),
            kind: ChunkKind::Text,
        })
        .collect()
}

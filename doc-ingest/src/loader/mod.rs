//! File loaders: one [`LoadedSection`] per page (PDF) or slide (PPTX), plus
//! table pseudo-sections for PDFs.

use std::path::Path;

use rag_store::ChunkKind;

use crate::errors::IngestError;

mod pdf;
mod pptx;

pub use pdf::load_pdf;
pub use pptx::load_pptx;

#[cfg(test)]
pub(crate) use pptx::fixtures as pptx_fixtures;

/// Text of one page or slide before splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSection {
    pub text: String,
    /// 1-based page or slide number.
    pub ordinal: Option<u32>,
    pub kind: ChunkKind,
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Pptx,
}

impl DocumentFormat {
    /// Detects the format from a file name or path, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("pptx") => Ok(DocumentFormat::Pptx),
            _ => Err(IngestError::UnsupportedExtension(ext)),
        }
    }
}

/// Loads `path` with the loader matching `format`.
///
/// Blocking: call from `spawn_blocking` inside async code.
///
/// # Errors
/// Parse failures, or [`IngestError::NoExtractableText`] when every section is blank.
pub fn load_file(path: &Path, format: DocumentFormat) -> Result<Vec<LoadedSection>, IngestError> {
    let sections = match format {
        DocumentFormat::Pdf => load_pdf(path)?,
        DocumentFormat::Pptx => load_pptx(path)?,
    };
    let sections: Vec<LoadedSection> = sections
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    if sections.is_empty() {
        return Err(IngestError::NoExtractableText(path.display().to_string()));
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("Deck.PPTX")).unwrap(),
            DocumentFormat::Pptx
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("/tmp/a.b.pdf")).unwrap(),
            DocumentFormat::Pdf
        );
        assert!(matches!(
            DocumentFormat::from_path(Path::new("notes.docx")),
            Err(IngestError::UnsupportedExtension(Some(ext))) if ext == "docx"
        ));
        assert!(matches!(
            DocumentFormat::from_path(Path::new("README")),
            Err(IngestError::UnsupportedExtension(None))
        ));
    }
}

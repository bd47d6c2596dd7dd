use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use rag_store::ChunkKind;
use tracing::debug;

use super::LoadedSection;
use crate::errors::IngestError;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// One section per slide, in slide-number order.
pub fn load_pptx(path: &Path) -> Result<Vec<LoadedSection>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| IngestError::Pptx(e.to_string()))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_unstable_by_key(|(n, _)| *n);

    let mut out = Vec::with_capacity(slides.len());
    for (number, name) in slides {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| IngestError::Pptx(format!("{name}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| IngestError::Pptx(format!("{name}: {e}")))?;
        out.push(LoadedSection {
            text: slide_text(&xml)?,
            ordinal: Some(number),
            kind: ChunkKind::Text,
        });
    }
    debug!(slides = out.len(), "pptx loaded");
    Ok(out)
}

/// `ppt/slides/slide12.xml` → 12.
fn slide_number(entry: &str) -> Option<u32> {
    entry
        .strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collects `<a:t>` runs; paragraphs (`<a:p>`) and line breaks become newlines.
fn slide_text(xml: &str) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| IngestError::Pptx(e.to_string()))?;
                line.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => push_line(&mut lines, &mut line),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"br" => {
                push_line(&mut lines, &mut line)
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Pptx(e.to_string())),
            _ => {}
        }
    }
    push_line(&mut lines, &mut line);
    Ok(lines.join("\n"))
}

fn push_line(lines: &mut Vec<String>, line: &mut String) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_pptx;
    use super::*;

    #[test]
    fn numeric_slide_order() {
        assert_eq!(slide_number("ppt/slides/slide10.xml"), Some(10));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn paragraphs_and_breaks_become_lines() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Hello </a:t></a:r><a:r><a:t>world</a:t></a:r><a:br/><a:r><a:t>again &amp; more</a:t></a:r></a:p><a:p><a:r><a:t>Second</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(slide_text(xml).unwrap(), "Hello world\nagain & more\nSecond");
    }

    #[test]
    fn loads_slides_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        const TENTH: &[&str] = &["Tenth slide"];
        const FILLER: &[&str] = &["Filler"];
        let slides: Vec<&[&str]> = (1..=11)
            .map(|i| if i == 10 { TENTH } else { FILLER })
            .collect();
        write_pptx(&path, &slides);

        let sections = load_pptx(&path).unwrap();
        assert_eq!(sections.len(), 11);
        assert_eq!(sections[9].ordinal, Some(10));
        assert_eq!(sections[9].text, "Tenth slide");
    }
}

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use zip::ZipArchive;

use super::ExtractionError;

/// Main body part of a WordprocessingML package.
const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the decompressed size of the document part.
const MAX_DOCUMENT_PART_BYTES: u64 = 64 * 1024 * 1024;

const WORDPROCESSING_NS: &[u8] = b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const WORDPROCESSING_STRICT_NS: &[u8] = b"http://purl.oclc.org/ooxml/wordprocessingml/main";
const MARKUP_COMPATIBILITY_NS: &[u8] =
    b"http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Extracts every paragraph of the DOCX at `path`, joined with newlines.
pub fn extract(path: &Path) -> Result<String, ExtractionError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| ExtractionError::Docx(format!("not a valid .docx container: {e}")))?;

    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {e}")))?;
    let xml = read_document_part(part, MAX_DOCUMENT_PART_BYTES)?;

    Ok(paragraphs_from_xml(&xml)?.join("\n"))
}

/// Reads the decompressed document part, refusing anything larger than `limit` bytes.
fn read_document_part(part: impl Read, limit: u64) -> Result<String, ExtractionError> {
    let mut xml = String::new();
    part.take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART}: {e}")))?;
    if xml.len() as u64 > limit {
        return Err(ExtractionError::Docx(format!(
            "{DOCUMENT_PART} expands past {limit} bytes"
        )));
    }
    Ok(xml)
}

/// Elements the walker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Paragraph,
    Text,
    Tab,
    Break,
    Fallback,
}

fn classify(ns: &ResolveResult<'_>, local_name: &[u8]) -> Option<Tag> {
    let ResolveResult::Bound(Namespace(ns)) = ns else {
        return None;
    };
    if *ns == WORDPROCESSING_NS || *ns == WORDPROCESSING_STRICT_NS {
        match local_name {
            b"p" => Some(Tag::Paragraph),
            b"t" => Some(Tag::Text),
            b"tab" => Some(Tag::Tab),
            b"br" | b"cr" => Some(Tag::Break),
            _ => None,
        }
    } else if *ns == MARKUP_COMPATIBILITY_NS && local_name == b"Fallback" {
        Some(Tag::Fallback)
    } else {
        None
    }
}

/// Walks `document.xml` and returns the text of each `w:p` in document order.
///
/// Elements are matched by namespace, so any prefix bound to WordprocessingML works.
/// Only `w:t` runs contribute text; `w:tab` becomes `\t` and `w:br`/`w:cr` become `\n`.
/// Paragraphs inside tables are included. Empty paragraphs are kept as empty strings.
/// Content under `mc:Fallback` is skipped because `mc:Choice` already carries it.
pub fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = NsReader::from_str(xml);
    let mut paragraphs = Vec::new();
    // Text boxes nest paragraphs inside runs, so open paragraphs form a stack.
    let mut open: Vec<String> = Vec::new();
    let mut in_text_run = false;
    let mut fallback_depth = 0usize;

    loop {
        let position = reader.buffer_position();
        let (ns, event) = reader.read_resolved_event().map_err(|e| {
            ExtractionError::Docx(format!("malformed {DOCUMENT_PART} near byte {position}: {e}"))
        })?;

        match event {
            Event::Start(e) => match classify(&ns, e.local_name().as_ref()) {
                Some(Tag::Fallback) => fallback_depth += 1,
                _ if fallback_depth > 0 => {}
                Some(Tag::Paragraph) => open.push(String::new()),
                Some(Tag::Text) => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) if fallback_depth == 0 => {
                match classify(&ns, e.local_name().as_ref()) {
                    Some(Tag::Paragraph) => paragraphs.push(String::new()),
                    Some(Tag::Tab) => push_char(&mut open, '\t'),
                    Some(Tag::Break) => push_char(&mut open, '\n'),
                    _ => {}
                }
            }
            Event::Text(t) if in_text_run && fallback_depth == 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(format!("bad text run: {e}")))?;
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(&text);
                }
            }
            Event::End(e) => match classify(&ns, e.local_name().as_ref()) {
                Some(Tag::Fallback) => fallback_depth = fallback_depth.saturating_sub(1),
                _ if fallback_depth > 0 => {}
                Some(Tag::Paragraph) => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                Some(Tag::Text) => in_text_run = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(open: &mut [String], c: char) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.push(c);
    }
}

//! Text extraction for word-processor uploads.
//!
//! Regulatory documents are usually published as `.docx`. Extraction reads
//! `word/document.xml` from the OOXML package and emits one line per
//! paragraph, so the normalizers see the same line structure an author saw.
//! Everything else (`.txt`, `.md`) is read as UTF-8 text.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use tender_harness_core::{Error, Result};

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Read a raw source file as text, extracting `.docx` packages.
pub fn read_source(path: &Path) -> Result<String> {
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false);

    if is_docx {
        let bytes = std::fs::read(path)?;
        extract_docx(&bytes).map_err(|message| Error::extraction(path.display().to_string(), message))
    } else {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Extract paragraph text from a `.docx` package.
///
/// Paragraphs (`w:p`) end with a newline; `w:tab` becomes a tab and `w:br`
/// a newline. Runs inside a paragraph are concatenated verbatim.
pub fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| "word/document.xml not found".to_string())?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| e.to_string())?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("word/document.xml exceeds size limit".to_string());
    }

    paragraphs_from_xml(&xml)
}

fn paragraphs_from_xml(xml: &[u8]) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                out.push_str(&text);
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

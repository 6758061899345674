//! Document text extraction.
//!
//! PDF, plain text and DOCX attachments are converted to text. Anything else
//! is summarized by name, type and size. Every failure is reported as text.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::message::{DocumentRef, FileFetcher};

/// Largest attachment that will be downloaded.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const MAX_PDF_PAGES: usize = 10;
const MAX_PDF_CHARS: usize = 5000;
const MAX_TEXT_CHARS: usize = 10_000;
const MAX_DOCX_PARAGRAPHS: usize = 100;
const MAX_DOCX_CHARS: usize = 5000;
const TRUNCATED: &str = "... [Truncated]";

const WORD_MIME_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// How an attachment will be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Word,
    Other,
}

impl DocumentKind {
    /// Classify by MIME type, then by file extension.
    pub fn detect(file_name: &str, mime_type: &str) -> Self {
        let name = file_name.to_ascii_lowercase();
        if mime_type == "application/pdf" || name.ends_with(".pdf") {
            Self::Pdf
        } else if mime_type.starts_with("text/")
            || [".txt", ".md", ".csv"].iter().any(|ext| name.ends_with(ext))
        {
            Self::Text
        } else if WORD_MIME_TYPES.contains(&mime_type) || name.ends_with(".doc") || name.ends_with(".docx") {
            Self::Word
        } else {
            Self::Other
        }
    }
}

/// Extracts text from document attachments.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    max_file_size: u64,
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl FileProcessor {
    /// Download and extract a document.
    pub async fn extract_document(&self, document: &DocumentRef, fetcher: &dyn FileFetcher) -> String {
        if document.file_size.map(|s| s > self.max_file_size).unwrap_or(false) {
            warn!(file = %document.file_name, size = ?document.file_size, "File too large");
            return format!("File too large to process: {}", document.file_name);
        }

        let bytes = match fetcher.download(&document.file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %document.file_name, error = %e, "Document download failed");
                return format!("Error processing file {}: {}", document.file_name, e);
            }
        };

        let mime = document.mime_type.clone().unwrap_or_default();
        let name = document.file_name.clone();
        // pdf-extract may panic on malformed input; keep it off the runtime threads
        match tokio::task::spawn_blocking(move || extract_bytes(&name, &mime, &bytes)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %document.file_name, error = %e, "Document extraction aborted");
                format!("Error processing file {}: extraction aborted", document.file_name)
            }
        }
    }
}

/// Extract text from downloaded bytes.
pub fn extract_bytes(file_name: &str, mime_type: &str, bytes: &[u8]) -> String {
    match DocumentKind::detect(file_name, mime_type) {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Text => extract_text(bytes),
        DocumentKind::Word => extract_docx(bytes),
        DocumentKind::Other => {
            info!(mime = mime_type, "Unprocessed file type");
            format!("[File: {} - {} - {} bytes]", file_name, mime_type, bytes.len())
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> String {
    let pages = match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => pages,
        Err(e) => {
            warn!(error = %e, "PDF extraction error");
            return format!("PDF file: {} bytes (text extraction failed)", bytes.len());
        }
    };

    let text = pages
        .iter()
        .take(MAX_PDF_PAGES)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| format!("[Page {}]\n{}", i + 1, page.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.trim().is_empty() {
        return "No text extracted from PDF".to_string();
    }
    cap(&text, MAX_PDF_CHARS)
}

fn extract_text(bytes: &[u8]) -> String {
    cap(&String::from_utf8_lossy(bytes), MAX_TEXT_CHARS)
}

fn extract_docx(bytes: &[u8]) -> String {
    match docx_paragraphs(bytes) {
        Ok(paragraphs) => {
            let text = paragraphs
                .into_iter()
                .take(MAX_DOCX_PARAGRAPHS)
                .collect::<Vec<_>>()
                .join("\n\n");
            if text.trim().is_empty() {
                "No text extracted from Word document".to_string()
            } else {
                cap(&text, MAX_DOCX_CHARS)
            }
        }
        Err(e) => {
            warn!(error = %e, "Word extraction error");
            format!("Word document: {} bytes (text extraction failed)", bytes.len())
        }
    }
}

/// Non-empty paragraphs of a DOCX package, in document order.
pub fn docx_paragraphs(bytes: &[u8]) -> crate::error::Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| crate::error::ExtractError::Parse(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| crate::error::ExtractError::Parse(e.to_string()))?
        .read_to_string(&mut xml)?;

    Ok(xml
        .split("</w:p>")
        .map(paragraph_text)
        .filter(|p| !p.trim().is_empty())
        .collect())
}

fn paragraph_text(fragment: &str) -> String {
    static RUN_TEXT: OnceLock<Regex> = OnceLock::new();
    let pattern = RUN_TEXT.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("static run pattern")
    });
    let raw: String = pattern
        .captures_iter(fragment)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    unescape_xml(&raw)
}

/// Decode the predefined XML entities and numeric character references in one pass.
fn unescape_xml(text: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let pattern = ENTITY.get_or_init(|| {
        Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});").expect("static entity pattern")
    });
    pattern
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn cap(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATED),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(body: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            write!(
                zip,
                r#"<?xml version="1.0"?><w:document><w:body>{}</w:body></w:document>"#,
                body
            )
            .unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(DocumentKind::detect("a.PDF", ""), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("x", "application/pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("notes.md", ""), DocumentKind::Text);
        assert_eq!(DocumentKind::detect("x", "text/csv"), DocumentKind::Text);
        assert_eq!(DocumentKind::detect("report.docx", ""), DocumentKind::Word);
        assert_eq!(DocumentKind::detect("a.zip", "application/zip"), DocumentKind::Other);
    }

    #[test]
    fn test_text_is_capped() {
        let text = extract_bytes("big.txt", "text/plain", "a".repeat(10_005).as_bytes());
        assert!(text.ends_with("... [Truncated]"));
        assert_eq!(text.chars().count(), 10_000 + TRUNCATED.len());
    }

    #[test]
    fn test_other_file_description() {
        assert_eq!(
            extract_bytes("a.bin", "application/octet-stream", &[0; 12]),
            "[File: a.bin - application/octet-stream - 12 bytes]"
        );
    }

    #[test]
    fn test_docx_paragraphs() {
        let bytes = docx_with(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
               <w:p></w:p><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p>"#,
        );
        assert_eq!(docx_paragraphs(&bytes).unwrap(), vec!["Hello world", "A & B"]);
        assert_eq!(extract_bytes("r.docx", "", &bytes), "Hello world\n\nA & B");
    }

    #[test]
    fn test_broken_docx_reports_failure() {
        assert_eq!(
            extract_bytes("r.docx", "", b"not a zip"),
            "Word document: 9 bytes (text extraction failed)"
        );
    }

    #[test]
    fn test_numeric_references_are_decoded() {
        assert_eq!(unescape_xml("it&#8217;s &#x2019;quoted&#X2019;"), "it\u{2019}s \u{2019}quoted\u{2019}");
        assert_eq!(unescape_xml("&amp;lt; stays literal"), "&lt; stays literal");
        assert_eq!(unescape_xml("bad &#xD800; and &#1114112; kept"), "bad &#xD800; and &#1114112; kept");

        let bytes = docx_with("<w:p><w:r><w:t>Don&#8217;t &#x2014; stop</w:t></w:r></w:p>");
        assert_eq!(docx_paragraphs(&bytes).unwrap(), vec!["Don\u{2019}t \u{2014} stop"]);
    }
}

//! Message-level extraction.

use bookmark_core::FeaturesConfig;
use serde::Serialize;
use tracing::{info, warn};

use crate::file::FileProcessor;
use crate::message::{slice_utf16, FileFetcher, IncomingMessage, MessageEntity};
use crate::ocr::OcrProcessor;
use crate::url::{find_urls, UrlProcessor};

/// An attachment whose text was extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
}

/// A photo whose text was recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// An entity with its covered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityText {
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    pub text: String,
}

/// Counters describing what extraction found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionMetadata {
    pub chat_type: String,
    pub chat_id: i64,
    pub has_entities: bool,
    pub is_forwarded: bool,
    pub extracted_urls: usize,
    pub extracted_files: usize,
    pub extracted_images: usize,
}

/// Everything extracted from one message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedContent {
    /// Message text followed by appended link, document and OCR sections.
    pub text: String,
    pub urls: Vec<String>,
    pub files: Vec<FileInfo>,
    pub images: Vec<ImageInfo>,
    pub entities: Vec<EntityText>,
    pub metadata: ExtractionMetadata,
}

/// Turns an [`IncomingMessage`] into [`ExtractedContent`].
#[derive(Clone)]
pub struct ContentExtractionPipeline {
    urls: UrlProcessor,
    files: FileProcessor,
    ocr: OcrProcessor,
    fetch_content: bool,
}

impl ContentExtractionPipeline {
    /// Build from feature flags.
    ///
    /// `content_extraction` controls link and document fetching;
    /// `ocr_enabled` controls photo OCR.
    pub fn new(features: &FeaturesConfig) -> Self {
        Self::with_processors(
            UrlProcessor::new(),
            FileProcessor::default(),
            OcrProcessor::new(features.ocr_enabled),
            features.content_extraction,
        )
    }

    pub fn with_processors(urls: UrlProcessor, files: FileProcessor, ocr: OcrProcessor, fetch_content: bool) -> Self {
        Self {
            urls,
            files,
            ocr,
            fetch_content,
        }
    }

    /// Extract text, links, documents and OCR output from `message`.
    pub async fn process_message(&self, message: &IncomingMessage, fetcher: &dyn FileFetcher) -> ExtractedContent {
        let mut extracted = ExtractedContent {
            text: message.body().to_string(),
            ..Default::default()
        };

        if let Some(text) = &message.text {
            extracted.entities.extend(entity_texts(text, &message.entities));
        }
        if let Some(caption) = &message.caption {
            extracted.entities.extend(entity_texts(caption, &message.caption_entities));
        }

        let urls = collect_urls(message);
        if self.fetch_content {
            for url in &urls {
                let content = self.urls.extract(url).await;
                extracted.text.push_str(&format!("\n\n[From URL: {}]\n{}", url, content));
            }
        }
        extracted.urls = urls;

        if let Some(document) = &message.document {
            if self.fetch_content {
                let content = self.files.extract_document(document, fetcher).await;
                if !content.is_empty() {
                    extracted.files.push(FileInfo {
                        file_id: document.file_id.clone(),
                        file_name: document.file_name.clone(),
                        mime_type: document.mime_type.clone(),
                    });
                    extracted
                        .text
                        .push_str(&format!("\n\n[Document Content: {}]\n{}", document.file_name, content));
                }
            }
        }

        if let Some(photo) = message.largest_photo() {
            if let Some(ocr_text) = self.ocr.extract_from_photo(photo, fetcher).await {
                extracted.images.push(ImageInfo {
                    file_id: photo.file_id.clone(),
                    width: photo.width,
                    height: photo.height,
                });
                extracted.text.push_str(&format!("\n\n[OCR from Image]\n{}", ocr_text));
            }
        }

        if message.voice.is_some() || message.audio.is_some() {
            info!(message_id = message.message_id, "Voice/audio message received; transcription is not supported");
        }

        extracted.metadata = ExtractionMetadata {
            chat_type: message.chat.kind.clone(),
            chat_id: message.chat.id,
            has_entities: !message.entities.is_empty() || !message.caption_entities.is_empty(),
            is_forwarded: message.is_forwarded,
            extracted_urls: extracted.urls.len(),
            extracted_files: extracted.files.len(),
            extracted_images: extracted.images.len(),
        };

        extracted
    }
}

fn entity_texts(text: &str, entities: &[MessageEntity]) -> Vec<EntityText> {
    entities
        .iter()
        .filter_map(|e| match slice_utf16(text, e.offset, e.length) {
            Some(covered) => Some(EntityText {
                kind: e.kind.clone(),
                offset: e.offset,
                length: e.length,
                text: covered,
            }),
            None => {
                warn!(kind = %e.kind, offset = e.offset, length = e.length, "Entity outside message text");
                None
            }
        })
        .collect()
}

/// Links in a message: `url` entities, `text_link` targets, then plain-text
/// matches, deduplicated in first-seen order.
pub fn collect_urls(message: &IncomingMessage) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let mut push = |url: String| {
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    };

    let sources = [
        (message.text.as_deref(), &message.entities),
        (message.caption.as_deref(), &message.caption_entities),
    ];
    for (text, entities) in sources {
        let Some(text) = text else { continue };
        for entity in entities.iter() {
            match entity.kind.as_str() {
                "url" => {
                    if let Some(url) = slice_utf16(text, entity.offset, entity.length) {
                        push(url);
                    }
                }
                "text_link" => {
                    if let Some(url) = &entity.url {
                        push(url.clone());
                    }
                }
                _ => {}
            }
        }
    }

    for url in find_urls(message.body()) {
        push(url);
    }
    urls
}

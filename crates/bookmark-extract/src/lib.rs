//! Bookmark Extract - turns chat messages into text worth storing.
//!
//! The [`ContentExtractionPipeline`] combines message text with the content of
//! linked pages ([`UrlProcessor`]), attached documents ([`FileProcessor`]) and
//! photo OCR ([`OcrProcessor`]). It works on the transport-neutral
//! [`IncomingMessage`] and downloads attachments through a [`FileFetcher`].

pub mod error;
pub mod file;
pub mod message;
pub mod ocr;
pub mod pipeline;
pub mod url;

pub use error::{ExtractError, Result};
pub use file::{extract_bytes, FileProcessor, MAX_FILE_SIZE};
pub use message::{
    slice_utf16, ChatInfo, DocumentRef, FileFetcher, IncomingMessage, MediaRef, MessageEntity, PhotoRef,
};
pub use ocr::OcrProcessor;
pub use pipeline::{
    collect_urls, ContentExtractionPipeline, EntityText, ExtractedContent, ExtractionMetadata, FileInfo,
    ImageInfo,
};
pub use url::{find_urls, is_youtube_url, parse_html, UrlProcessor};

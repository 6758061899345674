//! Transport-neutral view of an incoming chat message.
//!
//! The bot converts each Telegram update into an [`IncomingMessage`] so the
//! extraction pipeline can be driven and tested without a live bot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// A formatting entity inside message text or caption.
///
/// `offset` and `length` are in UTF-16 code units, as Telegram sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEntity {
    /// Entity type as named by the Bot API (`url`, `text_link`, `mention`, ...).
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    /// Target of a `text_link` entity.
    pub url: Option<String>,
}

impl MessageEntity {
    pub fn new(kind: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            kind: kind.into(),
            offset,
            length,
            url: None,
        }
    }

    pub fn text_link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            kind: "text_link".to_string(),
            offset,
            length,
            url: Some(url.into()),
        }
    }
}

/// An attached document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// One size variant of an attached photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

/// Audio, video or voice attachment details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaRef {
    pub file_name: Option<String>,
    pub duration_secs: u32,
}

/// The chat a message arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    pub kind: String,
    pub title: Option<String>,
}

/// A chat message with everything extraction needs.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: i32,
    pub chat: ChatInfo,
    pub user_id: Option<u64>,
    pub username: Option<String>,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub entities: Vec<MessageEntity>,
    pub caption_entities: Vec<MessageEntity>,
    pub document: Option<DocumentRef>,
    /// Photo sizes, smallest first.
    pub photos: Vec<PhotoRef>,
    pub audio: Option<MediaRef>,
    pub video: Option<MediaRef>,
    pub voice: Option<MediaRef>,
    pub is_forwarded: bool,
}

impl IncomingMessage {
    /// A plain text message, mostly for tests.
    pub fn text(message_id: i32, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            message_id,
            chat: ChatInfo {
                id: chat_id,
                kind: "private".to_string(),
                title: None,
            },
            user_id: None,
            username: None,
            date: Utc::now(),
            text: Some(text.into()),
            caption: None,
            entities: Vec::new(),
            caption_entities: Vec::new(),
            document: None,
            photos: Vec::new(),
            audio: None,
            video: None,
            voice: None,
            is_forwarded: false,
        }
    }

    /// Message text, falling back to the media caption.
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }

    /// The largest photo size.
    pub fn largest_photo(&self) -> Option<&PhotoRef> {
        self.photos.last()
    }

    /// Whether the message carries any attachment.
    pub fn has_media(&self) -> bool {
        self.document.is_some()
            || !self.photos.is_empty()
            || self.audio.is_some()
            || self.video.is_some()
            || self.voice.is_some()
    }

    /// Human readable attachment type.
    pub fn media_type(&self) -> String {
        if let Some(doc) = &self.document {
            format!("Document ({})", doc.mime_type.as_deref().unwrap_or("unknown"))
        } else if !self.photos.is_empty() {
            "Photo".to_string()
        } else if self.audio.is_some() {
            "Audio".to_string()
        } else if self.video.is_some() {
            "Video".to_string()
        } else if self.voice.is_some() {
            "Voice Message".to_string()
        } else {
            "Unknown".to_string()
        }
    }

    /// One-line description of the attachment, used when no text was found.
    pub fn describe_media(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let size = |s: Option<u64>| s.map(|n| n.to_string()).unwrap_or_else(|| "unknown".into());

        if let Some(doc) = &self.document {
            parts.push(format!("Document: {}", doc.file_name));
            parts.push(format!("Size: {} bytes", size(doc.file_size)));
            parts.push(format!("Type: {}", doc.mime_type.as_deref().unwrap_or("unknown")));
        } else if let Some(photo) = self.largest_photo() {
            parts.push("Photo".to_string());
            parts.push(format!("Size: {} bytes", size(photo.file_size)));
            parts.push(format!("Dimensions: {}x{}", photo.width, photo.height));
        } else if let Some(audio) = &self.audio {
            parts.push(format!("Audio: {}", audio.file_name.as_deref().unwrap_or("unnamed")));
            parts.push(format!("Duration: {} seconds", audio.duration_secs));
        } else if let Some(video) = &self.video {
            parts.push("Video".to_string());
            parts.push(format!("Duration: {} seconds", video.duration_secs));
        } else if let Some(voice) = &self.voice {
            parts.push("Voice Message".to_string());
            parts.push(format!("Duration: {} seconds", voice.duration_secs));
        }

        if let Some(caption) = &self.caption {
            parts.push(format!("Caption: {}", caption));
        }
        parts.join(". ")
    }
}

/// Downloads attachment bytes by file id.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Slice `text` by UTF-16 offsets. Returns `None` when out of range.
pub fn slice_utf16(text: &str, offset: usize, length: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = offset.checked_add(length)?;
    if end > units.len() {
        return None;
    }
    Some(String::from_utf16_lossy(&units[offset..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_utf16_with_emoji() {
        let text = "👋 see https://example.com";
        // the emoji is two UTF-16 units
        assert_eq!(slice_utf16(text, 7, 19).as_deref(), Some("https://example.com"));
        assert_eq!(slice_utf16(text, 0, 2).as_deref(), Some("👋"));
        assert_eq!(slice_utf16(text, 20, 10), None);
    }

    #[test]
    fn test_body_prefers_text() {
        let mut msg = IncomingMessage::text(1, 2, "hello");
        assert_eq!(msg.body(), "hello");
        msg.text = None;
        msg.caption = Some("caption".into());
        assert_eq!(msg.body(), "caption");
        msg.caption = None;
        assert_eq!(msg.body(), "");
    }

    #[test]
    fn test_describe_document() {
        let mut msg = IncomingMessage::text(1, 2, "");
        msg.text = None;
        msg.caption = Some("notes".into());
        msg.document = Some(DocumentRef {
            file_id: "f".into(),
            file_name: "a.bin".into(),
            mime_type: Some("application/octet-stream".into()),
            file_size: Some(42),
        });
        assert!(msg.has_media());
        assert_eq!(msg.media_type(), "Document (application/octet-stream)");
        assert_eq!(
            msg.describe_media(),
            "Document: a.bin. Size: 42 bytes. Type: application/octet-stream. Caption: notes"
        );
    }

    #[test]
    fn test_describe_voice() {
        let mut msg = IncomingMessage::text(1, 2, "");
        msg.voice = Some(MediaRef {
            file_name: None,
            duration_secs: 7,
        });
        assert_eq!(msg.media_type(), "Voice Message");
        assert_eq!(msg.describe_media(), "Voice Message. Duration: 7 seconds");
    }
}

//! Conversion from teloxide messages to extraction input, and file downloads
//! through the Bot API.

use async_trait::async_trait;
use bookmark_extract::{
    ChatInfo, DocumentRef, ExtractError, FileFetcher, IncomingMessage, MediaRef, MessageEntity, PhotoRef,
};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Chat, MessageEntityKind};
use tracing::debug;

/// Build an [`IncomingMessage`] from a Telegram message.
pub fn incoming_message(msg: &Message) -> IncomingMessage {
    let from = msg.from.as_ref();

    IncomingMessage {
        message_id: msg.id.0,
        chat: chat_info(&msg.chat),
        user_id: from.map(|u| u.id.0),
        username: from.and_then(|u| u.username.clone()),
        date: msg.date,
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        entities: convert_entities(msg.entities()),
        caption_entities: convert_entities(msg.caption_entities()),
        document: msg.document().map(|doc| DocumentRef {
            file_id: doc.file.id.to_string(),
            file_name: doc.file_name.clone().unwrap_or_else(|| "document".to_string()),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            file_size: Some(u64::from(doc.file.size)),
        }),
        photos: msg
            .photo()
            .map(|sizes| {
                sizes
                    .iter()
                    .map(|p| PhotoRef {
                        file_id: p.file.id.to_string(),
                        width: p.width,
                        height: p.height,
                        file_size: Some(u64::from(p.file.size)),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        audio: msg.audio().map(|a| MediaRef {
            file_name: a.file_name.clone(),
            duration_secs: a.duration.seconds(),
        }),
        video: msg.video().map(|v| MediaRef {
            file_name: v.file_name.clone(),
            duration_secs: v.duration.seconds(),
        }),
        voice: msg.voice().map(|v| MediaRef {
            file_name: None,
            duration_secs: v.duration.seconds(),
        }),
        is_forwarded: msg.forward_origin().is_some(),
    }
}

fn chat_info(chat: &Chat) -> ChatInfo {
    let kind = if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else {
        "channel"
    };

    ChatInfo {
        id: chat.id.0,
        kind: kind.to_string(),
        title: chat.title().map(str::to_string),
    }
}

fn convert_entities(entities: Option<&[teloxide::types::MessageEntity]>) -> Vec<MessageEntity> {
    entities
        .unwrap_or_default()
        .iter()
        .map(|e| match &e.kind {
            MessageEntityKind::TextLink { url } => MessageEntity::text_link(e.offset, e.length, url.as_str()),
            kind => MessageEntity::new(entity_type(kind), e.offset, e.length),
        })
        .collect()
}

/// The Bot API name of an entity kind (`url`, `mention`, `bold`, ...).
fn entity_type(kind: &MessageEntityKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Downloads attachments with `getFile`.
#[derive(Clone)]
pub struct TelegramFetcher {
    bot: Bot,
}

impl TelegramFetcher {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl FileFetcher for TelegramFetcher {
    async fn download(&self, file_id: &str) -> bookmark_extract::Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(|e| ExtractError::Download(e.to_string()))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| ExtractError::Download(e.to_string()))?;

        debug!(file_id = %file_id, bytes = data.len(), "Downloaded file");
        Ok(data)
    }
}

//! Inline button actions on saved messages.
//!
//! Callback data is `delete:<message_id>`, `category:<message_id>:<name>` or
//! `tag:<message_id>:<tag>`. Actions are scoped to the user who pressed the
//! button, so one user cannot touch another user's entries.

use std::str::FromStr;
use std::sync::Arc;

use bookmark_ai::best_category;
use bookmark_storage::{RecordUpdate, Storage};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{info, warn};

use crate::error::TelegramError;
use crate::state::{BotState, SavedEntries};

/// A parsed inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Delete { message_id: i32 },
    Category { message_id: i32, category: String },
    Tag { message_id: i32, tag: String },
}

impl CallbackAction {
    pub fn message_id(&self) -> i32 {
        match self {
            Self::Delete { message_id }
            | Self::Category { message_id, .. }
            | Self::Tag { message_id, .. } => *message_id,
        }
    }

    /// Encode as callback data.
    pub fn data(&self) -> String {
        match self {
            Self::Delete { message_id } => format!("delete:{}", message_id),
            Self::Category { message_id, category } => format!("category:{}:{}", message_id, category),
            Self::Tag { message_id, tag } => format!("tag:{}:{}", message_id, tag),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = TelegramError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || TelegramError::InvalidCallback(data.to_string());
        let (action, rest) = data.split_once(':').ok_or_else(invalid)?;

        match action {
            "delete" => Ok(Self::Delete {
                message_id: rest.parse().map_err(|_| invalid())?,
            }),
            "category" | "tag" => {
                let (id, value) = rest.split_once(':').ok_or_else(invalid)?;
                let message_id = id.parse().map_err(|_| invalid())?;
                let value = value.trim();
                if value.is_empty() {
                    return Err(invalid());
                }
                Ok(if action == "category" {
                    Self::Category {
                        message_id,
                        category: value.to_string(),
                    }
                } else {
                    Self::Tag {
                        message_id,
                        tag: value.to_string(),
                    }
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Keyboard attached to every processing result.
pub fn result_keyboard(message_id: i32) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🗑 Delete",
        CallbackAction::Delete { message_id }.data(),
    )]])
}

/// Apply an action for `user_id`, returning the text to show the user.
pub async fn apply_action(
    action: &CallbackAction,
    user_id: u64,
    state: &BotState,
    storages: &[Arc<dyn Storage>],
) -> Result<String, TelegramError> {
    let message_id = action.message_id();

    match action {
        CallbackAction::Delete { .. } => {
            let Some(saved) = state.saved_entries(user_id, message_id).await else {
                return Ok("Message not found in knowledge base".to_string());
            };
            let mut removed = 0;
            let mut failed = SavedEntries::default();
            for (backend, id) in saved.entries {
                let Some(storage) = storages.iter().find(|s| s.backend() == backend) else {
                    continue;
                };
                match storage.delete(&id).await {
                    Ok(true) => removed += 1,
                    Ok(false) => warn!(backend = %backend, id = %id, "Entry already gone"),
                    Err(e) => {
                        warn!(backend = %backend, id = %id, error = %e, "Failed to delete entry");
                        failed.entries.push((backend, id));
                    }
                }
            }

            if !failed.entries.is_empty() {
                let remaining = failed.entries.len();
                state.retain_saved(user_id, message_id, failed).await;
                return Ok(format!(
                    "⚠️ Deleted {} entries, {} could not be deleted. Try again later.",
                    removed, remaining
                ));
            }

            state.forget(user_id, message_id).await;
            info!(user_id, message_id, removed, "Deleted message from knowledge base");
            Ok(format!("🗑 Message deleted from knowledge base ({} entries)", removed))
        }
        CallbackAction::Category { category, .. } => {
            let category = best_category(category);
            let updated = update_entries(state, storages, user_id, message_id, &RecordUpdate::category(category)).await?;
            if updated == 0 {
                return Ok("Message not found in knowledge base".to_string());
            }
            state.set_category(user_id, message_id, category).await;
            Ok(format!("Category changed to: {}", category))
        }
        CallbackAction::Tag { tag, .. } => {
            let Some(tags) = state.tags_with(user_id, message_id, tag).await else {
                return Ok("Message not found in knowledge base".to_string());
            };
            update_entries(state, storages, user_id, message_id, &RecordUpdate::tags(tags.clone())).await?;
            state.set_tags(user_id, message_id, &tags).await;
            Ok(format!("Tag added: {}", tag))
        }
    }
}

async fn update_entries(
    state: &BotState,
    storages: &[Arc<dyn Storage>],
    user_id: u64,
    message_id: i32,
    update: &RecordUpdate,
) -> Result<usize, TelegramError> {
    let Some(saved) = state.saved_entries(user_id, message_id).await else {
        return Ok(0);
    };
    let mut updated = 0;
    for (backend, id) in &saved.entries {
        if let Some(storage) = storages.iter().find(|s| s.backend() == *backend) {
            if storage.update(id, update).await? {
                updated += 1;
            }
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delete() {
        assert_eq!(
            "delete:42".parse::<CallbackAction>().unwrap(),
            CallbackAction::Delete { message_id: 42 }
        );
    }

    #[test]
    fn test_parse_category_keeps_slashes_and_colons() {
        assert_eq!(
            "category:7:Technology/Programming".parse::<CallbackAction>().unwrap(),
            CallbackAction::Category {
                message_id: 7,
                category: "Technology/Programming".to_string()
            }
        );
        assert_eq!(
            "tag:7:a:b".parse::<CallbackAction>().unwrap(),
            CallbackAction::Tag {
                message_id: 7,
                tag: "a:b".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for data in ["", "delete", "delete:x", "tag:7", "tag:7:  ", "rename:7:x", "category:x:Ideas"] {
            assert!(
                matches!(data.parse::<CallbackAction>(), Err(TelegramError::InvalidCallback(_))),
                "{:?}",
                data
            );
        }
    }

    #[test]
    fn test_data_round_trips_through_parse() {
        let action = CallbackAction::Tag {
            message_id: 3,
            tag: "rust".to_string(),
        };
        assert_eq!(action.data().parse::<CallbackAction>().unwrap(), action);
    }
}

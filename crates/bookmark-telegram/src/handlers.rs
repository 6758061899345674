//! Command, message and callback handlers for the Telegram bot.

use std::sync::Arc;

use bookmark_core::Settings;
use bookmark_storage::{ProcessedMessage, Storage};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, ReplyParameters};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{error, info, warn};

use crate::callbacks::{apply_action, result_keyboard, CallbackAction};
use crate::error::TelegramError;
use crate::incoming::{incoming_message, TelegramFetcher};
use crate::processor::MessageProcessor;
use crate::queue::StorageQueue;
use crate::state::{render_export, BotState, ExportFormat, UserStats};

/// Result type returned by every handler.
pub type HandlerResult = Result<(), TelegramError>;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Show current settings")]
    Settings,

    #[command(description = "View your statistics")]
    Stats,

    #[command(description = "Export your data: /export [json|csv|markdown]")]
    Export(String),
}

/// Everything a handler needs.
pub struct BotContext {
    /// The per-user history, saved ids and settings.
    pub state: Arc<BotState>,
    /// The extraction and AI analysis pipeline.
    pub processor: MessageProcessor,
    /// The queue feeding the storage workers.
    pub queue: StorageQueue,
    /// The configured storage backends, primary first.
    pub storages: Vec<Arc<dyn Storage>>,
}

fn user_id(msg: &Message) -> Option<u64> {
    msg.from.as_ref().map(|u| u.id.0)
}

/// Whether the sender may use the bot. Unauthorized chats are logged and ignored.
fn authorized(ctx: &BotContext, msg: &Message) -> bool {
    let allowed = ctx.state.is_allowed(msg.chat.id.0, user_id(msg));
    if !allowed {
        warn!(chat_id = %msg.chat.id, user_id = ?user_id(msg), "Ignoring message from unauthorized chat");
    }
    allowed
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> HandlerResult {
    let welcome = "👋 <b>Welcome to Telegram Knowledge Bot!</b>\n\n\
        I'm your AI-powered assistant for organizing and storing messages.\n\n\
        Just send me any message and I'll:\n\
        • Summarize it intelligently\n\
        • Categorize and tag it\n\
        • Extract key information\n\
        • Store it in your knowledge base\n\n\
        Type /help to learn more about what I can do!";

    bot.send_message(msg.chat.id, welcome)
        .parse_mode(ParseMode::Html)
        .await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    let help = format!(
        "🤖 <b>Telegram Knowledge Bot</b>\n\n\
        I can help you organize and store your messages with AI-powered processing!\n\n\
        <b>What I do:</b>\n\
        • 🤖 Auto-summarize long messages\n\
        • 🏷️ Smart categorization and tagging\n\
        • 🔍 Extract keywords and entities\n\
        • 💾 Store to Notion/Obsidian\n\
        • 🔗 Process URLs and extract content\n\
        • 🖼️ OCR for images\n\n\
        <b>How to use:</b>\n\
        Simply send me any message, and I'll process it automatically!\n\n\
        {}",
        html::escape(&Command::descriptions().to_string())
    );

    bot.send_message(msg.chat.id, help)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

fn mark(on: bool) -> &'static str {
    if on {
        "✅"
    } else {
        "❌"
    }
}

/// Render the /settings reply.
pub fn render_settings(settings: &Settings) -> String {
    let f = &settings.features;
    let s = &settings.storage;
    format!(
        "⚙️ <b>Bot Settings</b>\n\n\
        <b>AI Features:</b>\n\
        • Auto Summarize: {}\n\
        • Auto Classify: {}\n\
        • Smart Reply: {}\n\
        • Content Extraction: {}\n\
        • OCR Enabled: {}\n\n\
        <b>AI Provider:</b> {}\n\n\
        <b>Storage:</b>\n\
        • Primary: {}\n\
        • Notion: {}\n\
        • Obsidian: {}",
        mark(f.auto_summarize),
        mark(f.auto_classify),
        mark(f.smart_reply),
        mark(f.content_extraction),
        mark(f.ocr_enabled),
        settings.ai.provider,
        s.primary,
        mark(s.notion.is_enabled()),
        mark(s.obsidian.is_enabled()),
    )
}

/// Render the /stats reply.
pub fn render_stats(stats: &UserStats, settings: &Settings) -> String {
    let top = if stats.top_categories.is_empty() {
        "• None yet".to_string()
    } else {
        stats
            .top_categories
            .iter()
            .map(|(category, count)| format!("• {} ({})", html::escape(category), count))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let connected = |on: bool| if on { "Connected" } else { "Not configured" };

    format!(
        "📊 <b>Your Statistics</b>\n\n\
        <b>Message Processing:</b>\n\
        • Total Messages: {}\n\
        • This Week: {}\n\
        • Today: {}\n\n\
        <b>Top Categories:</b>\n{}\n\n\
        <b>Storage:</b>\n\
        • Notion: {}\n\
        • Obsidian: {}",
        stats.total,
        stats.this_week,
        stats.today,
        top,
        connected(settings.storage.notion.is_enabled()),
        connected(settings.storage.obsidian.is_enabled()),
    )
}

/// Render the reply shown after processing.
pub fn render_result(record: &ProcessedMessage, smart_reply: bool) -> String {
    if !smart_reply {
        return "✅ Message saved.".to_string();
    }

    let tags = html::escape(&record.tags.join(", "));
    let summary = html::escape(&record.summary);
    let category = html::escape(&record.category);

    if let Some(media_type) = &record.metadata.media_type {
        return format!(
            "✅ <b>Media Processed Successfully!</b>\n\n\
            📁 <b>Type:</b> {}\n\
            🏷️ <b>Category:</b> {}\n\
            🏷️ <b>Tags:</b> {}\n\n\
            📝 <b>Summary:</b>\n<i>{}</i>",
            html::escape(media_type),
            category,
            tags,
            summary,
        );
    }

    format!(
        "✅ <b>Message Processed Successfully!</b>\n\n\
        🏷️ <b>Category:</b> {}\n\
        🏷️ <b>Tags:</b> {}\n\
        🔑 <b>Keywords:</b> {}\n\n\
        📝 <b>Summary:</b>\n<i>{}</i>\n\n\
        📊 <b>Stats:</b>\n\
        - Length: {} chars\n\
        - URLs: {}\n\
        - Files: {}\n\
        - Images: {}",
        category,
        tags,
        html::escape(&record.keywords.join(", ")),
        summary,
        record.content.chars().count(),
        record.metadata.extracted_urls,
        record.metadata.extracted_files,
        record.metadata.extracted_images,
    )
}

/// Handle the /settings command.
pub async fn handle_settings(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    bot.send_message(msg.chat.id, render_settings(ctx.state.settings()))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle the /stats command.
pub async fn handle_stats(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let stats = ctx.state.stats(user_id(&msg).unwrap_or_default()).await;
    bot.send_message(msg.chat.id, render_stats(&stats, ctx.state.settings()))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle the /export command.
pub async fn handle_export(bot: Bot, msg: Message, ctx: Arc<BotContext>, arg: String) -> HandlerResult {
    let format = match arg.parse::<ExportFormat>() {
        Ok(format) => format,
        Err(e) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "{}\n\n<b>Usage:</b> <code>/export [json|csv|markdown]</code>",
                    html::escape(&e)
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            return Ok(());
        }
    };

    let history = ctx.state.history(user_id(&msg).unwrap_or_default()).await;
    if history.is_empty() {
        bot.send_message(msg.chat.id, "📤 Nothing to export yet. Send me a message first!")
            .await?;
        return Ok(());
    }

    let body = render_export(format, &history);
    let file_name = format!("tg-bookmark-export.{}", format.extension());
    bot.send_document(msg.chat.id, InputFile::memory(body.into_bytes()).file_name(file_name))
        .caption(format!("📤 Exported {} messages", history.len()))
        .await?;

    info!(chat_id = %msg.chat.id, entries = history.len(), format = ?format, "Exported history");
    Ok(())
}

/// Dispatch commands to appropriate handlers.
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, ctx: Arc<BotContext>) -> HandlerResult {
    if !authorized(&ctx, &msg) {
        return Ok(());
    }
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Settings => handle_settings(bot, msg, ctx).await,
        Command::Stats => handle_stats(bot, msg, ctx).await,
        Command::Export(arg) => handle_export(bot, msg, ctx, arg).await,
    }
}

/// Reply to a `/command` that did not parse.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> HandlerResult {
    if let Some(text) = msg.text() {
        let name = text.split_whitespace().next().unwrap_or(text);
        info!(cmd = %name, "Unrecognized command");
        bot.send_message(
            msg.chat.id,
            format!("Unknown command: {}\n\nUse /help to see available commands.", name),
        )
        .await?;
    }
    Ok(())
}

/// Handle text and media messages: process, reply, and queue for storage.
pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    if !authorized(&ctx, &msg) {
        return Ok(());
    }

    let incoming = incoming_message(&msg);
    let is_media = incoming.has_media();
    info!(chat_id = %msg.chat.id, message_id = msg.id.0, media = is_media, "Processing message");

    let placeholder = if is_media {
        "📁 Processing your media..."
    } else {
        "🤖 Processing your message..."
    };
    let progress = bot
        .send_message(msg.chat.id, placeholder)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let fetcher = TelegramFetcher::new(bot.clone());
    match ctx.processor.process(&incoming, &fetcher).await {
        Ok(Some(record)) => {
            ctx.state.record_processed(&record).await;
            let reply = render_result(&record, ctx.state.settings().features.smart_reply);
            let keyboard = result_keyboard(record.message_id);
            ctx.queue.enqueue(record).await?;

            bot.edit_message_text(msg.chat.id, progress.id, reply)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
            info!(chat_id = %msg.chat.id, message_id = msg.id.0, "Message processed");
            Ok(())
        }
        Ok(None) => {
            bot.edit_message_text(msg.chat.id, progress.id, "❌ No content found in message.")
                .await?;
            Ok(())
        }
        Err(e) => {
            error!(chat_id = %msg.chat.id, message_id = msg.id.0, error = %e, "Failed to process message");
            let text = if is_media {
                "❌ Error processing your media file."
            } else {
                "❌ Sorry, an error occurred while processing your message."
            };
            bot.edit_message_text(msg.chat.id, progress.id, text).await?;
            Err(e)
        }
    }
}

/// Handle inline button presses.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let text = match data.parse::<CallbackAction>() {
        Ok(action) => apply_action(&action, q.from.id.0, &ctx.state, &ctx.storages).await?,
        Err(e) => {
            warn!(data = %data, error = %e, "Ignoring callback");
            "Unknown action".to_string()
        }
    };

    bot.answer_callback_query(q.id.clone()).text(text).await?;
    Ok(())
}

//! Main Telegram bot implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::BoxFuture;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::error_handlers::{ErrorHandler, LoggingErrorHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{Result, TelegramError};
use crate::handlers::{
    handle_callback, handle_command, handle_message, handle_unknown_command, BotContext, Command,
};
use crate::health::HealthStatus;

/// Longest error text forwarded to admins.
const MAX_ERROR_REPORT: usize = 3500;

/// How the bot receives updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Polling,
    /// Listen on `addr` and register `url` with Telegram.
    Webhook { addr: SocketAddr, url: Url },
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// The knowledge bot.
pub struct KnowledgeBot {
    /// The Telegram API client.
    bot: Bot,
    /// The shared context handed to every handler.
    ctx: Arc<BotContext>,
}

impl KnowledgeBot {
    pub fn new(token: &str, ctx: BotContext) -> Self {
        Self {
            bot: Bot::new(token),
            ctx: Arc::new(ctx),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Publish the command list shown in Telegram's menu.
    pub async fn set_commands(&self) -> Result<()> {
        self.bot.set_my_commands(Command::bot_commands()).await?;
        info!("Bot commands set successfully");
        Ok(())
    }

    /// Run until Ctrl+C.
    pub async fn run(&self, mode: RunMode) -> Result<()> {
        let notifier = Arc::new(AdminNotifier::new(
            self.bot.clone(),
            self.ctx.state.settings().telegram.admin_users.clone(),
        ));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.ctx)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(notifier)
            .enable_ctrlc_handler()
            .build();

        let health = Arc::clone(self.ctx.state.health());

        match mode {
            RunMode::Polling => {
                info!("Starting bot in polling mode...");
                health.set_status(HealthStatus::Ok);
                dispatcher.dispatch().await;
            }
            RunMode::Webhook { addr, url } => {
                info!(addr = %addr, url = %url, "Starting bot in webhook mode...");
                let listener = webhooks::axum(self.bot.clone(), webhooks::Options::new(addr, url))
                    .await
                    .map_err(|e| TelegramError::WebhookFailed(e.to_string()))?;
                health.set_status(HealthStatus::Ok);
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("An error from the update listener"),
                    )
                    .await;
            }
        }

        health.set_status(HealthStatus::Stopped);
        info!("Bot stopped gracefully");
        Ok(())
    }
}

/// Update routing: callbacks, commands, unknown commands, media, then text.
fn schema(ctx: Arc<BotContext>) -> UpdateHandler<TelegramError> {
    let ctx_for_callbacks = Arc::clone(&ctx);
    let ctx_for_commands = Arc::clone(&ctx);
    let ctx_for_media = Arc::clone(&ctx);
    let ctx_for_text = ctx;

    dptree::entry()
        .branch(
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let ctx = Arc::clone(&ctx_for_callbacks);
                async move { handle_callback(bot, q, ctx).await }
            }),
        )
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let ctx = Arc::clone(&ctx_for_commands);
                    async move { handle_command(bot, msg, cmd, ctx).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().map(|t| t.starts_with('/')).unwrap_or(false))
                .endpoint(|bot: Bot, msg: Message| async move { handle_unknown_command(bot, msg).await }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| has_media(&msg))
                .endpoint(move |bot: Bot, msg: Message| {
                    let ctx = Arc::clone(&ctx_for_media);
                    async move { handle_message(bot, msg, ctx).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().map(|t| !t.trim().is_empty()).unwrap_or(false))
                .endpoint(move |bot: Bot, msg: Message| {
                    let ctx = Arc::clone(&ctx_for_text);
                    async move { handle_message(bot, msg, ctx).await }
                }),
        )
}

fn has_media(msg: &Message) -> bool {
    msg.document().is_some()
        || msg.photo().is_some()
        || msg.audio().is_some()
        || msg.video().is_some()
        || msg.voice().is_some()
}

/// Logs handler errors and reports them to the admin users.
pub struct AdminNotifier {
    /// The Telegram API client.
    bot: Bot,
    /// The chat ids of `TELEGRAM_ADMIN_USERS`.
    admins: Vec<i64>,
}

impl AdminNotifier {
    pub fn new(bot: Bot, admins: Vec<i64>) -> Self {
        Self { bot, admins }
    }
}

/// HTML report of a handler error, cut to fit a Telegram message.
pub fn error_report(error: &TelegramError) -> String {
    let detail: String = error.to_string().chars().take(MAX_ERROR_REPORT).collect();
    format!(
        "⚠️ <b>An exception was raised while handling an update</b>\n\n<pre>{}</pre>",
        html::escape(&detail)
    )
}

impl ErrorHandler<TelegramError> for AdminNotifier {
    fn handle_error(self: Arc<Self>, error: TelegramError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            error!(error = %error, "Error while handling update");

            let report = error_report(&error);
            for &admin in &self.admins {
                if let Err(e) = self
                    .bot
                    .send_message(ChatId(admin), report.clone())
                    .parse_mode(ParseMode::Html)
                    .await
                {
                    warn!(admin, error = %e, "Failed to notify admin");
                }
            }
        })
    }
}

//! tg-bookmark binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx OPENAI_API_KEY=xxx cargo run -p bookmark-telegram
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bookmark_ai::create_provider;
use bookmark_core::config::{DEFAULT_ENV_FILE, DEFAULT_HEALTH_PORT};
use bookmark_core::{
    check_loaded, check_settings, init_logging, load_env_file, run_setup_stdout, LogLevel, Settings,
};
use bookmark_extract::ContentExtractionPipeline;
use bookmark_storage::StorageFactory;
use bookmark_telegram::{
    health, BotContext, BotState, HealthState, KnowledgeBot, MessageProcessor, RunMode, StorageQueue,
    TelegramError,
};
use clap::{Parser, ValueEnum};
use url::Url;

/// Example env file copied by `--setup` when present.
const ENV_EXAMPLE_FILE: &str = ".env.example";

/// Telegram Knowledge Bot - summarize, classify and store your messages
#[derive(Parser, Debug)]
#[command(name = "tg-bookmark", version)]
#[command(about = "Telegram bot that turns messages into knowledge base entries")]
struct Args {
    /// Run the first-time setup wizard
    #[arg(long)]
    setup: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,

    /// How to receive updates
    #[arg(long, value_enum, default_value_t = Mode::Polling)]
    mode: Mode,

    /// Webhook listen address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Webhook listen port
    #[arg(long, default_value_t = 8443)]
    port: u16,

    /// Env file to load (default: .env)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override LOG_LEVEL (DEBUG, INFO, WARNING, ERROR)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Print the configuration with secrets masked and exit
    #[arg(long)]
    show_config: bool,

    /// Check a running instance's /health endpoint and exit
    #[arg(long)]
    healthcheck: bool,

    /// Port of the health endpoint (default: HEALTH_PORT or 8080)
    #[arg(long)]
    health_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Polling,
    Webhook,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.setup {
        let env_path = args.env_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
        run_setup_stdout(&env_path, Path::new(ENV_EXAMPLE_FILE))?;
        return Ok(ExitCode::SUCCESS);
    }

    let env_loaded = load_env_file(args.env_file.as_deref());

    if args.healthcheck {
        return Ok(healthcheck(args.health_port).await);
    }

    let env_loaded = env_loaded?;
    let loaded = Settings::from_env();

    if args.check {
        println!("🔍 Checking configuration...");
        if let Some(path) = &env_loaded {
            println!("   Env file: {}", path.display());
        }
        let report = check_loaded(&loaded);
        print!("{}", report.render());
        return Ok(if report.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let mut settings = loaded?;
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }
    if let Some(port) = args.health_port {
        settings.health.port = port;
    }

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(
        settings.logging.level,
        settings.logging.format,
        settings.logging.dir.as_deref(),
    )?;

    run(args, settings).await?;
    Ok(ExitCode::SUCCESS)
}

async fn healthcheck(port: Option<u16>) -> ExitCode {
    let port = port
        .or_else(|| std::env::var("HEALTH_PORT").ok()?.parse().ok())
        .unwrap_or(DEFAULT_HEALTH_PORT);

    match health::check_health(port).await {
        Ok(body) => {
            println!("healthy: {} ({} messages processed)", body.status, body.processed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("unhealthy: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let report = check_settings(&settings);
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    for error in &report.errors {
        tracing::error!("{}", error);
    }

    let token = settings.telegram.bot_token.clone().ok_or(TelegramError::NoToken)?;

    let mode = match args.mode {
        Mode::Polling => RunMode::Polling,
        Mode::Webhook => {
            let url = settings.telegram.webhook_url.as_deref().ok_or_else(|| {
                TelegramError::WebhookFailed("TELEGRAM_WEBHOOK_URL is required in webhook mode".to_string())
            })?;
            let url = Url::parse(url).map_err(|e| TelegramError::WebhookFailed(e.to_string()))?;
            let addr: SocketAddr = format!("{}:{}", args.host, args.port)
                .parse()
                .map_err(|e| TelegramError::WebhookFailed(format!("invalid listen address: {}", e)))?;
            RunMode::Webhook { addr, url }
        }
    };

    let provider = create_provider(&settings.ai, None)?;

    let health_state = Arc::new(HealthState::new(mode.name()));
    let health_port = settings.health.port;
    let server_state = Arc::clone(&health_state);
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_port, server_state).await {
            tracing::error!(port = health_port, error = %e, "Health server failed");
        }
    });

    let state = Arc::new(BotState::new(settings.clone(), health_state));
    let storages = StorageFactory::new(settings.storage.clone()).all_storages();
    if storages.is_empty() {
        tracing::warn!("No storage configured; processed messages will not be saved");
    }

    let (queue, workers) = StorageQueue::start(storages.clone(), Arc::clone(&state), settings.processing.concurrency);
    let processor = MessageProcessor::new(
        provider,
        ContentExtractionPipeline::new(&settings.features),
        settings.features.clone(),
        Duration::from_secs(settings.processing.timeout_secs),
    );

    let bot = KnowledgeBot::new(
        &token,
        BotContext {
            state,
            processor,
            queue,
            storages,
        },
    );

    let username = bot.get_me().await?;
    tracing::info!(username = %username, "Bot initialized successfully");
    println!("\n🤖 Telegram Knowledge Bot");
    println!("   Bot: @{}", username);
    println!("   Mode: {}", mode.name());
    println!("   Health: http://0.0.0.0:{}/health", health_port);
    println!("\n📱 Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    if let Err(e) = bot.set_commands().await {
        tracing::warn!(error = %e, "Failed to set bot commands");
    }

    bot.run(mode).await?;

    // Dropping the bot closes the queue; workers drain what is left.
    drop(bot);
    for worker in workers {
        let _ = worker.await;
    }
    Ok(())
}

//! First-run setup wizard.
//!
//! Materializes the env file and tells the user which credentials to fill
//! in. Toolchain and dependency installation is the job of
//! `scripts/setup.sh`.

use std::io::{self, Write};
use std::path::Path;

use crate::env_file::{ensure_env_file, EnvFileOutcome};
use crate::error::Result;

/// Run the setup wizard, writing progress to `out`.
pub fn run_setup<W: Write>(env_path: &Path, example_path: &Path, out: &mut W) -> Result<EnvFileOutcome> {
    writeln!(out, "🧙 Telegram Knowledge Bot - Setup Wizard")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let outcome = ensure_env_file(env_path, example_path)?;
    match outcome {
        EnvFileOutcome::AlreadyExists => {
            writeln!(out, "✅ {} already exists", env_path.display())?;
        }
        EnvFileOutcome::CopiedFromExample => {
            writeln!(out, "\n📄 Creating {}...", env_path.display())?;
            writeln!(out, "✅ Created {} from {}", env_path.display(), example_path.display())?;
        }
        EnvFileOutcome::CreatedFromTemplate => {
            writeln!(out, "\n📄 Creating {}...", env_path.display())?;
            writeln!(out, "✅ Created basic {} file", env_path.display())?;
        }
    }

    print_next_steps(env_path, out)?;
    Ok(outcome)
}

/// Run the wizard against stdout.
pub fn run_setup_stdout(env_path: &Path, example_path: &Path) -> Result<EnvFileOutcome> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    run_setup(env_path, example_path, &mut lock)
}

fn print_next_steps<W: Write>(env_path: &Path, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n✅ Setup completed successfully!")?;
    writeln!(out, "\n📋 Next steps:")?;
    writeln!(out, "   1. Edit {} with your API keys and tokens", env_path.display())?;
    writeln!(out, "   2. Run: tg-bookmark --check")?;
    writeln!(out, "   3. Run: tg-bookmark")?;
    writeln!(out, "\n📝 Required credentials:")?;
    writeln!(out, "   - TELEGRAM_BOT_TOKEN: Get from @BotFather on Telegram")?;
    writeln!(out, "   - OPENAI_API_KEY: Get from https://platform.openai.com")?;
    writeln!(out, "     (or ANTHROPIC_API_KEY with AI_PROVIDER=anthropic)")?;
    writeln!(out, "   - NOTION_API_KEY and NOTION_DATABASE_ID: Optional, for Notion storage")?;
    writeln!(out, "   - OBSIDIAN_VAULT_PATH: Optional, for Obsidian storage")?;
    Ok(())
}

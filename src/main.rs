use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use chatrelay::chat::{Conversation, SessionStore};
use chatrelay::cli::{
    Cli, Commands, ConfigSubcommands, Repl, apply_overrides, create_relay, ctrl_c_interrupts,
    load_context, run_once,
};
use chatrelay::config::AppConfig;
use chatrelay::core::Result;
use chatrelay::logging;

fn run_config_command(command: &ConfigSubcommands) -> ExitCode {
    match command {
        ConfigSubcommands::Init => match AppConfig::init_default() {
            Ok(path) => {
                println!("✓ Created config file at {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("✗ Failed to create config: {e}");
                ExitCode::FAILURE
            }
        },
        ConfigSubcommands::Where => match AppConfig::get_config_path() {
            Some(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("✗ Could not determine config path");
                ExitCode::FAILURE
            }
        },
    }
}

fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = apply_overrides(&cli, AppConfig::load());
    let relay = create_relay(&config)?;

    if let Some(prompt) = &cli.prompt {
        let context = load_context(&cli)?;
        let mut stdout = io::stdout();
        let outcome = run_once(&relay, &context, prompt, interrupt_token(), &mut stdout).await;
        return Ok(if outcome.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let sessions = match &cli.load_session {
        Some(path) => SessionStore::load(path)?,
        None => SessionStore::new(),
    };
    let color = !cli.no_color && io::stdout().is_terminal();

    let conversation = Repl::new(&relay, Conversation::with_sessions(sessions), io::stdout())
        .with_color(color)
        .with_interrupts(ctrl_c_interrupts())
        .run(BufReader::new(tokio::io::stdin()))
        .await?;

    if let Some(path) = &cli.save_session {
        conversation.sessions().save(path)?;
        eprintln!("✓ Saved sessions to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref());

    if let Some(Commands::Config { command }) = &cli.command {
        return run_config_command(command);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

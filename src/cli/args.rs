//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::PromptTruncation;
use crate::providers::factory::ProviderKind;

#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ask a single question, print the streamed answer and exit
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Context block sent with a one-shot prompt
    #[arg(short, long, requires = "prompt", conflicts_with = "context_file")]
    pub context: Option<String>,

    /// Read the one-shot context block from a file
    #[arg(long, requires = "prompt")]
    pub context_file: Option<PathBuf>,

    /// Hosted service to use (cohere, openai)
    #[arg(long, global = true)]
    pub provider: Option<ProviderKind>,

    /// Model to use (e.g., command-r-08-2024, gpt-4o-mini)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(short, long, global = true)]
    pub temperature: Option<f32>,

    /// Prompt truncation policy (auto, off, auto-preserve-order)
    #[arg(long, global = true)]
    pub truncation: Option<PromptTruncation>,

    /// Do not attach the web-search connector
    #[arg(long, global = true)]
    pub no_web_search: bool,

    /// Base URL of the service or a compatible proxy
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Open each reply stream once, without retrying
    #[arg(long, global = true, conflicts_with = "max_attempts")]
    pub no_retry: bool,

    /// Attempts to open each reply stream
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Load sessions from file
    #[arg(long, global = true)]
    pub load_session: Option<PathBuf>,

    /// Save sessions to file on exit
    #[arg(long, global = true)]
    pub save_session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigSubcommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
    /// Initialize a new config file
    Init,
    /// Print config file location
    Where,
}

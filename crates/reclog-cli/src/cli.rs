use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reclog",
    about = "reclog: per-key JSON record logs over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Sequence,
    Legacy,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the full log of a key
    Read(KeyArgs),
    /// Print the log only if it changed since the last `latest`
    Latest(KeyArgs),
    /// Replace a key's log with one record
    Write(ContentArgs),
    /// Append one record to a key's log
    Append(ContentArgs),
    /// Remove and print the oldest record
    Pop(KeyArgs),
    /// Empty a key's log
    Clear(KeyArgs),
    /// Mint a bearer token for the write endpoints
    Token(TokenArgs),
}

/// Where logs live on disk.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    /// Storage root directory
    #[arg(long, default_value = "files")]
    pub root: PathBuf,
    /// Append semantics
    #[arg(long, value_enum, default_value = "sequence")]
    pub mode: ModeArg,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct ContentArgs {
    pub key: String,
    /// Record to store, as JSON
    pub content: String,
    /// Store `content` as a JSON string instead of parsing it
    #[arg(long)]
    pub text: bool,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the bind address
    #[arg(long)]
    pub bind: Option<String>,
    /// Override the storage root
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Override the append mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(Args)]
pub struct TokenArgs {
    /// Subject claim
    pub subject: String,
    /// Lifetime in seconds; omit for a non-expiring token
    #[arg(long)]
    pub ttl: Option<u64>,
    /// Signing secret (defaults to RECLOG_TOKEN_SECRET)
    #[arg(long, env = "RECLOG_TOKEN_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

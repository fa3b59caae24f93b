use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use reclog_server::{Hs256Auth, ReclogServer, ServerConfig};
use reclog_store::{AppendMode, Dequeued, Latest, RecordLogStore, StoreConfig};
use serde_json::{json, Value};
use tracing::Level;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli { command, verbose, format } = cli;
    match command {
        Command::Serve(args) => cmd_serve(args, verbose),
        local => {
            init_tracing(verbose);
            run_local(local, &format)
        }
    }
}

/// Commands that operate directly on a storage root.
fn run_local(command: Command, format: &OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Read(args) => cmd_read(args, format),
        Command::Latest(args) => cmd_latest(args, format),
        Command::Write(args) => cmd_write(args, format),
        Command::Append(args) => cmd_append(args, format),
        Command::Pop(args) => cmd_pop(args, format),
        Command::Clear(args) => cmd_clear(args, format),
        Command::Token(args) => cmd_token(args, format),
        Command::Serve(_) => bail!("serve does not run against a local store"),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

impl From<ModeArg> for AppendMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequence => AppendMode::Sequence,
            ModeArg::Legacy => AppendMode::Legacy,
        }
    }
}

impl StoreArgs {
    fn open(&self) -> RecordLogStore {
        RecordLogStore::open(StoreConfig {
            append_mode: self.mode.into(),
            ..StoreConfig::with_root(&self.root)
        })
    }
}

fn parse_content(args: &ContentArgs) -> anyhow::Result<Value> {
    if args.text {
        return Ok(Value::String(args.content.clone()));
    }
    serde_json::from_str(&args.content).with_context(|| {
        format!("content is not valid JSON (use --text for a plain string): {}", args.content)
    })
}

fn print_content(format: &OutputFormat, content: &Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json!({ "content": content })),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(content)?),
    }
    Ok(())
}

fn print_status(format: &OutputFormat, message: &str) {
    match format {
        OutputFormat::Json => println!("{}", json!({ "content": message })),
        OutputFormat::Text => println!("{} {}", "✓".green().bold(), message),
    }
}

fn cmd_serve(args: ServeArgs, verbose: bool) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    if let Some(root) = args.root {
        config.store.root = root;
    }
    if let Some(mode) = args.mode {
        config.store.append_mode = mode.into();
    }
    init_tracing(verbose || config.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(ReclogServer::new(config).serve())?;
    Ok(())
}

fn cmd_read(args: KeyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    let content = store.read_and_mark(&location)?;
    print_content(format, &content)
}

fn cmd_latest(args: KeyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    match store.latest(&location)? {
        Latest::Fresh(content) => print_content(format, &content),
        Latest::Seen => {
            print_status(format, &format!("No new content in {}", args.key.yellow()));
            Ok(())
        }
    }
}

fn cmd_write(args: ContentArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let content = parse_content(&args)?;
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    store.write(&location, content)?;
    print_status(format, &format!("Wrote to {}", args.key.yellow()));
    Ok(())
}

fn cmd_append(args: ContentArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let content = parse_content(&args)?;
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    let log = store.append(&location, content)?;
    let count = log.as_array().map_or(1, Vec::len);
    print_status(format, &format!("Appended to {} ({count} records)", args.key.yellow()));
    Ok(())
}

fn cmd_pop(args: KeyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    match store.dequeue(&location)? {
        Dequeued::Record(record) => print_content(format, &record),
        Dequeued::Empty => {
            print_status(format, &format!("{} is empty", args.key.yellow()));
            Ok(())
        }
    }
}

fn cmd_clear(args: KeyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = args.store.open();
    let location = store.resolve(&args.key)?;
    store.clear(&location)?;
    print_status(format, &format!("Cleared {}", args.key.yellow()));
    Ok(())
}

fn cmd_token(args: TokenArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let Some(secret) = args.secret.filter(|s| !s.is_empty()) else {
        bail!("no signing secret: pass --secret or set RECLOG_TOKEN_SECRET");
    };
    let token = Hs256Auth::new(secret).issue(&args.subject, args.ttl.map(Duration::from_secs))?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "token": token })),
        OutputFormat::Text => println!("{token}"),
    }
    Ok(())
}

//! Query parameter enforcer (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     rule / target edits                 ┌──────────────────────────────────────────┐
//!     (CLI, other processes)              │               ENFORCER                   │
//!     ────────────────────────────────────┼─▶ store (JSON file + watcher)            │
//!                                         │        │ StoreChange                      │
//!                                         │        ▼                                  │
//!                                         │   reactor ── reload targetUrl + rules     │
//!                                         │        │ ActiveConfiguration              │
//!                                         │        ▼                                  │
//!                                         │   lifecycle manager ── (de)register ──┐   │
//!                                         │                                       ▼   │
//!     request lines on stdin              │                               local host  │
//!     ────────────────────────────────────┼─▶ dispatch ──▶ callback ──▶ redirect    │
//!     ◀───────────────────────────────────┼── {} | {"redirectUrl": ...}  decision   │
//!                                         └──────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use query_enforcer::config::{load_or_default, EnforcerConfig};
use query_enforcer::intercept::{RequestDetails, ResourceType};
use query_enforcer::lifecycle::{signals, Enforcer};
use query_enforcer::observability::logging;
use query_enforcer::reactor::{StoredSnapshot, WATCHED_KEYS};
use query_enforcer::redirect::decide;
use query_enforcer::routing::PatternMatcher;
use query_enforcer::rules::{RuleEditor, RuleId};
use query_enforcer::store::{ConfigStore, FileStore};

#[derive(Parser)]
#[command(name = "query-enforcer")]
#[command(about = "Force query parameters on requests matching a target pattern", long_about = None)]
struct Cli {
    /// Process configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store file, overriding the configured path
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the store and answer request lines ("[type] url") from stdin
    Run,
    /// Inspect or change the target pattern
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Inspect or change parameter rules
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Decide a single URL against the stored configuration
    Check { url: String },
}

#[derive(Subcommand)]
enum TargetAction {
    /// Print the raw and normalized target
    Show,
    /// Store a new target
    Set { pattern: String },
    /// Remove the target (disables interception)
    Clear,
}

#[derive(Subcommand)]
enum RuleAction {
    /// List all rules
    List,
    /// Add a rule
    Add {
        name: String,
        #[arg(default_value = "")]
        value: String,
        /// Store the rule disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change a rule's value
    SetValue { id: String, value: String },
    Enable { id: String },
    Disable { id: String },
    Toggle { id: String },
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        config.store.path = store.to_string_lossy().into_owned();
    }

    logging::init_logging(&config.observability.log_level);

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Target { action } => target(&config, action).await,
        Commands::Rule { action } => rule(&config, action).await,
        Commands::Check { url } => check(&config, &url).await,
    }
}

async fn run(config: EnforcerConfig) -> Result<(), Box<dyn Error>> {
    tracing::info!("query-enforcer v0.1.0 starting");

    let enforcer = Enforcer::start(&config).await?;
    tokio::spawn(signals::shutdown_on_signal(enforcer.shutdown_handle()));
    let mut shutdown = enforcer.shutdown_handle().subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_request_id = 0u64;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let Some(details) = parse_request_line(&line, next_request_id) else {
                        continue;
                    };
                    next_request_id += 1;
                    let response = enforcer.host.dispatch(&details);
                    println!("{}", serde_json::to_string(&response)?);
                }
                None => {
                    tracing::info!("stdin closed");
                    break;
                }
            },
            _ = shutdown.recv() => break,
        }
    }

    enforcer.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// `[resource_type] url`; the type defaults to `main_frame`.
fn parse_request_line(line: &str, request_id: u64) -> Option<RequestDetails> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (resource_type, url) = match line.split_once(char::is_whitespace) {
        Some((first, rest)) => match first.parse::<ResourceType>() {
            Ok(t) => (t, rest.trim()),
            Err(_) => (ResourceType::MainFrame, line),
        },
        None => (ResourceType::MainFrame, line),
    };

    Some(RequestDetails {
        request_id,
        url: url.to_string(),
        resource_type,
    })
}

fn open_store(config: &EnforcerConfig) -> Result<FileStore, Box<dyn Error>> {
    Ok(FileStore::open(
        std::path::Path::new(&config.store.path),
        config.interception.area,
    )?)
}

async fn target(config: &EnforcerConfig, action: TargetAction) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let editor = RuleEditor::new(&store);

    match action {
        TargetAction::Show => match editor.target().await? {
            Some(raw) => {
                let normalized = query_enforcer::normalize(&raw);
                println!("raw:        {}", raw);
                println!(
                    "normalized: {}",
                    normalized.as_ref().map(|p| p.as_str()).unwrap_or("(none)")
                );
            }
            None => println!("no target set"),
        },
        TargetAction::Set { pattern } => {
            editor.set_target(&pattern).await?;
            match query_enforcer::normalize(&pattern) {
                Some(p) => println!("target set: {}", p),
                None => println!("target is empty; interception disabled"),
            }
        }
        TargetAction::Clear => {
            editor.clear_target().await?;
            println!("target cleared; interception disabled");
        }
    }
    Ok(())
}

async fn rule(config: &EnforcerConfig, action: RuleAction) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let editor = RuleEditor::new(&store);

    match action {
        RuleAction::List => {
            let rules = editor.rules().await?;
            if rules.is_empty() {
                println!("no rules");
            }
            for r in rules.iter() {
                let state = if r.enabled { "on " } else { "off" };
                let id = r.id.as_ref().map(RuleId::as_str).unwrap_or("-");
                println!("{}  {}  {}={}", id, state, r.param_name, r.param_value);
            }
        }
        RuleAction::Add { name, value, disabled } => {
            let id = editor.add_with(&name, &value, !disabled).await?;
            println!("{}", id);
        }
        RuleAction::SetValue { id, value } => {
            editor.update_value(&RuleId::from(id.as_str()), &value).await?;
        }
        RuleAction::Enable { id } => {
            editor.set_enabled(&RuleId::from(id.as_str()), true).await?;
        }
        RuleAction::Disable { id } => {
            editor.set_enabled(&RuleId::from(id.as_str()), false).await?;
        }
        RuleAction::Toggle { id } => {
            let enabled = editor.toggle(&RuleId::from(id.as_str())).await?;
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        RuleAction::Remove { id } => {
            editor.remove(&RuleId::from(id.as_str())).await?;
        }
    }
    Ok(())
}

async fn check(config: &EnforcerConfig, url: &str) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let values = store.get(&WATCHED_KEYS).await?;
    let active = StoredSnapshot::from_values(&values).to_active();

    let Some(pattern) = active.pattern else {
        println!("{}", serde_json::json!({ "intercepted": false, "reason": "no target" }));
        return Ok(());
    };

    let intercepted = match (PatternMatcher::compile(&pattern), url::Url::parse(url)) {
        (Ok(matcher), Ok(parsed)) => matcher.matches(&parsed),
        (Err(e), _) => {
            println!("{}", serde_json::json!({ "intercepted": false, "reason": e.to_string() }));
            return Ok(());
        }
        (_, Err(_)) => false,
    };
    if !intercepted {
        println!("{}", serde_json::json!({ "intercepted": false, "pattern": pattern }));
        return Ok(());
    }

    let decision = decide(url, &active.enabled_rules);
    println!(
        "{}",
        serde_json::json!({ "intercepted": true, "pattern": pattern, "result": decision })
    );
    Ok(())
}

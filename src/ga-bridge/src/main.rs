//! ga-bridge: replays a script of tracking calls against an in-memory host
//! and prints every command the bridge hands to the analytics backend.
//!
//! Each script line is one JSON object tagged by `op`. Each emitted command
//! is printed as one JSON line on stdout; logs go to stderr.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ga_bridge_core::{FieldMap, Settings, SettingsStore};
use ga_bridge_web_sdk::{
    ExceptionReport, GaTracker, HandlerTable, PageLocation, Protocol, RecordingHost, Transaction,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HostProtocol {
    /// Install a global analytics function
    Universal,
    /// Install a legacy command queue
    Classic,
    /// Install nothing
    #[value(name = "none")]
    Bare,
}

#[derive(Parser, Debug)]
#[command(name = "ga-bridge")]
#[command(about = "Replay tracking calls and print the resulting analytics commands")]
#[command(version)]
struct Cli {
    /// Settings file (TOML); environment variables still apply on top
    #[arg(long, env = "GA_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Backend the simulated host exposes
    #[arg(long, value_enum, env = "GA_BRIDGE_PROTOCOL", default_value_t = HostProtocol::Universal)]
    protocol: HostProtocol,

    /// Global namespace the modern function is installed under
    #[arg(long, env = "GA_BRIDGE_NAMESPACE", default_value = "ga")]
    namespace: String,

    /// Path reported as the host's current location
    #[arg(long, default_value = "/")]
    pathname: String,

    /// Hash fragment reported as the host's current location
    #[arg(long, default_value = "")]
    hash: String,

    /// Script of JSON lines, or `-` for stdin
    script: PathBuf,
}

/// One replayed tracking call.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum ScriptOp {
    PageTrack {
        path: String,
        #[serde(default)]
        properties: FieldMap,
    },
    EventTrack {
        action: String,
        #[serde(default)]
        properties: FieldMap,
    },
    ExceptionTrack {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetUsername { user_id: String },
    SetUserProperties {
        #[serde(default)]
        properties: Option<FieldMap>,
    },
    UserTimings {
        #[serde(default)]
        properties: FieldMap,
    },
    TransactionTrack { transaction: FieldMap },
    Settings {
        #[serde(flatten)]
        partial: Map<String, Value>,
    },
}

fn apply_settings(store: &SettingsStore, partial: Map<String, Value>) -> anyhow::Result<()> {
    let settings = store
        .current()
        .merged(Value::Object(partial))
        .context("invalid settings update")?;
    store.update(|current| *current = settings);
    Ok(())
}

fn replay(handlers: &HandlerTable, store: &SettingsStore, op: ScriptOp) -> anyhow::Result<()> {
    match op {
        ScriptOp::PageTrack { path, properties } => handlers.page_track(&path, &properties),
        ScriptOp::EventTrack { action, properties } => handlers.event_track(&action, &properties),
        ScriptOp::ExceptionTrack { message, stack } => {
            handlers.exception_track(&ExceptionReport::new(message, stack), None)
        }
        ScriptOp::SetUsername { user_id } => handlers.set_username(&user_id),
        ScriptOp::SetUserProperties { properties } => {
            handlers.set_user_properties(properties.as_ref())
        }
        ScriptOp::UserTimings { properties } => handlers.user_timings(&properties),
        ScriptOp::TransactionTrack { transaction } => {
            handlers.transaction_track(&Transaction::from_fields(&transaction))
        }
        ScriptOp::Settings { partial } => apply_settings(store, partial)?,
    }
    Ok(())
}

/// Print every command recorded since the last call; returns the new total.
fn flush(
    out: &mut impl Write,
    host: &RecordingHost,
    protocol: Option<Protocol>,
    printed: usize,
) -> anyhow::Result<usize> {
    let Some(protocol) = protocol else {
        return Ok(printed);
    };
    let commands: Vec<Value> = match protocol {
        Protocol::Modern => host
            .universal_calls()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?,
        Protocol::Legacy => host
            .queue_entries()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?,
    };
    for command in &commands[printed.min(commands.len())..] {
        let line = json!({ "protocol": protocol.to_string(), "command": command });
        writeln!(out, "{line}")?;
    }
    Ok(commands.len())
}

fn open_script(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open script {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ga_bridge=info,ga_bridge_core=info,ga_bridge_web_sdk=info".into()),
        )
        .with_writer(io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    info!("ga-bridge starting up");

    let settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load settings, using defaults");
        Settings::default()
    });

    info!(
        protocol = ?cli.protocol,
        namespace = %cli.namespace,
        additional_accounts = settings.additional_account_names.len(),
        enhanced_ecommerce = settings.enhanced_ecommerce,
        "Configuration loaded"
    );

    let host = RecordingHost::new().with_location(PageLocation::new(cli.hash, cli.pathname));
    let host = Arc::new(match cli.protocol {
        HostProtocol::Universal => host.with_universal(&cli.namespace),
        HostProtocol::Classic => host.with_classic_queue(),
        HostProtocol::Bare => host,
    });

    let store = SettingsStore::new(settings);
    let tracker = Arc::new(GaTracker::new(host.clone(), store.clone()));
    let mut handlers = HandlerTable::new();
    tracker.install(&mut handlers);

    let protocol = tracker.protocol();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printed = 0;
    let mut replayed = 0usize;

    for (index, line) in open_script(&cli.script)?.lines().enumerate() {
        let line = line.context("failed to read script")?;
        if line.trim().is_empty() {
            continue;
        }
        let op = match serde_json::from_str::<ScriptOp>(&line) {
            Ok(op) => op,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed script line");
                continue;
            }
        };
        if let Err(e) = replay(&handlers, &store, op) {
            warn!(line = index + 1, error = %e, "Script line failed");
            continue;
        }
        replayed += 1;
        printed = flush(&mut out, &host, protocol, printed)?;
    }

    info!(replayed, commands = printed, "Replay finished");
    Ok(())
}

//! Huddle sync daemon binary.
//!
//! # Usage
//!
//! ```bash
//! # Follow the persisted preference
//! huddle-daemon --server ws://localhost:5000/socket --api http://localhost:5000/api
//!
//! # Teacher session, enabled regardless of preference
//! huddle-daemon --role teacher --force-enable
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use huddle_client::SyncConfig;
use huddle_daemon::DaemonConfig;
use huddle_proto::Role;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Huddle chat sync daemon
#[derive(Parser, Debug)]
#[command(name = "huddle-daemon")]
#[command(about = "Keeps a local chat cache in sync with the Huddle event server")]
#[command(version)]
struct Args {
    /// WebSocket URL of the event server
    #[arg(short, long, default_value = "ws://localhost:5000/socket")]
    server: String,

    /// Base URL of the dashboard API
    #[arg(short, long, default_value = "http://localhost:5000/api")]
    api: String,

    /// Bearer token for the dashboard API
    #[arg(long, env = "HUDDLE_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Role the user is acting in (student, teacher)
    #[arg(short, long, default_value = "student")]
    role: Role,

    /// Path to the persisted messaging preference (JSON)
    #[arg(short, long, default_value = "huddle-preference.json")]
    preference: PathBuf,

    /// Enable synchronization regardless of the persisted preference
    #[arg(long)]
    force_enable: bool,

    /// Do not read commands from stdin
    #[arg(long)]
    no_stdin: bool,

    /// Runtime tick interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(role = %args.role, server = %args.server, "Huddle daemon starting");

    let config = DaemonConfig {
        server_url: args.server,
        api_url: args.api,
        api_token: args.token,
        preference_path: args.preference,
        force_enable: args.force_enable,
        read_stdin: !args.no_stdin,
        tick_interval: Duration::from_millis(args.tick_ms.max(1)),
        sync: SyncConfig { role: args.role, ..SyncConfig::default() },
    };

    huddle_daemon::run(config).await?;

    tracing::info!("Huddle daemon stopped");
    Ok(())
}

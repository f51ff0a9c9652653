//! Huddle headless sync daemon.
//!
//! Production glue around the Sans-IO sync engine: a WebSocket event channel
//! (tokio-tungstenite), the dashboard HTTP API (reqwest), the real clock, and
//! line commands on stdin standing in for the dashboard UI.
//!
//! # Components
//!
//! - [`DaemonDriver`]: [`huddle_app::Driver`] over real I/O
//! - [`ApiClient`]: conversation list fetches
//! - [`SyncPreference`]: persisted "messaging enabled" flag
//! - [`run`]: composition root wiring everything into a
//!   [`huddle_app::Runtime`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod commands;
mod driver;
mod error;
mod preference;

use std::{path::PathBuf, time::Duration};

pub use api::ApiClient;
pub use commands::parse_command;
pub use driver::DaemonDriver;
pub use error::DaemonError;
use huddle_app::{DEFAULT_TICK_INTERVAL, DriverEvent, Runtime, SystemEnv};
use huddle_client::{SyncConfig, SyncEvent};
use huddle_core::MemoryCache;
pub use preference::SyncPreference;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};

/// Host inputs buffered between the input tasks and the runtime.
const INPUT_CAPACITY: usize = 64;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// WebSocket URL of the event server.
    pub server_url: String,
    /// Base URL of the dashboard HTTP API.
    pub api_url: String,
    /// Bearer token for the API.
    pub api_token: Option<String>,
    /// Path of the persisted preference file.
    pub preference_path: PathBuf,
    /// Enable regardless of the persisted preference.
    pub force_enable: bool,
    /// Read line commands from stdin.
    pub read_stdin: bool,
    /// Runtime tick interval.
    pub tick_interval: Duration,
    /// Engine configuration.
    pub sync: SyncConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:5000/socket".to_string(),
            api_url: "http://localhost:5000/api".to_string(),
            api_token: None,
            preference_path: PathBuf::from("huddle-preference.json"),
            force_enable: false,
            read_stdin: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            sync: SyncConfig::default(),
        }
    }
}

/// Validate `server_url` as a WebSocket URL.
fn check_server_url(server_url: &str) -> Result<(), DaemonError> {
    let url = url::Url::parse(server_url).map_err(|e| DaemonError::InvalidUrl {
        url: server_url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(DaemonError::InvalidUrl {
            url: server_url.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(())
}

/// Run the daemon until interrupted or told to quit.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the runtime fails
/// to render an alert. Connection and API failures are retried, not
/// returned.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    check_server_url(&config.server_url)?;
    let api = ApiClient::new(&config.api_url, config.api_token.clone())?;
    let preference = SyncPreference::load(&config.preference_path)?;

    let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_CAPACITY);
    spawn_interrupt_listener(inputs_tx.clone());
    if config.read_stdin {
        spawn_stdin_reader(inputs_tx);
    }

    let driver = DaemonDriver::new(config.server_url.clone(), api, inputs_rx);
    let mut runtime = Runtime::new(driver, SystemEnv::new(), MemoryCache::new(), config.sync)
        .with_tick_interval(config.tick_interval);

    if preference.enabled || config.force_enable {
        info!(forced = !preference.enabled, "messaging enabled");
        runtime.dispatch(SyncEvent::Enable).await?;
    } else {
        info!("messaging disabled, waiting for `enable`");
    }

    runtime.run().await
}

fn spawn_interrupt_listener(inputs: mpsc::Sender<DriverEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            let _ = inputs.send(DriverEvent::Shutdown).await;
        }
    });
}

fn spawn_stdin_reader(inputs: mpsc::Sender<DriverEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(event)) => {
                        if inputs.send(event).await.is_err() {
                            break;
                        }
                    },
                    Ok(None) => {},
                    Err(msg) => warn!("{msg}"),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                },
            }
        }
    });
}

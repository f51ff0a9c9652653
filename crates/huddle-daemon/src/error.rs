//! Daemon error types.

use std::path::PathBuf;

use huddle_core::TransportError;

/// Errors that can occur in the daemon.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Preference file exists but could not be read.
    #[error("failed to read preference file {path}: {source}")]
    PreferenceIo {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Preference file is not valid JSON for a [`crate::SyncPreference`].
    #[error("invalid preference file {path}: {source}")]
    PreferenceFormat {
        /// Path that was read.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A configured URL is malformed or uses the wrong scheme.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// HTTP request to the API failed before a response arrived, or the
    /// response body could not be decoded.
    #[error("api request failed: {0}")]
    Api(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("api returned {status} for {url}")]
    ApiStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Event channel failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DaemonError {
    /// Whether retrying the failed operation later may succeed.
    ///
    /// Configuration errors are fatal; network errors and server-side
    /// statuses are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(_) => true,
            Self::ApiStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(err) => err.is_transient(),
            Self::PreferenceIo { .. } | Self::PreferenceFormat { .. } | Self::InvalidUrl { .. } => {
                false
            },
        }
    }
}

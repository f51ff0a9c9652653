//! Persisted "messaging enabled" flag.
//!
//! The flag outlives a session and is owned by whoever toggles messaging in
//! the dashboard. The daemon only reads it, once, at startup.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::DaemonError;

/// Whether synchronization should start enabled.
///
/// A missing file means disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPreference {
    /// Messaging is switched on.
    #[serde(default)]
    pub enabled: bool,
}

impl SyncPreference {
    /// Load the preference from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no preference file, messaging disabled");
                return Ok(Self::default());
            },
            Err(source) => {
                return Err(DaemonError::PreferenceIo { path: path.to_path_buf(), source });
            },
        };

        serde_json::from_str(&text)
            .map_err(|source| DaemonError::PreferenceFormat { path: path.to_path_buf(), source })
    }
}

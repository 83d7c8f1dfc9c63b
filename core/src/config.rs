// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::{Path, PathBuf};

use davsync_carddav::CardDavConfig;

use crate::policy::ConflictStrategy;

/// The name of the davsync application.
pub const APP_NAME: &str = "davsync";

/// File name of the local database inside the state directory.
pub const DATABASE_NAME: &str = "davsync.db";

/// Configuration for the davsync application.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// The remote address book and how to reach it.
    pub remote: CardDavConfig,

    /// Sync behaviour.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Normalize the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote settings are invalid or the state
    /// directory cannot be expanded.
    pub fn normalize(&mut self) -> Result<(), Box<dyn Error>> {
        self.remote.validate()?;

        match &self.sync.state_dir {
            Some(a) => {
                self.sync.state_dir = Some(
                    expand_path(a)
                        .map_err(|e| format!("Failed to expand state directory path: {e}"))?,
                );
            }

            None => match get_state_dir() {
                Ok(a) => self.sync.state_dir = Some(a.join(APP_NAME)),
                Err(e) => tracing::warn!(err = %e, "failed to get state directory"),
            },
        }

        self.sync.max_in_flight = self.sync.max_in_flight.max(1);
        self.sync.multiget_batch_size = self.sync.multiget_batch_size.max(1);
        Ok(())
    }

    /// Path of the SQLite database, `None` to keep everything in memory.
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        self.sync.state_dir.as_ref().map(|dir| dir.join(DATABASE_NAME))
    }
}

/// Sync behaviour, the `[sync]` table.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    /// Directory for the local database. Defaults to `$XDG_STATE_HOME/davsync`.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Maximum number of remote requests in flight.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Number of hrefs per multiget request.
    #[serde(default = "default_multiget_batch_size")]
    pub multiget_batch_size: usize,

    /// How conflicts are resolved.
    #[serde(default)]
    pub conflict: ConflictStrategy,
}

impl SyncConfig {
    #[must_use]
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            max_in_flight: self.max_in_flight,
            multiget_batch_size: self.multiget_batch_size,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            max_in_flight: default_max_in_flight(),
            multiget_batch_size: default_multiget_batch_size(),
            conflict: ConflictStrategy::default(),
        }
    }
}

/// Tuning knobs of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum number of remote requests in flight.
    pub max_in_flight: usize,
    /// Number of hrefs per body fetch.
    pub multiget_batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            multiget_batch_size: default_multiget_batch_size(),
        }
    }
}

const fn default_max_in_flight() -> usize {
    4
}

const fn default_multiget_batch_size() -> usize {
    10
}

/// Handle tilde (~) and environment variables in the path
fn expand_path(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path.to_str().ok_or("Invalid path")?;

    // Handle tilde and home directory
    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    // Handle state directories
    let state_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_STATE_HOME/", "${XDG_STATE_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in state_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_state_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

fn get_home_dir() -> Result<PathBuf, Box<dyn Error>> {
    dirs::home_dir().ok_or_else(|| "User-specific home directory not found".into())
}

fn get_state_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_local_dir();
    state_dir.ok_or_else(|| "User-specific state directory not found".into())
}

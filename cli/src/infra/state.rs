//! Infrastructure implementation of the `DeviceStateStore` port.
//!
//! `StateManager` keeps the device record in `~/.metalctl/state.json`. Loads
//! and saves run on the blocking pool; saves go through a temp file and a
//! rename so an interrupted write never leaves a truncated record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::DeviceStateStore;
use crate::domain::DeviceRecord;

/// State file manager.
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    /// Create a state manager using the default path (`~/.metalctl/state.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".metalctl").join("state.json")))
    }

    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(path: &Path) -> Result<Option<DeviceRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        let record: DeviceRecord = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        if let Some(id) = record.device_id() {
            anyhow::ensure!(
                !id.contains(['/', '?', '#']) && !id.chars().any(char::is_whitespace),
                "state file {} holds an invalid device id: {id:?}",
                path.display()
            );
        }
        Ok(Some(record))
    }

    fn save_sync(path: &Path, record: &DeviceRecord) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(record).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;
        Ok(())
    }
}

impl DeviceStateStore for StateManager {
    async fn load_async(&self) -> Result<Option<DeviceRecord>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save_async(&self, record: &DeviceRecord) -> Result<()> {
        let path = self.path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &record))
            .await
            .context("state save task panicked")?
    }
}

use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths::settings_path;
use crate::settings::Settings;

/// Load-on-start, save-on-change persistence for [`Settings`].
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Settings>;
    fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

/// Stores settings as pretty-printed JSON in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn at_default_location() -> anyhow::Result<Self> {
        Ok(Self::new(settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> anyhow::Result<Settings> {
        if !self.path.exists() {
            debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let data = serde_json::to_vec_pretty(settings)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Keeps settings in memory only. Useful for hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<Settings>>,
}

impl MemoryStore {
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(Some(settings)),
        }
    }

    /// Last saved value, if any.
    pub fn saved(&self) -> Option<Settings> {
        self.inner.lock().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> anyhow::Result<Settings> {
        Ok(self.inner.lock().clone().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        *self.inner.lock() = Some(settings.clone());
        Ok(())
    }
}

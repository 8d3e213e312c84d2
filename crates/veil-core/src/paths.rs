use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "dev";
pub const APP_ORG: &str = "veil";
pub const APP_NAME: &str = "veil";

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "VEIL_SETTINGS";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var(SETTINGS_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("settings.json"))
}

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilError};

/// What happens to protected panes when the workspace locks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrivacyMode {
    #[default]
    #[serde(rename = "blur")]
    Blur,
    #[serde(rename = "close")]
    Close,
    #[serde(rename = "")]
    None,
}

/// Persisted configuration of the privacy lock.
///
/// Keys are camelCase so an existing plugin data file loads unchanged; any
/// key missing from the file falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_lock_minutes: f64,
    pub privacy_mode: PrivacyMode,
    pub protected_paths: Vec<String>,
    pub hint: String,
    pub password: String,
    pub block_graph_view: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_lock_minutes: 15.0,
            privacy_mode: PrivacyMode::Blur,
            protected_paths: vec!["/".into()],
            hint: String::new(),
            password: String::new(),
            block_graph_view: false,
        }
    }
}

impl Settings {
    /// Locking is only active once a password has been set.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.auto_lock_minutes.is_finite() || self.auto_lock_minutes < 0.0 {
            return Err(VeilError::InvalidSettings(
                "auto lock minutes must be a finite number >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Replaces the password. The current one must be supplied whenever a
    /// password is already set.
    pub fn change_password(&mut self, current: Option<&str>, new_password: &str) -> Result<()> {
        self.verify_current(current)?;
        if new_password.is_empty() {
            return Err(VeilError::InvalidSettings(
                "new password must not be empty".into(),
            ));
        }
        self.password = new_password.to_string();
        Ok(())
    }

    /// Removes the password, which disables locking altogether.
    pub fn clear_password(&mut self, current: &str) -> Result<()> {
        self.verify_current(Some(current))?;
        self.password.clear();
        Ok(())
    }

    fn verify_current(&self, current: Option<&str>) -> Result<()> {
        if self.has_password() && current != Some(self.password.as_str()) {
            return Err(VeilError::WrongPassword);
        }
        Ok(())
    }
}

use zeroize::Zeroizing;

use crate::settings::Settings;

/// Failed attempts tolerated before the hint is revealed.
pub const HINT_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Accepted,
    Rejected {
        failures: u32,
        /// Present once more than [`HINT_AFTER_FAILURES`] attempts failed
        /// and a hint is configured.
        hint: Option<String>,
    },
}

/// Checks typed passwords against the configured one.
///
/// This is a UI gate, not key derivation: documents stay plaintext on disk.
pub struct PasswordGate {
    expected: Zeroizing<String>,
    hint: String,
    failures: u32,
}

impl PasswordGate {
    pub fn new(settings: &Settings) -> Self {
        Self {
            expected: Zeroizing::new(settings.password.clone()),
            hint: settings.hint.clone(),
            failures: 0,
        }
    }

    pub fn try_password(&mut self, candidate: &str) -> Attempt {
        if !self.expected.is_empty() && candidate == self.expected.as_str() {
            return Attempt::Accepted;
        }
        self.failures = self.failures.saturating_add(1);
        Attempt::Rejected {
            failures: self.failures,
            hint: self.visible_hint().map(str::to_string),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn visible_hint(&self) -> Option<&str> {
        if self.failures > HINT_AFTER_FAILURES && !self.hint.is_empty() {
            Some(&self.hint)
        } else {
            None
        }
    }
}

/// Gate in front of the sensitive part of the settings panel.
///
/// Starts locked. It cannot be opened while no password is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsLock {
    locked: bool,
}

impl Default for SettingsLock {
    fn default() -> Self {
        Self { locked: true }
    }
}

impl SettingsLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the unlock control should be offered at all.
    pub fn is_available(settings: &Settings) -> bool {
        settings.has_password()
    }

    pub fn unlock(&mut self, settings: &Settings, candidate: &str) -> bool {
        if !Self::is_available(settings) {
            return false;
        }
        if PasswordGate::new(settings).try_password(candidate) == Attempt::Accepted {
            self.locked = false;
        }
        !self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }
}

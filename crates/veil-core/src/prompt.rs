use std::fmt;
use std::sync::Weak;
use tracing::debug;
use uuid::Uuid;

use crate::guard::{Guard, GuardInner};
use crate::password::{Attempt, PasswordGate};
use crate::settings::{PrivacyMode, Settings};
use crate::surface::ProtectedSurface;

/// A pending request for the user's password.
///
/// Handed to the [`PasswordPrompt`](crate::host::PasswordPrompt) collaborator.
/// Resolving consumes the request, so it completes at most once; dropping it
/// unresolved counts as a cancelled prompt, so it completes at least once.
pub struct UnlockRequest {
    id: Uuid,
    surfaces: Vec<ProtectedSurface>,
    privacy_mode: PrivacyMode,
    gate: PasswordGate,
    completion: PromptCompletion,
}

impl UnlockRequest {
    pub(crate) fn new(
        guard: Weak<GuardInner>,
        ticket: u64,
        surfaces: Vec<ProtectedSurface>,
        settings: &Settings,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            surfaces: surfaces.clone(),
            privacy_mode: settings.privacy_mode,
            gate: PasswordGate::new(settings),
            completion: PromptCompletion {
                guard,
                ticket,
                surfaces,
                resolved: false,
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Surfaces hidden behind this prompt.
    pub fn surfaces(&self) -> &[ProtectedSurface] {
        &self.surfaces
    }

    /// Prompts render a blurred backdrop in [`PrivacyMode::Blur`].
    pub fn privacy_mode(&self) -> PrivacyMode {
        self.privacy_mode
    }

    pub fn try_password(&mut self, candidate: &str) -> Attempt {
        self.gate.try_password(candidate)
    }

    pub fn hint(&self) -> Option<&str> {
        self.gate.visible_hint()
    }

    /// Checks `candidate` and resolves successfully if it matches. On a
    /// mismatch the request is handed back for another attempt.
    pub fn submit(mut self, candidate: &str) -> Result<(), (Self, Attempt)> {
        match self.gate.try_password(candidate) {
            Attempt::Accepted => {
                self.resolve(true);
                Ok(())
            }
            rejected => Err((self, rejected)),
        }
    }

    pub fn resolve(mut self, success: bool) {
        self.completion.fire(success);
    }

    pub fn cancel(self) {
        self.resolve(false);
    }
}

impl fmt::Debug for UnlockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockRequest")
            .field("id", &self.id)
            .field("surfaces", &self.surfaces)
            .field("privacy_mode", &self.privacy_mode)
            .finish_non_exhaustive()
    }
}

struct PromptCompletion {
    guard: Weak<GuardInner>,
    ticket: u64,
    surfaces: Vec<ProtectedSurface>,
    resolved: bool,
}

impl PromptCompletion {
    fn fire(&mut self, success: bool) {
        if self.resolved {
            return;
        }
        self.resolved = true;
        let surfaces = std::mem::take(&mut self.surfaces);
        match self.guard.upgrade() {
            Some(inner) => Guard::from_inner(inner).complete(self.ticket, success, surfaces),
            None => debug!("Prompt resolved after guard was dropped"),
        }
    }
}

impl Drop for PromptCompletion {
    fn drop(&mut self) {
        self.fire(false);
    }
}

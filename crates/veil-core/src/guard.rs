//! The lock state machine and the context that ties the components together.
//!
//! A [`Guard`] is a cheap cloneable handle. Collaborators are always called
//! with no internal lock held, so a collaborator that synchronously calls
//! back into the guard (a detach that fires a UI mutation, a prompt that
//! resolves immediately) sees a consistent state.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::autolock::AutolockScheduler;
use crate::error::{Result, VeilError};
use crate::host::{Host, HostEvent, Notice};
use crate::leak::{LeakAction, LeakMonitor, UiObservation};
use crate::lock_state::{LockSnapshot, LockState};
use crate::path_matcher::{suggest_folders, PathMatcher};
use crate::prompt::UnlockRequest;
use crate::search::{ResultFilter, SearchInterceptor};
use crate::settings::{PrivacyMode, Settings};
use crate::surface::{ProtectedSurface, SurfaceClassifier, SurfaceKind};

pub(crate) struct GuardInner {
    host: Host,
    settings: RwLock<Settings>,
    matcher: RwLock<PathMatcher>,
    state: Mutex<LockState>,
    autolock: AutolockScheduler,
    leak: LeakMonitor,
    search: SearchInterceptor,
    search_filter: Arc<dyn ResultFilter>,
    shut_down: AtomicBool,
}

impl GuardInner {
    fn hides(&self, path: &str) -> bool {
        self.settings.read().has_password()
            && self.state.lock().is_locked()
            && self.matcher.read().is_protected(path)
    }
}

/// Hides protected results while locked. Holds the guard weakly so a search
/// pane outliving the guard simply stops filtering.
struct LockFilter(Weak<GuardInner>);

impl ResultFilter for LockFilter {
    fn hides(&self, path: &str) -> bool {
        self.0.upgrade().is_some_and(|inner| inner.hides(path))
    }
}

#[derive(Clone)]
pub struct Guard {
    inner: Arc<GuardInner>,
}

impl Guard {
    /// Builds a guard from explicit settings. Must be called inside a tokio
    /// runtime, which drives the autolock timer.
    pub fn new(settings: Settings, host: Host) -> Result<Self> {
        settings.validate()?;
        let runtime = Handle::try_current().map_err(|_| VeilError::NoRuntime)?;
        let state = if settings.has_password() {
            LockState::locked()
        } else {
            LockState::unlocked()
        };
        let matcher = PathMatcher::new(&settings.protected_paths);
        let inner = Arc::new_cyclic(|weak: &Weak<GuardInner>| GuardInner {
            host,
            settings: RwLock::new(settings),
            matcher: RwLock::new(matcher),
            state: Mutex::new(state),
            autolock: AutolockScheduler::new(runtime),
            leak: LeakMonitor::new(),
            search: SearchInterceptor::new(),
            search_filter: Arc::new(LockFilter(weak.clone())),
            shut_down: AtomicBool::new(false),
        });
        Ok(Self { inner })
    }

    /// Builds a guard from the settings the host's store holds.
    pub fn load(host: Host) -> Result<Self> {
        let settings = host.store.load().map_err(VeilError::Persistence)?;
        Self::new(settings, host)
    }

    pub(crate) fn from_inner(inner: Arc<GuardInner>) -> Self {
        Self { inner }
    }

    /// Brings the guard online: hooks every open search pane and, when a
    /// password is set, locks so panes restored from the last session are
    /// caught straight away.
    pub fn start(&self) {
        info!("Privacy lock starting");
        let locked = self.is_locked();
        self.inner.host.status.set_lock_indicator(locked);
        self.sync_search();
        self.lock(false, Vec::new());
    }

    /// Cancels the timer, stops leak detection and unhooks search panes.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Privacy lock shutting down");
        self.inner.autolock.cancel();
        self.inner.leak.disconnect();
        self.inner.search.detach_all(self.inner.host.search.as_ref());
    }

    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.state.lock().is_locked()
    }

    pub fn is_locking(&self) -> bool {
        self.inner.state.lock().is_locking()
    }

    pub fn status(&self) -> LockSnapshot {
        let armed = self.inner.autolock.is_armed();
        self.inner.state.lock().snapshot(armed)
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.inner.matcher.read().is_protected(path)
    }

    /// Folders offered while editing the protected-path list.
    pub fn suggest_paths(&self, query: &str) -> Vec<String> {
        let folders = self.inner.host.workspace.folders();
        suggest_folders(query, &folders)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn classify_open_surfaces(&self) -> Vec<ProtectedSurface> {
        let panes = self.inner.host.workspace.panes();
        let matcher = self.inner.matcher.read().clone();
        let block_graph_view = self.inner.settings.read().block_graph_view;
        SurfaceClassifier::new(&matcher, block_graph_view).classify(&panes)
    }

    /// Locks the workspace and, if anything needs hiding or `force_prompt`
    /// is set, asks for the password.
    ///
    /// Returns as soon as the prompt has been requested; the outcome arrives
    /// later through the prompt's completion.
    pub fn lock(&self, force_prompt: bool, extra_surfaces: Vec<ProtectedSurface>) {
        if self.is_shut_down() {
            return;
        }
        if !self.inner.settings.read().has_password() {
            debug!("No password configured, lock ignored");
            return;
        }
        if !self.inner.state.lock().begin_lock() {
            debug!("Lock already in progress, ignoring nested lock");
            return;
        }
        self.inner.host.status.set_lock_indicator(true);
        self.inner.autolock.cancel();
        self.inner.search.refresh(self.inner.host.search.as_ref());

        let mut surfaces = merge_surfaces(extra_surfaces, self.classify_open_surfaces());
        if !force_prompt && surfaces.is_empty() {
            self.inner.state.lock().abandon();
            debug!("Locked with nothing open to protect");
            return;
        }

        let settings = self.settings();
        info!(
            "Locking {} protected surface(s), privacy mode {:?}",
            surfaces.len(),
            settings.privacy_mode
        );
        if settings.privacy_mode == PrivacyMode::Close {
            // only what was actually closed is reopened on unlock
            surfaces.retain(|surface| {
                let detached = self.inner.host.workspace.detach(surface.pane);
                if !detached {
                    debug!("Pane {:?} already gone", surface.pane);
                }
                detached
            });
        }

        let ticket = self.inner.state.lock().issue_ticket();
        self.prompt(ticket, surfaces, &settings);
    }

    /// The lock command and the lock URI handler.
    pub fn lock_now(&self) {
        self.lock(false, Vec::new());
    }

    /// Lock icon: asks for the password when locked, locks when unlocked.
    pub fn toggle(&self) {
        if self.is_locked() {
            self.request_unlock();
        } else {
            self.lock(false, Vec::new());
        }
    }

    /// Prompts for the password without hiding anything further.
    pub fn request_unlock(&self) {
        if self.is_shut_down() || !self.inner.settings.read().has_password() {
            return;
        }
        let Some(ticket) = self.inner.state.lock().begin_unlock() else {
            debug!("Unlock not possible right now");
            return;
        };
        let settings = self.settings();
        self.prompt(ticket, Vec::new(), &settings);
    }

    fn prompt(&self, ticket: u64, surfaces: Vec<ProtectedSurface>, settings: &Settings) {
        let request = UnlockRequest::new(Arc::downgrade(&self.inner), ticket, surfaces, settings);
        debug!("Password requested ({})", request.id());
        self.inner.host.prompt.request(request);
    }

    pub(crate) fn complete(&self, ticket: u64, success: bool, surfaces: Vec<ProtectedSurface>) {
        if !self.inner.state.lock().finish(ticket, success) {
            debug!("Ignoring completion of stale prompt {}", ticket);
            return;
        }
        if self.is_shut_down() {
            return;
        }
        let (mode, disabled) = {
            let settings = self.inner.settings.read();
            (settings.privacy_mode, !settings.has_password())
        };
        let workspace = &self.inner.host.workspace;

        if disabled {
            // password removed while the prompt was open
            self.inner.state.lock().disable();
        }
        if success || disabled {
            info!("Unlocked");
            self.inner.host.status.set_lock_indicator(false);
            self.inner.leak.forget_embeds();
            self.reset_autolock();
            if success {
                self.inner.host.status.notify(Notice::Unlocked);
            }
            if mode == PrivacyMode::Close {
                for surface in &surfaces {
                    let reopened = match &surface.kind {
                        SurfaceKind::File { path } => workspace.open_file(path),
                        SurfaceKind::GraphView => workspace.open_graph(),
                    };
                    if reopened.is_none() {
                        debug!("Could not reopen {:?}", surface.kind);
                    }
                }
            }
            self.inner.search.refresh(self.inner.host.search.as_ref());
        } else {
            info!("Password prompt cancelled, staying locked");
            self.inner.host.status.notify(Notice::PromptCancelled);
            if mode == PrivacyMode::Blur {
                for surface in &surfaces {
                    if workspace.is_attached(surface.pane) {
                        workspace.detach(surface.pane);
                    }
                }
            }
        }
    }

    /// Re-arms the inactivity timer from the current settings.
    pub fn reset_autolock(&self) {
        if self.is_shut_down() || !self.inner.settings.read().has_password() {
            return;
        }
        let minutes = self.inner.settings.read().auto_lock_minutes;
        let weak = Arc::downgrade(&self.inner);
        self.inner.autolock.reset(minutes, move || {
            if let Some(inner) = weak.upgrade() {
                info!("Inactivity timeout reached");
                Guard::from_inner(inner).lock(false, Vec::new());
            }
        });
    }

    pub fn cancel_autolock(&self) {
        self.inner.autolock.cancel();
    }

    pub fn handle(&self, event: HostEvent) {
        if self.is_shut_down() {
            return;
        }
        match event {
            HostEvent::StoreChanged(change) => {
                let idle_unlocked = {
                    let state = self.inner.state.lock();
                    !state.is_locked() && !state.is_locking()
                };
                if idle_unlocked {
                    debug!("Store activity {:?}, autolock reset", change);
                    self.reset_autolock();
                }
            }
            HostEvent::LayoutChanged => self.sync_search(),
            HostEvent::FileOpened { path } => {
                if self.is_locked() && self.is_protected(&path) {
                    self.lock(false, Vec::new());
                }
            }
            HostEvent::LinkHovered { link, source_path } => {
                self.inner.leak.record_hover(&link, &source_path);
            }
            HostEvent::UiMutated(observation) => self.on_ui_mutated(&observation),
            HostEvent::SearchQueryChanged(id) => {
                self.inner.search.rewrap(
                    self.inner.host.search.as_ref(),
                    id,
                    &self.inner.search_filter,
                );
            }
        }
    }

    fn sync_search(&self) {
        self.inner
            .search
            .sync(self.inner.host.search.as_ref(), &self.inner.search_filter);
    }

    fn on_ui_mutated(&self, observation: &UiObservation) {
        {
            let state = self.inner.state.lock();
            if !state.is_locked() || state.is_locking() {
                return;
            }
        }
        let matcher = self.inner.matcher.read().clone();
        let action = self.inner.leak.observe(
            observation,
            self.inner.host.workspace.as_ref(),
            &matcher,
        );
        match action {
            Some(LeakAction::LockForEmbed { host }) => {
                info!("Protected embed detected, locking");
                let extra = host
                    .and_then(|id| self.inner.host.workspace.pane(id))
                    .and_then(|pane| ProtectedSurface::from_pane(&pane));
                self.lock(true, extra.into_iter().collect());
            }
            Some(LeakAction::SuppressPreview { preview }) => {
                info!("Protected hover preview detected, locking");
                if !self.inner.host.ui.remove_preview(preview) {
                    debug!("Preview {:?} already gone", preview);
                }
                self.lock(true, Vec::new());
            }
            None => {}
        }
    }

    /// Validates, persists, then applies new settings.
    pub fn update_settings<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let mut next = self.settings();
        edit(&mut next)?;
        next.validate()?;
        self.inner
            .host
            .store
            .save(&next)
            .map_err(VeilError::Persistence)?;
        let matcher = PathMatcher::new(&next.protected_paths);
        let had_password = self.inner.settings.read().has_password();
        let has_password = next.has_password();
        *self.inner.settings.write() = next;
        *self.inner.matcher.write() = matcher;

        if had_password && !has_password {
            warn!("Password removed, privacy lock disabled");
            self.inner.autolock.cancel();
            // a pending prompt finishes the job when it resolves
            if self.inner.state.lock().disable() {
                self.inner.host.status.set_lock_indicator(false);
            }
            self.inner.search.refresh(self.inner.host.search.as_ref());
        }
        Ok(())
    }

    pub fn set_auto_lock_minutes(&self, minutes: f64) -> Result<()> {
        self.update_settings(|s| {
            s.auto_lock_minutes = minutes;
            Ok(())
        })?;
        if !self.is_locked() {
            self.reset_autolock();
        }
        Ok(())
    }

    pub fn set_privacy_mode(&self, mode: PrivacyMode) -> Result<()> {
        self.update_settings(|s| {
            s.privacy_mode = mode;
            Ok(())
        })
    }

    pub fn set_protected_paths(&self, paths: Vec<String>) -> Result<()> {
        self.update_settings(|s| {
            s.protected_paths = paths;
            Ok(())
        })?;
        self.inner.search.refresh(self.inner.host.search.as_ref());
        Ok(())
    }

    pub fn set_hint(&self, hint: &str) -> Result<()> {
        self.update_settings(|s| {
            s.hint = hint.to_string();
            Ok(())
        })
    }

    pub fn set_block_graph_view(&self, block: bool) -> Result<()> {
        self.update_settings(|s| {
            s.block_graph_view = block;
            Ok(())
        })
    }

    pub fn change_password(&self, current: Option<&str>, new_password: &str) -> Result<()> {
        self.update_settings(|s| s.change_password(current, new_password))?;
        if !self.is_locked() {
            self.reset_autolock();
        }
        Ok(())
    }

    pub fn clear_password(&self, current: &str) -> Result<()> {
        self.update_settings(|s| s.clear_password(current))
    }
}

/// `extra` followed by `classified`, each pane kept once.
fn merge_surfaces(
    extra: Vec<ProtectedSurface>,
    classified: Vec<ProtectedSurface>,
) -> Vec<ProtectedSurface> {
    let mut seen = HashSet::new();
    extra
        .into_iter()
        .chain(classified)
        .filter(|surface| seen.insert(surface.pane))
        .collect()
}

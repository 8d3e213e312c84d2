//! Suppression of protected results in the host's search panes.
//!
//! Each search surface evaluates candidates through a [`MatchFn`]. Attaching
//! swaps in a wrapper that refuses protected paths while the workspace is
//! locked and otherwise defers to the original; detaching puts the original
//! back. The query itself is never touched.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchSurfaceId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub ranges: Vec<Range<usize>>,
}

pub type MatchFn = Arc<dyn Fn(&SearchCandidate) -> Option<SearchHit> + Send + Sync>;

/// Access to the host's open search panes.
pub trait SearchHost: Send + Sync {
    fn search_surfaces(&self) -> Vec<SearchSurfaceId>;
    fn match_fn(&self, id: SearchSurfaceId) -> Option<MatchFn>;
    /// Returns `false` if the surface no longer exists.
    fn set_match_fn(&self, id: SearchSurfaceId, matcher: MatchFn) -> bool;
    fn restart_search(&self, id: SearchSurfaceId);
}

/// Decides, per evaluation, whether a path must be hidden.
pub trait ResultFilter: Send + Sync {
    fn hides(&self, path: &str) -> bool;
}

struct Interception {
    original: MatchFn,
    installed: MatchFn,
}

#[derive(Default)]
pub struct SearchInterceptor {
    attached: Mutex<HashMap<SearchSurfaceId, Interception>>,
}

fn wrap(original: MatchFn, filter: Arc<dyn ResultFilter>) -> MatchFn {
    Arc::new(move |candidate: &SearchCandidate| {
        if filter.hides(&candidate.path) {
            None
        } else {
            original(candidate)
        }
    })
}

fn same_fn(a: &MatchFn, b: &MatchFn) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl SearchInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, id: SearchSurfaceId) -> bool {
        self.attached.lock().contains_key(&id)
    }

    pub fn attached(&self) -> Vec<SearchSurfaceId> {
        self.attached.lock().keys().copied().collect()
    }

    /// Wraps the surface's match function and re-runs its search. Returns
    /// `false` if it was already wrapped or has vanished.
    pub fn attach(
        &self,
        host: &dyn SearchHost,
        id: SearchSurfaceId,
        filter: &Arc<dyn ResultFilter>,
    ) -> bool {
        if self.is_attached(id) {
            return false;
        }
        let Some(original) = host.match_fn(id) else {
            debug!("Search surface {:?} vanished before attach", id);
            return false;
        };
        let installed = wrap(original.clone(), filter.clone());
        if !host.set_match_fn(id, installed.clone()) {
            debug!("Search surface {:?} refused the wrapped matcher", id);
            return false;
        }
        self.attached
            .lock()
            .insert(id, Interception { original, installed });
        host.restart_search(id);
        true
    }

    /// Restores the original match function and re-runs the search.
    pub fn detach(&self, host: &dyn SearchHost, id: SearchSurfaceId) -> bool {
        let Some(interception) = self.attached.lock().remove(&id) else {
            return false;
        };
        if host.set_match_fn(id, interception.original) {
            host.restart_search(id);
        }
        true
    }

    /// Wraps every current search surface, renewing wrappers the host has
    /// replaced, and forgets the surfaces that are gone.
    pub fn sync(&self, host: &dyn SearchHost, filter: &Arc<dyn ResultFilter>) {
        let live = host.search_surfaces();
        self.attached.lock().retain(|id, _| live.contains(id));
        for id in live {
            if !self.is_attached(id) {
                self.attach(host, id, filter);
            } else if self.rewrap(host, id, filter) {
                host.restart_search(id);
            }
        }
    }

    /// Re-wraps a surface whose host replaced the match function, e.g. for a
    /// new query. Returns `true` if a new wrapper was installed.
    pub fn rewrap(
        &self,
        host: &dyn SearchHost,
        id: SearchSurfaceId,
        filter: &Arc<dyn ResultFilter>,
    ) -> bool {
        if !self.is_attached(id) {
            return self.attach(host, id, filter);
        }
        let Some(current) = host.match_fn(id) else {
            self.attached.lock().remove(&id);
            return false;
        };
        let installed = {
            let mut attached = self.attached.lock();
            let Some(entry) = attached.get_mut(&id) else {
                return false;
            };
            if same_fn(&current, &entry.installed) {
                return false;
            }
            entry.installed = wrap(current.clone(), filter.clone());
            entry.original = current;
            entry.installed.clone()
        };
        host.set_match_fn(id, installed)
    }

    /// Re-runs every wrapped search, e.g. after the lock state changed.
    pub fn refresh(&self, host: &dyn SearchHost) {
        for id in self.attached() {
            host.restart_search(id);
        }
    }

    pub fn detach_all(&self, host: &dyn SearchHost) {
        for id in self.attached() {
            self.detach(host, id);
        }
    }
}

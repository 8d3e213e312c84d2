//! In-memory host used by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use veil_core::host::{PasswordPrompt, StatusSink, UiSurface, Workspace};
use veil_core::search::{MatchFn, SearchCandidate, SearchHit, SearchHost, SearchSurfaceId};
use veil_core::storage::MemoryStore;
use veil_core::{Guard, Host, Notice, Pane, PaneContent, PaneId, PreviewId, Settings, UnlockRequest};

#[derive(Default)]
pub struct FakeWorkspace {
    pub panes: Mutex<Vec<Pane>>,
    pub detached: Mutex<Vec<PaneId>>,
    pub opened: Mutex<Vec<String>>,
    pub links: Mutex<HashMap<String, String>>,
    pub folders: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl FakeWorkspace {
    pub fn open_paths(&self) -> Vec<String> {
        self.panes
            .lock()
            .iter()
            .filter_map(|pane| match &pane.content {
                PaneContent::Document { path } => path.clone(),
                PaneContent::Graph => Some("<graph>".into()),
                _ => None,
            })
            .collect()
    }

    pub fn add(&self, pane: Pane) {
        self.panes.lock().push(pane);
    }

    pub fn link(&self, link: &str, path: &str) {
        self.links.lock().insert(link.into(), path.into());
    }

    fn fresh_id(&self) -> PaneId {
        let mut next = self.next_id.lock();
        *next += 1;
        PaneId(1000 + *next)
    }
}

impl Workspace for FakeWorkspace {
    fn panes(&self) -> Vec<Pane> {
        self.panes.lock().clone()
    }

    fn detach(&self, id: PaneId) -> bool {
        let mut panes = self.panes.lock();
        let before = panes.len();
        panes.retain(|pane| pane.id != id);
        let removed = panes.len() != before;
        drop(panes);
        if removed {
            self.detached.lock().push(id);
        }
        removed
    }

    fn open_file(&self, path: &str) -> Option<PaneId> {
        let id = self.fresh_id();
        self.opened.lock().push(path.to_string());
        self.add(Pane {
            id,
            content: PaneContent::Document {
                path: Some(path.to_string()),
            },
        });
        Some(id)
    }

    fn open_graph(&self) -> Option<PaneId> {
        let id = self.fresh_id();
        self.opened.lock().push("<graph>".into());
        self.add(Pane {
            id,
            content: PaneContent::Graph,
        });
        Some(id)
    }

    fn resolve_link(&self, link: &str, _source_path: &str) -> Option<String> {
        self.links.lock().get(link).cloned()
    }

    fn folders(&self) -> Vec<String> {
        self.folders.lock().clone()
    }
}

/// Holds requests until the test resolves them.
#[derive(Default)]
pub struct FakePrompt {
    pub pending: Mutex<Vec<UnlockRequest>>,
    pub requested: Mutex<usize>,
}

impl FakePrompt {
    pub fn count(&self) -> usize {
        *self.requested.lock()
    }

    pub fn take(&self) -> UnlockRequest {
        self.pending.lock().pop().expect("no pending prompt")
    }

    pub fn resolve(&self, success: bool) {
        self.take().resolve(success);
    }
}

impl PasswordPrompt for FakePrompt {
    fn request(&self, request: UnlockRequest) {
        *self.requested.lock() += 1;
        self.pending.lock().push(request);
    }
}

#[derive(Default)]
pub struct FakeUi {
    pub previews: Mutex<Vec<PreviewId>>,
    pub removed: Mutex<Vec<PreviewId>>,
}

impl UiSurface for FakeUi {
    fn remove_preview(&self, preview: PreviewId) -> bool {
        let mut previews = self.previews.lock();
        let before = previews.len();
        previews.retain(|p| *p != preview);
        let removed = previews.len() != before;
        drop(previews);
        if removed {
            self.removed.lock().push(preview);
        }
        removed
    }
}

#[derive(Default)]
pub struct FakeSearch {
    pub matchers: Mutex<HashMap<SearchSurfaceId, MatchFn>>,
    pub restarts: Mutex<usize>,
}

impl FakeSearch {
    pub fn open(&self, id: u64) {
        let all: MatchFn = Arc::new(|_: &SearchCandidate| Some(SearchHit::default()));
        self.matchers.lock().insert(SearchSurfaceId(id), all);
    }

    pub fn matches(&self, id: u64, path: &str) -> bool {
        let f = self
            .matchers
            .lock()
            .get(&SearchSurfaceId(id))
            .cloned()
            .expect("no such search surface");
        f(&SearchCandidate { path: path.into() }).is_some()
    }
}

impl SearchHost for FakeSearch {
    fn search_surfaces(&self) -> Vec<SearchSurfaceId> {
        self.matchers.lock().keys().copied().collect()
    }

    fn match_fn(&self, id: SearchSurfaceId) -> Option<MatchFn> {
        self.matchers.lock().get(&id).cloned()
    }

    fn set_match_fn(&self, id: SearchSurfaceId, matcher: MatchFn) -> bool {
        match self.matchers.lock().get_mut(&id) {
            Some(slot) => {
                *slot = matcher;
                true
            }
            None => false,
        }
    }

    fn restart_search(&self, _id: SearchSurfaceId) {
        *self.restarts.lock() += 1;
    }
}

#[derive(Default)]
pub struct FakeStatus {
    pub indicator: Mutex<Vec<bool>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl FakeStatus {
    pub fn last_indicator(&self) -> Option<bool> {
        self.indicator.lock().last().copied()
    }
}

impl StatusSink for FakeStatus {
    fn set_lock_indicator(&self, locked: bool) {
        self.indicator.lock().push(locked);
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub struct Harness {
    pub guard: Guard,
    pub workspace: Arc<FakeWorkspace>,
    pub prompt: Arc<FakePrompt>,
    pub ui: Arc<FakeUi>,
    pub search: Arc<FakeSearch>,
    pub status: Arc<FakeStatus>,
    pub store: Arc<MemoryStore>,
}

pub fn settings(password: &str, paths: &[&str]) -> Settings {
    Settings {
        password: password.into(),
        protected_paths: paths.iter().map(|p| p.to_string()).collect(),
        ..Settings::default()
    }
}

/// Builds a guard over fresh fakes. Must run inside a tokio runtime.
pub fn harness(settings: Settings, panes: Vec<Pane>) -> Harness {
    let workspace = Arc::new(FakeWorkspace::default());
    for pane in panes {
        workspace.add(pane);
    }
    let prompt = Arc::new(FakePrompt::default());
    let ui = Arc::new(FakeUi::default());
    let search = Arc::new(FakeSearch::default());
    let status = Arc::new(FakeStatus::default());
    let store = Arc::new(MemoryStore::with_settings(settings));
    let host = Host {
        workspace: workspace.clone(),
        prompt: prompt.clone(),
        ui: ui.clone(),
        search: search.clone(),
        status: status.clone(),
        store: store.clone(),
    };
    let guard = Guard::load(host).expect("guard");
    Harness {
        guard,
        workspace,
        prompt,
        ui,
        search,
        status,
        store,
    }
}

//! Interfaces the host application provides, and the events it feeds in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::leak::UiObservation;
use crate::prompt::UnlockRequest;
use crate::search::{SearchHost, SearchSurfaceId};
use crate::storage::SettingsStore;
use crate::surface::{Pane, PaneId};

/// The host's pane layout and document store.
pub trait Workspace: Send + Sync {
    /// Every open pane, background tabs included.
    fn panes(&self) -> Vec<Pane>;

    fn pane(&self, id: PaneId) -> Option<Pane> {
        self.panes().into_iter().find(|pane| pane.id == id)
    }

    /// Closes a pane. Returns `false` if it no longer exists.
    fn detach(&self, id: PaneId) -> bool;

    fn is_attached(&self, id: PaneId) -> bool {
        self.pane(id).is_some()
    }

    /// Opens a document in a new tab.
    fn open_file(&self, path: &str) -> Option<PaneId>;

    /// Opens a fresh graph overview pane.
    fn open_graph(&self) -> Option<PaneId>;

    /// Resolves link text, as written inside `source_path`, to a document path.
    fn resolve_link(&self, link: &str, source_path: &str) -> Option<String>;

    fn folders(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Renders the password prompt. Must eventually resolve or drop the
/// request's completion handle.
pub trait PasswordPrompt: Send + Sync {
    fn request(&self, request: UnlockRequest);
}

/// Opaque handle of a transient hover preview in the UI tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewId(pub u64);

pub trait UiSurface: Send + Sync {
    /// Removes a hover preview. Returns `false` if it is already gone.
    fn remove_preview(&self, preview: PreviewId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Unlocked,
    PromptCancelled,
}

/// Lock indicator and user notices.
pub trait StatusSink: Send + Sync {
    fn set_lock_indicator(&self, locked: bool);
    fn notify(&self, notice: Notice);
}

/// Document-store mutation kinds that count as activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreChange {
    Created(String),
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

/// Everything the host reports to the guard.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    StoreChanged(StoreChange),
    LayoutChanged,
    FileOpened { path: String },
    LinkHovered { link: String, source_path: String },
    UiMutated(UiObservation),
    SearchQueryChanged(SearchSurfaceId),
}

/// The collaborators a guard is wired to.
#[derive(Clone)]
pub struct Host {
    pub workspace: Arc<dyn Workspace>,
    pub prompt: Arc<dyn PasswordPrompt>,
    pub ui: Arc<dyn UiSurface>,
    pub search: Arc<dyn SearchHost>,
    pub status: Arc<dyn StatusSink>,
    pub store: Arc<dyn SettingsStore>,
}

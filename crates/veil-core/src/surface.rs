use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::path_matcher::PathMatcher;

/// Host-assigned identifier of an open pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaneId(pub u64);

/// What an open pane is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaneContent {
    /// A document view. `path` is `None` while the pane is mid-transition
    /// (a closing tab, a view still loading).
    Document { path: Option<String> },
    Graph,
    Search,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    pub id: PaneId,
    pub content: PaneContent,
}

impl Pane {
    pub fn document(id: u64, path: &str) -> Self {
        Self {
            id: PaneId(id),
            content: PaneContent::Document {
                path: Some(path.to_string()),
            },
        }
    }

    pub fn graph(id: u64) -> Self {
        Self {
            id: PaneId(id),
            content: PaneContent::Graph,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceKind {
    File { path: String },
    GraphView,
}

/// A pane that must be hidden while locked. Lives for one lock operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedSurface {
    pub pane: PaneId,
    pub kind: SurfaceKind,
}

impl ProtectedSurface {
    pub fn file(pane: PaneId, path: impl Into<String>) -> Self {
        Self {
            pane,
            kind: SurfaceKind::File { path: path.into() },
        }
    }

    pub fn graph(pane: PaneId) -> Self {
        Self {
            pane,
            kind: SurfaceKind::GraphView,
        }
    }

    /// The protected surface a pane represents on its own, ignoring policy.
    pub fn from_pane(pane: &Pane) -> Option<Self> {
        match &pane.content {
            PaneContent::Document { path: Some(path) } => Some(Self::file(pane.id, path.clone())),
            PaneContent::Graph => Some(Self::graph(pane.id)),
            _ => None,
        }
    }
}

/// Decides which open panes expose protected content.
pub struct SurfaceClassifier<'a> {
    matcher: &'a PathMatcher,
    block_graph_view: bool,
}

impl<'a> SurfaceClassifier<'a> {
    pub fn new(matcher: &'a PathMatcher, block_graph_view: bool) -> Self {
        Self {
            matcher,
            block_graph_view,
        }
    }

    /// Classifies each pane once, in the order given. Graph panes are
    /// all-or-nothing: they are not filtered by path.
    pub fn classify(&self, panes: &[Pane]) -> Vec<ProtectedSurface> {
        let mut seen = HashSet::new();
        let mut protected = Vec::new();
        for pane in panes {
            if !seen.insert(pane.id) {
                continue;
            }
            match &pane.content {
                PaneContent::Document { path: Some(path) } if self.matcher.is_protected(path) => {
                    protected.push(ProtectedSurface::file(pane.id, path.clone()));
                }
                PaneContent::Graph if self.block_graph_view => {
                    protected.push(ProtectedSurface::graph(pane.id));
                }
                _ => {}
            }
        }
        protected
    }
}

//! Detection of protected content leaking through transient UI surfaces.
//!
//! Hover previews and inline embeds appear outside the pane lifecycle the
//! lock state machine governs. Each observed mutation batch is resolved into
//! an [`ObservedState`] and run through an ordered list of pure rules; the
//! first rule that fires decides the [`LeakAction`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::host::{PreviewId, Workspace};
use crate::path_matcher::PathMatcher;
use crate::surface::PaneId;

/// An inline embed currently present in the UI tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedRef {
    /// Link text as written in the embedding document.
    pub link: String,
    /// Path of the document containing the embed.
    pub source_path: String,
    /// Pane rendering the embedding document, when known.
    pub host: Option<PaneId>,
}

/// What the host saw in one UI mutation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiObservation {
    pub embeds: Vec<EmbedRef>,
    pub preview: Option<PreviewId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmbed {
    pub path: String,
    pub host: Option<PaneId>,
    /// Not present in the previous batch.
    pub fresh: bool,
}

/// Input to the rules. Link resolution has already happened.
#[derive(Debug)]
pub struct ObservedState<'a> {
    pub embeds: Vec<ResolvedEmbed>,
    pub preview: Option<PreviewId>,
    /// Candidate paths for the last hovered link: the resolved path, then
    /// the raw link text.
    pub hovered: Vec<String>,
    pub matcher: &'a PathMatcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeakAction {
    /// Lock with a prompt, hiding the pane that hosts the embed.
    LockForEmbed { host: Option<PaneId> },
    /// Remove the preview, then lock with a prompt.
    SuppressPreview { preview: PreviewId },
}

pub type Rule = fn(&ObservedState<'_>) -> Option<LeakAction>;

/// Evaluated in order, first match wins.
pub const RULES: &[Rule] = &[protected_embed, protected_preview];

pub fn evaluate(state: &ObservedState<'_>) -> Option<LeakAction> {
    RULES.iter().find_map(|rule| rule(state))
}

pub fn protected_embed(state: &ObservedState<'_>) -> Option<LeakAction> {
    state
        .embeds
        .iter()
        .find(|embed| embed.fresh && state.matcher.is_protected(&embed.path))
        .map(|embed| LeakAction::LockForEmbed { host: embed.host })
}

pub fn protected_preview(state: &ObservedState<'_>) -> Option<LeakAction> {
    let preview = state.preview?;
    state
        .hovered
        .iter()
        .any(|path| state.matcher.is_protected(path))
        .then_some(LeakAction::SuppressPreview { preview })
}

#[derive(Debug, Clone)]
struct HoveredLink {
    link: String,
    source_path: String,
}

/// Tracks hover state and embed history across mutation batches.
pub struct LeakMonitor {
    last_hovered: Mutex<Option<HoveredLink>>,
    seen_embeds: Mutex<HashSet<(Option<PaneId>, String)>>,
    connected: AtomicBool,
}

impl Default for LeakMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LeakMonitor {
    pub fn new() -> Self {
        Self {
            last_hovered: Mutex::new(None),
            seen_embeds: Mutex::new(HashSet::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Link-hover events are the only source for what a preview shows.
    pub fn record_hover(&self, link: &str, source_path: &str) {
        *self.last_hovered.lock() = Some(HoveredLink {
            link: link.to_string(),
            source_path: source_path.to_string(),
        });
    }

    /// Forgets which embeds were already reported, so the next batch treats
    /// every embed as new.
    pub fn forget_embeds(&self) {
        self.seen_embeds.lock().clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Resolves one mutation batch and runs the rules over it. Records the
    /// batch's embeds as seen.
    pub fn observe(
        &self,
        observation: &UiObservation,
        workspace: &dyn Workspace,
        matcher: &PathMatcher,
    ) -> Option<LeakAction> {
        if !self.is_connected() {
            return None;
        }

        let resolved: Vec<(Option<PaneId>, String)> = observation
            .embeds
            .iter()
            .filter_map(|embed| {
                let path = workspace.resolve_link(&embed.link, &embed.source_path);
                if path.is_none() {
                    debug!("Embed {:?} does not resolve, skipping", embed.link);
                }
                path.map(|path| (embed.host, path))
            })
            .collect();

        let hovered = self.hovered_candidates(workspace);

        let embeds = {
            let mut seen = self.seen_embeds.lock();
            let embeds: Vec<ResolvedEmbed> = resolved
                .iter()
                .map(|(host, path)| ResolvedEmbed {
                    path: path.clone(),
                    host: *host,
                    fresh: !seen.contains(&(*host, path.clone())),
                })
                .collect();
            *seen = resolved.into_iter().collect();
            embeds
        };

        evaluate(&ObservedState {
            embeds,
            preview: observation.preview,
            hovered,
            matcher,
        })
    }

    fn hovered_candidates(&self, workspace: &dyn Workspace) -> Vec<String> {
        let Some(hovered) = self.last_hovered.lock().clone() else {
            return Vec::new();
        };
        let mut candidates = Vec::with_capacity(2);
        if let Some(path) = workspace.resolve_link(&hovered.link, &hovered.source_path) {
            candidates.push(path);
        }
        if !candidates.contains(&hovered.link) {
            candidates.push(hovered.link);
        }
        candidates
    }
}

//! Protected-path matching.
//!
//! Configured entries are normalized once by resolving them as URL paths
//! against a virtual `file:///` root, so relative entries, dot segments and
//! backslashes all end up as absolute `/`-rooted prefixes. Candidates are then
//! tested with a plain string-prefix comparison against `"/" + candidate`.
//! The comparison is deliberately not segment-aware: `/Jo` also covers
//! `/John.md`.

use percent_encoding::percent_decode_str;
use tracing::warn;
use url::Url;

const VIRTUAL_ROOT: &str = "file:///";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatcher {
    prefixes: Vec<String>,
}

impl PathMatcher {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let prefixes = entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_ref();
                let normalized = normalize_prefix(entry);
                if normalized.is_none() {
                    warn!("Ignoring protected path that cannot be parsed: {:?}", entry);
                }
                normalized
            })
            .collect();
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn is_protected(&self, candidate: &str) -> bool {
        let rooted = format!("/{candidate}");
        self.prefixes
            .iter()
            .any(|prefix| rooted.starts_with(prefix.as_str()))
    }
}

/// Resolves a protected-path entry to its absolute prefix form.
///
/// Returns `None` when the entry cannot be parsed as a path.
pub fn normalize_prefix(entry: &str) -> Option<String> {
    let root = Url::parse(VIRTUAL_ROOT).ok()?;
    let resolved = root.join(entry).ok()?;
    let path = percent_decode_str(resolved.path()).decode_utf8().ok()?;
    Some(path.into_owned())
}

/// Folders matching a partially typed protected-path entry, using the same
/// prefix rule as [`PathMatcher::is_protected`].
pub fn suggest_folders<'a>(query: &str, folders: &'a [String]) -> Vec<&'a str> {
    let Some(prefix) = normalize_prefix(query) else {
        return Vec::new();
    };
    folders
        .iter()
        .filter(|folder| format!("/{folder}").starts_with(prefix.as_str()))
        .map(String::as_str)
        .collect()
}

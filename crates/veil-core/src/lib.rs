//! Privacy lock for a document workspace.
//!
//! Hides a configurable set of protected document paths from panes, search
//! results, hover previews and embeds until a password is entered, and locks
//! again after inactivity. The password is a UI gate only; documents stay in
//! plaintext on disk.
//!
//! The host application implements the collaborator traits in [`host`] and
//! [`search`], builds a [`Guard`], and forwards its events through
//! [`Guard::handle`].

pub mod autolock;
pub mod error;
pub mod guard;
pub mod host;
pub mod leak;
pub mod lock_state;
pub mod logging;
pub mod password;
pub mod path_matcher;
pub mod paths;
pub mod prompt;
pub mod search;
pub mod settings;
pub mod storage;
pub mod surface;

pub use error::{Result, VeilError};
pub use guard::Guard;
pub use host::{Host, HostEvent, Notice, PreviewId, StoreChange};
pub use lock_state::{LockSnapshot, LockStatus};
pub use path_matcher::PathMatcher;
pub use prompt::UnlockRequest;
pub use settings::{PrivacyMode, Settings};
pub use surface::{Pane, PaneContent, PaneId, ProtectedSurface, SurfaceKind};

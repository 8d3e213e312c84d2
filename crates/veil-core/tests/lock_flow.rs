mod common;

use common::{harness, settings};
use veil_core::{LockStatus, Notice, Pane, PaneId, PrivacyMode, ProtectedSurface};

fn close_mode(password: &str) -> veil_core::Settings {
    let mut s = settings(password, &["/Secret"]);
    s.privacy_mode = PrivacyMode::Close;
    s
}

#[tokio::test]
async fn close_mode_detaches_only_protected_panes() {
    let h = harness(
        close_mode("x"),
        vec![Pane::document(1, "Secret/a.md"), Pane::document(2, "Public/b.md")],
    );
    h.guard.lock(false, Vec::new());

    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1)]);
    assert_eq!(h.workspace.open_paths(), vec!["Public/b.md".to_string()]);
    assert_eq!(h.prompt.count(), 1);
    assert!(h.guard.is_locked());
    assert!(h.guard.is_locking());

    let request = h.prompt.take();
    assert_eq!(
        request.surfaces(),
        &[ProtectedSurface::file(PaneId(1), "Secret/a.md")]
    );
    request.resolve(false);
    assert!(h.workspace.open_paths().contains(&"Public/b.md".to_string()));
}

#[tokio::test]
async fn close_mode_reopens_only_what_it_closed() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(true, vec![ProtectedSurface::file(PaneId(9), "Secret/gone.md")]);

    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1)]);
    let request = h.prompt.take();
    assert_eq!(
        request.surfaces(),
        &[ProtectedSurface::file(PaneId(1), "Secret/a.md")]
    );
    request.resolve(true);
    assert_eq!(*h.workspace.opened.lock(), vec!["Secret/a.md".to_string()]);
}

#[tokio::test]
async fn nothing_protected_means_no_prompt() {
    let h = harness(close_mode("x"), vec![Pane::document(2, "Public/b.md")]);
    let before = h.guard.status().status;
    h.guard.lock(false, Vec::new());

    assert_eq!(h.prompt.count(), 0);
    assert!(h.workspace.detached.lock().is_empty());
    assert_eq!(h.guard.status().status, before);
    assert!(!h.guard.is_locking());
}

#[tokio::test]
async fn empty_password_disables_everything() {
    let h = harness(close_mode(""), vec![Pane::document(1, "Secret/a.md")]);
    assert_eq!(h.guard.status().status, LockStatus::Unlocked);

    h.guard.lock(true, Vec::new());
    h.guard.toggle();
    h.guard.request_unlock();

    assert_eq!(h.guard.status().status, LockStatus::Unlocked);
    assert_eq!(h.prompt.count(), 0);
    assert!(h.workspace.detached.lock().is_empty());
}

#[tokio::test]
async fn nested_lock_is_ignored_while_prompt_open() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(false, Vec::new());
    h.workspace.add(Pane::document(3, "Secret/c.md"));
    h.guard.lock(true, Vec::new());
    h.guard.lock_now();

    assert_eq!(h.prompt.count(), 1);
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1)]);
}

#[tokio::test]
async fn close_mode_reopens_in_detach_order_after_unlock() {
    let h = harness(
        close_mode("x"),
        vec![
            Pane::document(1, "Secret/a.md"),
            Pane::document(2, "Public/b.md"),
            Pane::document(3, "Secret/z.md"),
        ],
    );
    h.guard.lock(false, Vec::new());
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1), PaneId(3)]);
    assert!(h.workspace.opened.lock().is_empty());

    h.prompt.resolve(true);

    assert_eq!(
        *h.workspace.opened.lock(),
        vec!["Secret/a.md".to_string(), "Secret/z.md".to_string()]
    );
    assert_eq!(h.guard.status().status, LockStatus::Unlocked);
    assert!(!h.guard.is_locking());
    assert_eq!(*h.status.notices.lock(), vec![Notice::Unlocked]);
    assert_eq!(h.status.last_indicator(), Some(false));
}

#[tokio::test]
async fn graph_reopens_as_fresh_graph_pane() {
    let mut s = close_mode("x");
    s.block_graph_view = true;
    let h = harness(s, vec![Pane::graph(5), Pane::document(2, "Public/b.md")]);
    h.guard.lock(false, Vec::new());
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(5)]);

    h.prompt.resolve(true);
    assert_eq!(*h.workspace.opened.lock(), vec!["<graph>".to_string()]);
}

#[tokio::test]
async fn blur_cancel_detaches_remaining_surfaces() {
    let mut s = settings("x", &["/Secret"]);
    s.privacy_mode = PrivacyMode::Blur;
    let h = harness(
        s,
        vec![
            Pane::document(1, "Secret/a.md"),
            Pane::document(2, "Secret/b.md"),
            Pane::document(3, "Public/c.md"),
        ],
    );
    h.guard.lock(false, Vec::new());
    assert!(h.workspace.detached.lock().is_empty());
    assert_eq!(h.workspace.open_paths().len(), 3);

    // the user closes one tab behind the prompt
    h.workspace.panes.lock().retain(|p| p.id != PaneId(2));

    h.prompt.resolve(false);

    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1)]);
    assert!(h.workspace.opened.lock().is_empty());
    assert_eq!(h.workspace.open_paths(), vec!["Public/c.md".to_string()]);
    assert!(h.guard.is_locked());
    assert!(!h.guard.is_locking());
    assert_eq!(*h.status.notices.lock(), vec![Notice::PromptCancelled]);
}

#[tokio::test]
async fn close_cancel_reopens_nothing() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(false, Vec::new());
    h.prompt.resolve(false);
    assert!(h.workspace.opened.lock().is_empty());
    assert!(h.guard.is_locked());
}

#[tokio::test]
async fn none_mode_leaves_panes_alone() {
    let mut s = settings("x", &["/Secret"]);
    s.privacy_mode = PrivacyMode::None;
    let h = harness(s, vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(false, Vec::new());
    h.prompt.resolve(false);
    assert!(h.workspace.detached.lock().is_empty());
    assert_eq!(h.prompt.count(), 1);
}

#[tokio::test]
async fn dropped_request_counts_as_cancel() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(false, Vec::new());
    drop(h.prompt.take());
    assert!(h.guard.is_locked());
    assert!(!h.guard.is_locking());
    assert_eq!(*h.status.notices.lock(), vec![Notice::PromptCancelled]);
}

#[tokio::test]
async fn wrong_password_keeps_request_open() {
    let mut s = close_mode("hunter2");
    s.hint = "classic".into();
    let h = harness(s, vec![Pane::document(1, "Secret/a.md")]);
    h.guard.lock(false, Vec::new());

    let mut request = h.prompt.take();
    for _ in 0..4 {
        request = match request.submit("wrong") {
            Ok(()) => panic!("wrong password accepted"),
            Err((request, _)) => request,
        };
    }
    assert_eq!(request.hint(), Some("classic"));
    assert!(h.guard.is_locking());
    assert!(request.submit("hunter2").is_ok());
    assert!(!h.guard.is_locked());
}

#[tokio::test]
async fn extra_surfaces_come_first_and_are_not_duplicated() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    h.workspace.add(Pane::document(9, "Public/host.md"));
    h.guard.lock(
        true,
        vec![
            ProtectedSurface::file(PaneId(9), "Public/host.md"),
            ProtectedSurface::file(PaneId(1), "Secret/a.md"),
        ],
    );
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(9), PaneId(1)]);
    h.prompt.resolve(true);
    assert_eq!(
        *h.workspace.opened.lock(),
        vec!["Public/host.md".to_string(), "Secret/a.md".to_string()]
    );
}

#[tokio::test]
async fn forced_prompt_with_nothing_open() {
    let h = harness(close_mode("x"), Vec::new());
    h.guard.lock(true, Vec::new());
    assert_eq!(h.prompt.count(), 1);
    assert!(h.prompt.take().surfaces().is_empty());
}

#[tokio::test]
async fn start_locks_restored_panes() {
    let h = harness(close_mode("x"), vec![Pane::document(1, "Secret/a.md")]);
    assert!(h.guard.is_locked());
    h.guard.start();
    assert_eq!(h.prompt.count(), 1);
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(1)]);
    assert_eq!(h.status.indicator.lock().first().copied(), Some(true));
}

#[tokio::test]
async fn toggle_unlocks_then_locks() {
    let h = harness(close_mode("x"), vec![Pane::document(2, "Public/b.md")]);
    h.guard.start();
    assert_eq!(h.prompt.count(), 0);
    assert!(h.guard.is_locked());

    h.guard.toggle();
    assert_eq!(h.prompt.count(), 1);
    h.guard.toggle();
    assert_eq!(h.prompt.count(), 1);
    h.prompt.resolve(true);
    assert!(!h.guard.is_locked());

    h.workspace.add(Pane::document(1, "Secret/a.md"));
    h.guard.toggle();
    assert!(h.guard.is_locked());
    assert_eq!(h.prompt.count(), 2);
}

#[tokio::test]
async fn opening_protected_file_while_locked_prompts() {
    let h = harness(close_mode("x"), Vec::new());
    h.guard.start();
    assert_eq!(h.prompt.count(), 0);

    h.workspace.add(Pane::document(4, "Secret/a.md"));
    h.guard.handle(veil_core::HostEvent::FileOpened {
        path: "Secret/a.md".into(),
    });
    assert_eq!(h.prompt.count(), 1);
    assert_eq!(*h.workspace.detached.lock(), vec![PaneId(4)]);

    h.prompt.resolve(true);
    h.guard.handle(veil_core::HostEvent::FileOpened {
        path: "Secret/b.md".into(),
    });
    assert_eq!(h.prompt.count(), 1);
}

#[tokio::test]
async fn unlocked_snapshot_serializes() {
    let h = harness(close_mode("x"), Vec::new());
    h.guard.request_unlock();
    h.prompt.resolve(true);
    let json = serde_json::to_value(h.guard.status()).unwrap();
    assert_eq!(json["status"], "UNLOCKED");
    assert_eq!(json["locking"], false);
    assert!(json.get("lockedSince").is_none());
}

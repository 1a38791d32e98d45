//! Integration tests for the Remote Tree Explorer session.
//!
//! These tests drive the public command layer against the in-memory
//! `MockFileService` and use an async-aware MPSC channel from `tokio::sync`
//! to observe the events a front end would receive.

use remote_tree_explorer::app::{self, commands, events::UserEvent, proxy::EventProxy, state::AppState};
use remote_tree_explorer::config::AppConfig;
use remote_tree_explorer::core::format::format_size;
use remote_tree_explorer::core::{CopyOptions, CoreError, RecursiveFolder, RecursiveListing};
use remote_tree_explorer::utils::test_helpers::{
    file, folder, listing, setup_test_logging, MockFileService, RecordingClipboard,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Contains the test infrastructure.
mod helpers {
    use super::*;

    /// A test double for the front-end event channel.
    #[derive(Clone)]
    pub struct TestEventProxy {
        pub sender: mpsc::UnboundedSender<UserEvent>,
    }

    impl EventProxy for TestEventProxy {
        fn send_event(&self, event: UserEvent) {
            if let Err(e) = self.sender.send(event) {
                // Panic in a test if the receiver is dropped, as it indicates a test setup error.
                panic!("Test receiver dropped: {}", e);
            }
        }
    }

    /// `TestHarness` sets up an isolated session against a mock service.
    pub struct TestHarness {
        pub state: Arc<Mutex<AppState>>,
        pub proxy: TestEventProxy,
        pub event_rx: mpsc::UnboundedReceiver<UserEvent>,
        pub backend: Arc<MockFileService>,
        pub clipboard: Arc<RecordingClipboard>,
    }

    impl TestHarness {
        pub fn new(backend: MockFileService) -> Self {
            Self::with_clipboard(backend, RecordingClipboard::new())
        }

        pub fn with_clipboard(backend: MockFileService, clipboard: RecordingClipboard) -> Self {
            setup_test_logging();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let backend = Arc::new(backend);
            let clipboard = Arc::new(clipboard);
            let state = AppState::new(AppConfig::default(), backend.clone(), clipboard.clone());

            Self {
                state: Arc::new(Mutex::new(state)),
                proxy: TestEventProxy { sender: event_tx },
                event_rx,
                backend,
                clipboard,
            }
        }

        /// Runs a command the way the front end would send it.
        pub async fn send(&self, command: &str, payload: serde_json::Value) {
            let message = serde_json::json!({ "command": command, "payload": payload });
            let msg = serde_json::from_value(message).expect("valid IPC message");
            app::dispatch(msg, self.proxy.clone(), self.state.clone()).await;
        }

        pub fn events(&mut self) -> Vec<UserEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }

        pub fn warnings(&mut self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    UserEvent::ShowWarning(message) => Some(message),
                    _ => None,
                })
                .collect()
        }

        pub fn result_paths(&self) -> Vec<String> {
            let state = self.state.lock().unwrap();
            state.search.results().iter().map(|e| e.path.clone()).collect()
        }
    }
}

use helpers::TestHarness;
use serde_json::json;

fn scenario_backend() -> MockFileService {
    MockFileService::new()
        .with_listing(listing(
            "/a",
            vec![folder("/a/b")],
            vec![file("/a/f.txt", 2048)],
        ))
        .with_recursive(RecursiveListing {
            path: "/a/b".into(),
            ..Default::default()
        })
}

#[tokio::test]
async fn test_navigate_then_copy_mixed_selection() {
    let mut harness = TestHarness::new(scenario_backend());
    harness.send("navigate", json!({ "path": "/a" })).await;
    assert_eq!(format_size(2048), "2.0 KB");

    harness
        .send("toggle_selection", json!({ "path": "/a/b", "selected": true }))
        .await;
    harness
        .send("toggle_selection", json!({ "path": "/a/f.txt", "selected": true }))
        .await;
    harness.events();

    harness.send("copy_structure", json!(null)).await;

    let expected = "Selected Items\n├── b\n└── f.txt (2.0 KB)";
    assert_eq!(harness.clipboard.writes(), vec![expected]);
    let copied = harness
        .events()
        .into_iter()
        .any(|e| matches!(e, UserEvent::StructureCopied { ref text } if text == expected));
    assert!(copied, "Expected a StructureCopied event");
}

#[tokio::test]
async fn test_copy_respects_max_depth() {
    let nested = RecursiveListing {
        path: "/docs".into(),
        folders: vec![RecursiveFolder {
            entry: folder("/docs/deep"),
            items: Some(RecursiveListing {
                path: "/docs/deep".into(),
                folders: vec![],
                files: vec![file("/docs/deep/hidden.txt", 1)],
            }),
        }],
        files: vec![file("/docs/a.txt", 10)],
    };
    let backend = MockFileService::new()
        .with_listing(listing("/", vec![folder("/docs")], vec![]))
        .with_recursive(nested);
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/" })).await;
    harness
        .send("toggle_selection", json!({ "path": "/docs", "selected": true }))
        .await;
    harness
        .send("update_copy_options", json!({ "max_depth": 1 }))
        .await;
    harness.send("copy_structure", json!(null)).await;

    assert_eq!(
        harness.clipboard.writes(),
        vec!["docs\n├── deep\n└── a.txt (10 B)"]
    );
}

#[tokio::test]
async fn test_failed_folder_fetch_aborts_copy() {
    let backend = MockFileService::new()
        .with_listing(listing("/r", vec![folder("/r/ok"), folder("/r/gone")], vec![]))
        .with_recursive(RecursiveListing {
            path: "/r/ok".into(),
            ..Default::default()
        })
        .with_recursive_error("/r/gone", CoreError::NotFound("/r/gone".into()));
    let mut harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/r" })).await;
    for path in ["/r/ok", "/r/gone"] {
        harness
            .send("toggle_selection", json!({ "path": path, "selected": true }))
            .await;
    }
    harness.events();

    harness.send("copy_structure", json!(null)).await;

    assert!(harness.clipboard.writes().is_empty());
    let errors: Vec<String> = harness
        .events()
        .into_iter()
        .filter_map(|e| match e {
            UserEvent::ShowError(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(
        errors,
        vec!["Error copying structure: 1 of 2 folder fetches failed (Path does not exist: /r/gone)"]
    );
    assert_eq!(harness.backend.recursive_count(), 2);
    assert!(!harness.state.lock().unwrap().is_copying);
}

#[tokio::test]
async fn test_clipboard_failure_is_reported() {
    let backend = MockFileService::new().with_listing(listing("/w", vec![], vec![file("/w/x", 1)]));
    let mut harness = TestHarness::with_clipboard(
        backend,
        RecordingClipboard::failing(CoreError::ClipboardUnavailable("no terminal".into())),
    );
    harness.send("navigate", json!({ "path": "/w" })).await;
    harness
        .send("toggle_selection", json!({ "path": "/w/x", "selected": true }))
        .await;
    harness.events();
    harness.send("copy_structure", json!(null)).await;

    let failed = harness.events().into_iter().any(|e| {
        matches!(e, UserEvent::ShowError(ref m) if m == "Clipboard unavailable: no terminal")
    });
    assert!(failed);
}

#[tokio::test(start_paused = true)]
async fn test_late_search_response_never_overwrites_newer_query() {
    let backend = MockFileService::new()
        .with_listing(listing("/a", vec![], vec![]))
        .with_search("foo", vec![file("/a/foo", 1)])
        .with_search("foobar", vec![file("/a/foobar", 1)])
        .with_delay("foo", Duration::from_millis(500))
        .with_delay("foobar", Duration::from_millis(50));
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;

    let slow = tokio::spawn(app::tasks::perform_search(
        "foo".into(),
        harness.proxy.clone(),
        harness.state.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let fast = tokio::spawn(app::tasks::perform_search(
        "foobar".into(),
        harness.proxy.clone(),
        harness.state.clone(),
    ));

    fast.await.unwrap();
    assert_eq!(harness.result_paths(), vec!["/a/foobar"]);

    slow.await.unwrap();
    assert_eq!(harness.result_paths(), vec!["/a/foobar"]);
    let state = harness.state.lock().unwrap();
    assert!(!state.search.cache().contains("/a", "foo"));
    assert!(!state.search.is_searching());
}

#[tokio::test(start_paused = true)]
async fn test_typing_within_debounce_window_sends_only_last_query() {
    let backend = MockFileService::new()
        .with_listing(listing("/a", vec![], vec![]))
        .with_search("foobar", vec![file("/a/foobar", 1)]);
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;

    harness.send("update_search", json!({ "query": "foo" })).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.send("update_search", json!({ "query": "foobar" })).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(harness.backend.search_count("foo"), 0);
    assert_eq!(harness.backend.search_count("foobar"), 1);
    assert_eq!(harness.result_paths(), vec!["/a/foobar"]);
}

#[tokio::test(start_paused = true)]
async fn test_search_bar_uses_longer_delay() {
    let backend = MockFileService::new()
        .with_listing(listing("/a", vec![], vec![]))
        .with_search("q", vec![file("/a/q", 1)]);
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;

    harness.send("submit_search", json!({ "query": "q" })).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(harness.backend.search_count("q"), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.backend.search_count("q"), 1);
}

#[tokio::test]
async fn test_throttled_search_keeps_results_and_warns() {
    let backend = MockFileService::new()
        .with_listing(listing("/a", vec![], vec![]))
        .with_search("ok", vec![file("/a/ok", 1)])
        .with_search_error("busy", CoreError::Throttled);
    let mut harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;

    app::tasks::perform_search("ok".into(), harness.proxy.clone(), harness.state.clone()).await;
    harness.events();
    app::tasks::perform_search("busy".into(), harness.proxy.clone(), harness.state.clone()).await;

    assert_eq!(harness.result_paths(), vec!["/a/ok"]);
    {
        let state = harness.state.lock().unwrap();
        assert!(!state.search.cache().contains("/a", "busy"));
        assert!(!state.search.is_searching());
    }
    assert_eq!(
        harness.warnings(),
        vec!["Too many requests. Please wait and try again."]
    );
}

#[tokio::test]
async fn test_repeated_query_is_served_from_cache() {
    let backend = MockFileService::new()
        .with_listing(listing("/a", vec![], vec![]))
        .with_search("rep", vec![file("/a/rep", 1)]);
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;

    app::tasks::perform_search("rep".into(), harness.proxy.clone(), harness.state.clone()).await;
    let first = Arc::clone(harness.state.lock().unwrap().search.results());
    app::tasks::perform_search("rep".into(), harness.proxy.clone(), harness.state.clone()).await;
    let second = Arc::clone(harness.state.lock().unwrap().search.results());

    assert_eq!(harness.backend.search_count("rep"), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_empty_selection_always_closes_options_panel() {
    let backend = MockFileService::new().with_listing(listing(
        "/s",
        vec![],
        vec![file("/s/one", 1), file("/s/two", 2)],
    ));
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/s" })).await;

    harness
        .send("toggle_selection", json!({ "path": "/s/one", "selected": true }))
        .await;
    harness
        .send("toggle_selection", json!({ "path": "/s/one", "selected": true }))
        .await;
    harness.send("toggle_copy_options", json!(null)).await;
    {
        let state = harness.state.lock().unwrap();
        assert_eq!(state.selection.len(), 1);
        assert!(state.selection.options_panel_open());
    }

    harness
        .send("toggle_selection", json!({ "path": "/s/one", "selected": false }))
        .await;
    {
        let state = harness.state.lock().unwrap();
        assert!(state.selection.is_empty());
        assert!(!state.selection.options_panel_open());
    }

    harness
        .send("toggle_selection", json!({ "path": "/s/two", "selected": true }))
        .await;
    harness.send("toggle_copy_options", json!(null)).await;
    harness.send("clear_selection", json!(null)).await;
    let state = harness.state.lock().unwrap();
    assert!(!state.selection.options_panel_open());
}

#[tokio::test]
async fn test_selection_survives_navigation() {
    let backend = scenario_backend().with_listing(listing("/a/b", vec![], vec![]));
    let harness = TestHarness::new(backend);
    harness.send("navigate", json!({ "path": "/a" })).await;
    harness
        .send("toggle_selection", json!({ "path": "/a/f.txt", "selected": true }))
        .await;
    harness.send("navigate", json!({ "path": "/a/b" })).await;

    let state = harness.state.lock().unwrap();
    assert_eq!(state.current_path, "/a/b");
    assert!(state.selection.contains("/a/f.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_navigation_is_superseded() {
    let backend = MockFileService::new()
        .with_listing(listing("/slow", vec![], vec![file("/slow/s", 1)]))
        .with_listing(listing("/fast", vec![], vec![file("/fast/f", 1)]))
        .with_delay("/slow", Duration::from_millis(300));
    let harness = TestHarness::new(backend);

    let slow = tokio::spawn(commands::navigate(
        "/slow".into(),
        harness.proxy.clone(),
        harness.state.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.send("navigate", json!({ "path": "/fast" })).await;
    slow.await.unwrap();

    let state = harness.state.lock().unwrap();
    assert_eq!(state.current_path, "/fast");
    assert_eq!(state.tree.view().files[0].path, "/fast/f");
}

#[tokio::test]
async fn test_lazy_tree_expands_once() {
    let backend = MockFileService::new()
        .with_recursive(RecursiveListing {
            path: "/t".into(),
            folders: vec![RecursiveFolder {
                entry: folder("/t/lazy"),
                items: None,
            }],
            files: vec![],
        })
        .with_listing(listing("/t/lazy", vec![], vec![file("/t/lazy/x", 1)]));
    let harness = TestHarness::new(backend);
    harness
        .send("set_view_mode", json!({ "mode": "recursive" }))
        .await;
    harness.send("navigate", json!({ "path": "/t" })).await;

    harness.send("expand_node", json!({ "path": "/t/lazy" })).await;
    harness.send("collapse_node", json!({ "path": "/t/lazy" })).await;
    harness.send("expand_node", json!({ "path": "/t/lazy" })).await;

    assert_eq!(harness.backend.list_count("/t/lazy"), 1);
    let state = harness.state.lock().unwrap();
    assert!(state.tree.is_expanded("/t/lazy"));
    assert_eq!(state.tree.node("/t/lazy").unwrap().files.len(), 1);
}

#[tokio::test]
async fn test_copy_options_depth_is_clamped() {
    let harness = TestHarness::new(MockFileService::new());
    harness
        .send("update_copy_options", json!({ "max_depth": 25 }))
        .await;
    assert_eq!(
        harness.state.lock().unwrap().copy_options.max_depth,
        CopyOptions::MAX_DEPTH
    );
}

#[tokio::test]
async fn test_unknown_date_specifier_does_not_break_session() {
    let mut harness = TestHarness::new(scenario_backend());
    {
        let mut state = harness.state.lock().unwrap();
        state.config.date_format = "%Q".to_string();
        state.copy_options.include_dates = true;
    }

    harness.send("navigate", json!({ "path": "/a" })).await;
    harness
        .send("toggle_selection", json!({ "path": "/a/f.txt", "selected": true }))
        .await;
    harness.send("copy_structure", json!(null)).await;

    let ui_dates: Vec<String> = harness
        .events()
        .into_iter()
        .filter_map(|e| match e {
            UserEvent::StateUpdate(ui) => ui.files.first().map(|row| row.modified.clone()),
            _ => None,
        })
        .collect();
    assert!(ui_dates.iter().all(|d| d == "1/15/2024"));
    assert!(!ui_dates.is_empty());
    assert_eq!(
        harness.clipboard.writes(),
        vec!["f.txt (2.0 KB) [1/15/2024]"]
    );
    assert!(!harness.state.is_poisoned());
}

//! Fixtures shared by unit and integration tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

use crate::backend::{FileOpRequest, FileService, PreviewData, SystemInfo};
use crate::core::path::OsKind;
use crate::core::{CoreError, Entry, EntryKind, Listing, RecursiveListing};
use crate::utils::clipboard::Clipboard;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// This function is wrapped in a `Once` block to ensure that the global
/// subscriber is set exactly one time, even when tests are run in parallel.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 10:30 on the given date.
pub fn timestamp(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(10, 30, 0))
        .expect("valid test date")
}

fn last_segment(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// A file entry named after the last segment of `path`, modified 2024-01-15.
pub fn file(path: &str, size: u64) -> Entry {
    Entry {
        name: last_segment(path),
        path: path.to_string(),
        kind: EntryKind::File,
        size: Some(size),
        modified_at: timestamp(2024, 1, 15),
    }
}

pub fn folder(path: &str) -> Entry {
    Entry {
        name: last_segment(path),
        path: path.to_string(),
        kind: EntryKind::Folder,
        size: None,
        modified_at: timestamp(2024, 1, 15),
    }
}

pub fn listing(path: &str, folders: Vec<Entry>, files: Vec<Entry>) -> Listing {
    Listing {
        path: path.to_string(),
        folders,
        files,
        parent: None,
    }
}

/// A request observed by [`MockFileService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    List(String),
    ListRecursive(String),
    Search { path: String, query: String },
    Preview(String),
    FileOp(FileOpRequest),
    SystemInfo,
}

#[derive(Default)]
struct MockData {
    listings: HashMap<String, Result<Listing, CoreError>>,
    recursive: HashMap<String, Result<RecursiveListing, CoreError>>,
    searches: HashMap<String, Result<Vec<Entry>, CoreError>>,
    previews: HashMap<String, Result<PreviewData, CoreError>>,
    delays: HashMap<String, Duration>,
    system_info: Option<Result<SystemInfo, CoreError>>,
    file_op_error: Option<CoreError>,
    calls: Vec<MockCall>,
}

/// An in-memory [`FileService`] with canned answers and a call log.
///
/// Unknown listing paths answer `NotFound`; unknown search queries answer
/// an empty list. Delays are keyed by path or by search query.
#[derive(Default)]
pub struct MockFileService {
    data: Mutex<MockData>,
}

impl MockFileService {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> std::sync::MutexGuard<'_, MockData> {
        self.data.lock().expect("Mutex was poisoned. This should not happen.")
    }

    pub fn with_listing(self, listing: Listing) -> Self {
        self.data().listings.insert(listing.path.clone(), Ok(listing));
        self
    }

    pub fn with_list_error(self, path: &str, error: CoreError) -> Self {
        self.data().listings.insert(path.to_string(), Err(error));
        self
    }

    pub fn with_recursive(self, snapshot: RecursiveListing) -> Self {
        self.data()
            .recursive
            .insert(snapshot.path.clone(), Ok(snapshot));
        self
    }

    pub fn with_recursive_error(self, path: &str, error: CoreError) -> Self {
        self.data().recursive.insert(path.to_string(), Err(error));
        self
    }

    pub fn with_search(self, query: &str, results: Vec<Entry>) -> Self {
        self.data().searches.insert(query.to_string(), Ok(results));
        self
    }

    pub fn with_search_error(self, query: &str, error: CoreError) -> Self {
        self.data().searches.insert(query.to_string(), Err(error));
        self
    }

    pub fn with_preview(self, path: &str, preview: PreviewData) -> Self {
        self.data().previews.insert(path.to_string(), Ok(preview));
        self
    }

    pub fn with_preview_error(self, path: &str, error: CoreError) -> Self {
        self.data().previews.insert(path.to_string(), Err(error));
        self
    }

    pub fn with_delay(self, key: &str, delay: Duration) -> Self {
        self.data().delays.insert(key.to_string(), delay);
        self
    }

    pub fn with_system_info(self, info: Result<SystemInfo, CoreError>) -> Self {
        self.data().system_info = Some(info);
        self
    }

    pub fn with_file_op_error(self, error: CoreError) -> Self {
        self.data().file_op_error = Some(error);
        self
    }

    /// Replaces the answer for `path` after construction.
    pub fn set_listing(&self, listing: Listing) {
        self.data().listings.insert(listing.path.clone(), Ok(listing));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.data().calls.clone()
    }

    pub fn search_count(&self, query: &str) -> usize {
        self.data()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Search { query: q, .. } if q == query))
            .count()
    }

    pub fn list_count(&self, path: &str) -> usize {
        self.data()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::List(p) if p == path))
            .count()
    }

    pub fn recursive_count(&self) -> usize {
        self.data()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::ListRecursive(_)))
            .count()
    }

    /// Logs the call and returns the configured delay for `key`.
    fn record(&self, call: MockCall, key: &str) -> Option<Duration> {
        let mut data = self.data();
        data.calls.push(call);
        data.delays.get(key).copied()
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FileService for MockFileService {
    async fn list(&self, path: &str) -> Result<Listing, CoreError> {
        Self::pause(self.record(MockCall::List(path.to_string()), path)).await;
        self.data()
            .listings
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(CoreError::NotFound(path.to_string())))
    }

    async fn list_recursive(&self, path: &str) -> Result<RecursiveListing, CoreError> {
        Self::pause(self.record(MockCall::ListRecursive(path.to_string()), path)).await;
        self.data()
            .recursive
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(CoreError::NotFound(path.to_string())))
    }

    async fn search(&self, path: &str, query: &str) -> Result<Vec<Entry>, CoreError> {
        let call = MockCall::Search {
            path: path.to_string(),
            query: query.to_string(),
        };
        Self::pause(self.record(call, query)).await;
        self.data()
            .searches
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn preview(&self, path: &str) -> Result<PreviewData, CoreError> {
        Self::pause(self.record(MockCall::Preview(path.to_string()), path)).await;
        self.data()
            .previews
            .get(path)
            .cloned()
            .unwrap_or(Ok(PreviewData::Unsupported))
    }

    async fn file_op(&self, request: &FileOpRequest) -> Result<(), CoreError> {
        Self::pause(self.record(MockCall::FileOp(request.clone()), &request.path)).await;
        match self.data().file_op_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn system_info(&self) -> Result<SystemInfo, CoreError> {
        Self::pause(self.record(MockCall::SystemInfo, "")).await;
        self.data().system_info.clone().unwrap_or_else(|| {
            Ok(SystemInfo {
                default_root_path: "/".to_string(),
                os_kind: OsKind::Posix,
                available_roots: vec!["/".to_string()],
            })
        })
    }
}

/// A clipboard that keeps everything written to it.
#[derive(Default)]
pub struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
    failure: Option<CoreError>,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: CoreError) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .expect("Mutex was poisoned. This should not happen.")
            .clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), CoreError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.writes
            .lock()
            .expect("Mutex was poisoned. This should not happen.")
            .push(text.to_string());
        Ok(())
    }
}

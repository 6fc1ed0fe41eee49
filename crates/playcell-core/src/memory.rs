//! In-memory download, playback and storage engines.
//!
//! These back the `simulate` command and the state machine tests. Every
//! mutating call is recorded as an [`EngineCall`] so callers can assert on
//! exactly which side effects a transition produced.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::models::{AttachmentId, AttachmentRef};
use crate::ports::{
    DownloadEvent, DownloadEventKind, DownloadObserverPort, FileResolution, ObserverTag,
    PlaybackPort,
};
use crate::util::clamp_fraction;

/// A side-effecting call made against an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "call")]
pub enum EngineCall {
    Register { file_name: String, tag: ObserverTag },
    Unregister { tag: ObserverTag },
    StartDownload { file_name: String },
    CancelDownload { file_name: String },
    EnqueueAndPlay { attachment: AttachmentId },
    Pause { attachment: AttachmentId },
    StopAndTeardown,
    RemoveFile { path: PathBuf },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct DownloadsState {
    observers: BTreeMap<ObserverTag, String>,
    in_flight: HashMap<String, Option<f32>>,
    calls: Vec<EngineCall>,
}

/// Download engine that never touches the network.
#[derive(Debug, Default)]
pub struct MemoryDownloads {
    next_tag: AtomicU64,
    state: Mutex<DownloadsState>,
}

impl MemoryDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutating call so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Tags currently registered for `file_name`.
    pub fn observers_for(&self, file_name: &str) -> Vec<ObserverTag> {
        lock(&self.state)
            .observers
            .iter()
            .filter(|(_, name)| name.as_str() == file_name)
            .map(|(tag, _)| *tag)
            .collect()
    }

    /// Mark a download as running without recording a call, as if another
    /// row had started it.
    pub fn begin_external(&self, file_name: &str) {
        lock(&self.state)
            .in_flight
            .entry(file_name.to_string())
            .or_insert(None);
    }

    /// Record progress and build the callbacks owed to observers.
    pub fn progress(&self, file_name: &str, fraction: f32) -> Vec<DownloadEvent> {
        let fraction = clamp_fraction(fraction);
        let mut state = lock(&self.state);
        state
            .in_flight
            .insert(file_name.to_string(), Some(fraction));
        Self::events_for(&state, file_name, DownloadEventKind::Progress { fraction })
    }

    /// Finish a download and build the success callbacks.
    pub fn complete(&self, file_name: &str) -> Vec<DownloadEvent> {
        let mut state = lock(&self.state);
        state.in_flight.remove(file_name);
        Self::events_for(&state, file_name, DownloadEventKind::Success)
    }

    /// Abort a download and build the failure callbacks.
    pub fn fail(&self, file_name: &str, canceled: bool) -> Vec<DownloadEvent> {
        let mut state = lock(&self.state);
        state.in_flight.remove(file_name);
        Self::events_for(&state, file_name, DownloadEventKind::Failure { canceled })
    }

    fn events_for(
        state: &DownloadsState,
        file_name: &str,
        kind: DownloadEventKind,
    ) -> Vec<DownloadEvent> {
        state
            .observers
            .iter()
            .filter(|(_, name)| name.as_str() == file_name)
            .map(|(tag, _)| DownloadEvent {
                tag: *tag,
                file_name: file_name.to_string(),
                kind,
            })
            .collect()
    }
}

impl DownloadObserverPort for MemoryDownloads {
    fn generate_observer_tag(&self) -> ObserverTag {
        ObserverTag::new(self.next_tag.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn register(&self, file_name: &str, _attachment: &AttachmentRef, tag: ObserverTag) {
        let mut state = lock(&self.state);
        state.observers.insert(tag, file_name.to_string());
        state.calls.push(EngineCall::Register {
            file_name: file_name.to_string(),
            tag,
        });
    }

    fn unregister(&self, tag: ObserverTag) {
        let mut state = lock(&self.state);
        state.observers.remove(&tag);
        state.calls.push(EngineCall::Unregister { tag });
    }

    fn is_download_in_flight(&self, file_name: &str) -> bool {
        lock(&self.state).in_flight.contains_key(file_name)
    }

    fn current_progress(&self, file_name: &str) -> Option<f32> {
        lock(&self.state).in_flight.get(file_name).copied().flatten()
    }

    fn start_download(&self, attachment: &AttachmentRef) {
        let mut state = lock(&self.state);
        state
            .in_flight
            .entry(attachment.file_name.clone())
            .or_insert(None);
        state.calls.push(EngineCall::StartDownload {
            file_name: attachment.file_name.clone(),
        });
    }

    fn cancel_download(&self, attachment: &AttachmentRef) {
        let mut state = lock(&self.state);
        state.in_flight.remove(&attachment.file_name);
        state.calls.push(EngineCall::CancelDownload {
            file_name: attachment.file_name.clone(),
        });
    }
}

#[derive(Debug, Default)]
struct PlaybackState {
    current: Option<AttachmentId>,
    paused: bool,
    refusing: bool,
    calls: Vec<EngineCall>,
}

/// Playback engine holding a single active item.
#[derive(Debug, Default)]
pub struct MemoryPlayback {
    state: Mutex<PlaybackState>,
}

impl MemoryPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Make `enqueue_and_play` and `pause` report failure.
    pub fn set_refusing(&self, refusing: bool) {
        lock(&self.state).refusing = refusing;
    }

    /// Make `attachment` the active item without recording a call.
    pub fn play_external(&self, attachment: &AttachmentRef) {
        let mut state = lock(&self.state);
        state.current = Some(attachment.id);
        state.paused = false;
    }

    /// The active item reached its end.
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        state.current = None;
        state.paused = false;
    }

    pub fn current(&self) -> Option<AttachmentId> {
        lock(&self.state).current
    }
}

impl PlaybackPort for MemoryPlayback {
    fn is_playing(&self, attachment: &AttachmentRef) -> bool {
        lock(&self.state).current == Some(attachment.id)
    }

    fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    fn enqueue_and_play(&self, attachment: &AttachmentRef) -> bool {
        let mut state = lock(&self.state);
        state.calls.push(EngineCall::EnqueueAndPlay {
            attachment: attachment.id,
        });
        if state.refusing {
            return false;
        }
        state.current = Some(attachment.id);
        state.paused = false;
        true
    }

    fn pause(&self, attachment: &AttachmentRef) -> bool {
        let mut state = lock(&self.state);
        state.calls.push(EngineCall::Pause {
            attachment: attachment.id,
        });
        if state.refusing || state.current != Some(attachment.id) {
            return false;
        }
        state.paused = true;
        true
    }

    fn stop_and_teardown(&self) {
        let mut state = lock(&self.state);
        state.current = None;
        state.paused = false;
        state.calls.push(EngineCall::StopAndTeardown);
    }
}

#[derive(Debug, Default)]
struct FilesState {
    files: HashMap<PathBuf, u64>,
    calls: Vec<EngineCall>,
}

/// File storage kept entirely in memory.
#[derive(Debug)]
pub struct MemoryFiles {
    cache_dir: PathBuf,
    state: Mutex<FilesState>,
}

impl MemoryFiles {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            state: Mutex::new(FilesState::default()),
        }
    }

    /// Create or overwrite a file of `len` bytes.
    pub fn put(&self, path: impl Into<PathBuf>, len: u64) {
        lock(&self.state).files.insert(path.into(), len);
    }

    /// Create the canonical cached copy of `attachment`.
    pub fn put_cached(&self, attachment: &AttachmentRef, len: u64) {
        self.put(self.cache_path(attachment), len);
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.state).files.contains_key(path)
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }
}

impl Default for MemoryFiles {
    fn default() -> Self {
        Self::new("/cache")
    }
}

impl FileResolution for MemoryFiles {
    fn cache_path(&self, attachment: &AttachmentRef) -> PathBuf {
        self.cache_dir.join(&attachment.file_name)
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        lock(&self.state).files.get(path).copied()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(EngineCall::RemoveFile {
            path: path.to_path_buf(),
        });
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

//! Collaborator contracts the state machine observes and drives.
//!
//! The download engine, playback engine and file storage are owned elsewhere;
//! these traits are the whole surface the row is allowed to touch.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::AttachmentRef;

/// Opaque routing tag identifying one download listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverTag(u64);

impl ObserverTag {
    /// Wrap a raw tag value handed out by a download engine.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw tag value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Download engine surface: observer registry, in-flight queries and loader
/// controls.
pub trait DownloadObserverPort {
    /// Hand out a fresh observer tag.
    fn generate_observer_tag(&self) -> ObserverTag;

    /// Register interest in progress for `file_name`.
    fn register(&self, file_name: &str, attachment: &AttachmentRef, tag: ObserverTag);

    /// Drop every registration held by `tag`.
    fn unregister(&self, tag: ObserverTag);

    /// Whether a download for `file_name` is currently running.
    fn is_download_in_flight(&self, file_name: &str) -> bool;

    /// Last reported progress fraction for `file_name`, if any.
    fn current_progress(&self, file_name: &str) -> Option<f32>;

    /// Start (or join) a download of the attachment.
    fn start_download(&self, attachment: &AttachmentRef);

    /// Cancel a running download of the attachment.
    fn cancel_download(&self, attachment: &AttachmentRef);
}

/// Playback engine surface.
pub trait PlaybackPort {
    /// Whether `attachment` is the active playback item.
    fn is_playing(&self, attachment: &AttachmentRef) -> bool;

    /// Whether the active item is paused.
    fn is_paused(&self) -> bool;

    /// Locate the attachment in the playlist and play it.
    ///
    /// Returns `false` when the engine refuses.
    fn enqueue_and_play(&self, attachment: &AttachmentRef) -> bool;

    /// Pause the attachment. Returns `false` when the engine refuses.
    fn pause(&self, attachment: &AttachmentRef) -> bool;

    /// Stop playback and release the player entirely.
    fn stop_and_teardown(&self);
}

/// Local storage surface for cached attachment copies.
pub trait FileResolution {
    /// Canonical cache location for the attachment.
    fn cache_path(&self, attachment: &AttachmentRef) -> PathBuf;

    /// Length of the file at `path`, `None` when it does not exist.
    fn file_len(&self, path: &Path) -> Option<u64>;

    /// Delete the file at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Callback surface delivered by the download engine.
pub trait DownloadListener {
    /// Tag this listener was registered with.
    fn observer_tag(&self) -> ObserverTag;

    /// Download progressed to `fraction` in `0.0..=1.0`.
    fn on_progress(&mut self, file_name: &str, fraction: f32);

    /// Download finished and the file is local.
    fn on_success(&mut self, file_name: &str);

    /// Download failed or was canceled by the user.
    fn on_failure(&mut self, file_name: &str, canceled: bool);

    /// Upload progress; rows showing received audio ignore it.
    fn on_upload_progress(&mut self, _file_name: &str, _fraction: f32) {}
}

/// What happened to a download.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DownloadEventKind {
    Progress { fraction: f32 },
    Success,
    Failure { canceled: bool },
}

/// A routed download callback, addressed by tag and file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub tag: ObserverTag,
    pub file_name: String,
    pub kind: DownloadEventKind,
}

impl DownloadEvent {
    /// Deliver the event to `listener` when the tag matches.
    ///
    /// Returns `false` when the event was addressed to another listener.
    pub fn dispatch<L: DownloadListener + ?Sized>(&self, listener: &mut L) -> bool {
        if self.tag != listener.observer_tag() {
            return false;
        }
        match self.kind {
            DownloadEventKind::Progress { fraction } => {
                listener.on_progress(&self.file_name, fraction);
            }
            DownloadEventKind::Success => listener.on_success(&self.file_name),
            DownloadEventKind::Failure { canceled } => {
                listener.on_failure(&self.file_name, canceled);
            }
        }
        true
    }
}

//! Button state machine for a playable audio row.
//!
//! [`AudioCell`] owns the main and mini button states and keeps them in line
//! with three sources of truth: the file on disk, the download engine and the
//! playback engine. All mutation goes through its methods, which are meant to
//! be called from a single execution context (see [`AudioCell::run`]).

mod driver;
mod render;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use driver::{CellEvent, CellHandle};
pub use render::{CellVisual, RenderDelta};

use crate::models::{AttachmentRef, PlayerSettings};
use crate::ports::{DownloadListener, DownloadObserverPort, FileResolution, ObserverTag, PlaybackPort};
use crate::presentation::Presentation;
use crate::state::{
    main_state_after, main_tap_action, mini_state_after, mini_tap_action, ButtonState,
    MainTapAction, MiniButtonState, MiniProgress, MiniTapAction,
};
use crate::storage::{purge_if_empty, resolve_local_file};
use crate::util::clamp_fraction;

/// Engines and settings for one logical account.
#[derive(Debug)]
pub struct Session<D, P, F> {
    pub downloads: D,
    pub playback: P,
    pub files: F,
    stream_media: AtomicBool,
}

impl<D, P, F> Session<D, P, F> {
    pub fn new(downloads: D, playback: P, files: F, settings: &PlayerSettings) -> Self {
        Self {
            downloads,
            playback,
            files,
            stream_media: AtomicBool::new(settings.stream_media),
        }
    }

    /// Current value of the streaming preference.
    pub fn stream_media(&self) -> bool {
        self.stream_media.load(Ordering::Relaxed)
    }

    /// Change the streaming preference; rows pick it up on their next pass.
    pub fn set_stream_media(&self, enabled: bool) {
        self.stream_media.store(enabled, Ordering::Relaxed);
    }

    fn streaming_allowed(&self, attachment: &AttachmentRef) -> bool {
        self.stream_media() && attachment.dialog_is_streamable
    }
}

/// State machine behind one audio row.
pub struct AudioCell<D, P, F>
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    session: Arc<Session<D, P, F>>,
    tag: ObserverTag,
    attachment: Option<AttachmentRef>,
    presentation: Option<Presentation>,
    cache_file: Option<PathBuf>,
    button: ButtonState,
    mini: MiniButtonState,
    mini_progress_mode: MiniProgress,
    // Set once streaming was found not to apply to the bound attachment.
    streaming_off: bool,
    progress: f32,
    mini_progress: f32,
    observing: Option<String>,
    shown: CellVisual,
    pending: RenderDelta,
}

impl<D, P, F> AudioCell<D, P, F>
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    pub fn new(session: Arc<Session<D, P, F>>) -> Self {
        let tag = session.downloads.generate_observer_tag();
        Self {
            session,
            tag,
            attachment: None,
            presentation: None,
            cache_file: None,
            button: ButtonState::Idle,
            mini: MiniButtonState::Disabled,
            mini_progress_mode: MiniProgress::None,
            streaming_off: false,
            progress: 0.0,
            mini_progress: 0.0,
            observing: None,
            shown: CellVisual::default(),
            pending: RenderDelta::default(),
        }
    }

    /// Bind the row to an attachment and resync from scratch.
    pub fn bind(&mut self, attachment: AttachmentRef) {
        let same_binding = self.attachment.as_ref().is_some_and(|current| {
            current.id == attachment.id
                && current.dialog_is_streamable == attachment.dialog_is_streamable
        });
        if !same_binding {
            self.release_observer();
            self.streaming_off = false;
            self.button = ButtonState::Idle;
            self.mini = MiniButtonState::Disabled;
            self.mini_progress_mode = MiniProgress::None;
            self.progress = 0.0;
            self.mini_progress = 0.0;
        }
        tracing::debug!(
            tag = %self.tag,
            file_name = %attachment.file_name,
            "Binding attachment"
        );
        self.presentation = Some(Presentation::derive(&attachment));
        self.attachment = Some(attachment);
        self.reconcile(false);
    }

    /// Detach from the current attachment and drop download interest.
    pub fn unbind(&mut self) {
        self.release_observer();
        self.attachment = None;
        self.presentation = None;
        self.cache_file = None;
    }

    /// Re-derive both button states from disk, download and playback truth.
    ///
    /// Returns whether anything visible changed. With `force` set the whole
    /// visual is queued for redraw even when nothing changed.
    pub fn reconcile(&mut self, force: bool) -> bool {
        let Some(attachment) = self.attachment.clone() else {
            return false;
        };
        let session = Arc::clone(&self.session);

        let path = resolve_local_file(&session.files, &attachment);
        self.cache_file = Some(path.clone());
        if !attachment.is_resolvable() {
            self.release_observer();
            return self.publish(force);
        }

        let mut file_exists = purge_if_empty(&session.files, &path).is_some();

        if !self.streaming_off && session.streaming_allowed(&attachment) {
            self.mini_progress_mode = if file_exists {
                MiniProgress::HiddenBehindMainProgress
            } else {
                MiniProgress::VisibleAlongsideMainProgress
            };
            file_exists = true;
        } else {
            self.streaming_off = true;
            self.mini_progress_mode = MiniProgress::None;
            self.mini = MiniButtonState::Disabled;
        }

        let previous = (self.button, self.mini);
        if self.mini_progress_mode.is_streaming() {
            self.button = self.playback_state(&attachment);
            if self.mini_progress_mode == MiniProgress::HiddenBehindMainProgress {
                self.release_observer();
                self.mini = MiniButtonState::Disabled;
            } else {
                self.ensure_observer(&attachment);
                let in_flight = session.downloads.is_download_in_flight(&attachment.file_name);
                self.mini = MiniButtonState::from_download(in_flight);
                if in_flight {
                    self.mini_progress = engine_progress(&session.downloads, &attachment);
                }
            }
        } else if file_exists {
            self.release_observer();
            self.button = self.playback_state(&attachment);
            self.progress = 1.0;
        } else {
            self.ensure_observer(&attachment);
            let in_flight = session.downloads.is_download_in_flight(&attachment.file_name);
            self.button = ButtonState::from_download(in_flight);
            if in_flight {
                self.progress = engine_progress(&session.downloads, &attachment);
            }
        }

        if previous != (self.button, self.mini) {
            tracing::debug!(
                tag = %self.tag,
                file_name = %attachment.file_name,
                button = ?self.button,
                mini = ?self.mini,
                "Reconciled button states"
            );
        }
        self.publish(force)
    }

    /// Handle a tap on the main control.
    pub fn on_main_button_tapped(&mut self) {
        let Some(attachment) = self.attachment.clone() else {
            return;
        };
        if !attachment.is_resolvable() {
            tracing::debug!(tag = %self.tag, "Ignoring tap on unresolvable attachment");
            return;
        }
        let session = Arc::clone(&self.session);

        let action = main_tap_action(self.button, self.mini);
        let accepted = match action {
            MainTapAction::Play { start_download } => {
                if start_download {
                    session.downloads.start_download(&attachment);
                }
                let accepted = session.playback.enqueue_and_play(&attachment);
                if accepted
                    && self.mini_progress_mode == MiniProgress::VisibleAlongsideMainProgress
                    && self.mini != MiniButtonState::DownloadingMini
                {
                    self.mini = MiniButtonState::DownloadingMini;
                    self.mini_progress = 0.0;
                }
                accepted
            }
            MainTapAction::Pause => session.playback.pause(&attachment),
            MainTapAction::StartDownload => {
                self.progress = 0.0;
                session.downloads.start_download(&attachment);
                true
            }
            MainTapAction::CancelDownload => {
                session.downloads.cancel_download(&attachment);
                true
            }
        };

        let next = main_state_after(self.button, action, accepted);
        tracing::debug!(
            tag = %self.tag,
            file_name = %attachment.file_name,
            ?action,
            accepted,
            from = ?self.button,
            to = ?next,
            "Main button tapped"
        );
        self.button = next;
        self.publish(false);
    }

    /// Handle a tap on the mini control. Ignored while it is disabled.
    pub fn on_mini_button_tapped(&mut self) {
        let Some(attachment) = self.attachment.clone() else {
            return;
        };
        let action = mini_tap_action(self.mini);
        let session = Arc::clone(&self.session);

        match action {
            MiniTapAction::Ignore => return,
            MiniTapAction::StartDownload => {
                self.mini_progress = 0.0;
                session.downloads.start_download(&attachment);
            }
            MiniTapAction::CancelDownload => {
                if session.playback.is_playing(&attachment) {
                    session.playback.stop_and_teardown();
                    self.button = self.playback_state(&attachment);
                }
                session.downloads.cancel_download(&attachment);
            }
        }

        let next = mini_state_after(self.mini, action);
        tracing::debug!(
            tag = %self.tag,
            file_name = %attachment.file_name,
            ?action,
            from = ?self.mini,
            to = ?next,
            "Mini button tapped"
        );
        self.mini = next;
        self.publish(false);
    }

    /// The playback engine changed its active item or paused state.
    pub fn on_playback_changed(&mut self) {
        self.reconcile(false);
    }

    pub const fn button_state(&self) -> ButtonState {
        self.button
    }

    pub const fn mini_button_state(&self) -> MiniButtonState {
        self.mini
    }

    pub const fn mini_progress_mode(&self) -> MiniProgress {
        self.mini_progress_mode
    }

    pub const fn progress(&self) -> f32 {
        self.progress
    }

    pub const fn mini_progress(&self) -> f32 {
        self.mini_progress
    }

    /// Progress of whichever ring currently tracks the raw download.
    pub const fn active_progress(&self) -> f32 {
        if self.tracks_mini_progress() {
            self.mini_progress
        } else {
            self.progress
        }
    }

    pub const fn tag(&self) -> ObserverTag {
        self.tag
    }

    /// File name the row is registered for, if any.
    pub fn observed_file(&self) -> Option<&str> {
        self.observing.as_deref()
    }

    pub const fn attachment(&self) -> Option<&AttachmentRef> {
        self.attachment.as_ref()
    }

    pub const fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_ref()
    }

    /// Local path resolved on the last pass.
    pub fn cache_file_path(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    pub fn session(&self) -> &Session<D, P, F> {
        &self.session
    }

    /// Visual state derived from the current button states.
    pub fn visual(&self) -> CellVisual {
        let mini_visible = self.mini.is_enabled()
            && self.mini_progress_mode == MiniProgress::VisibleAlongsideMainProgress;
        CellVisual {
            main_icon: self.button.icon(),
            mini_icon: self.mini.icon(),
            mini_visible,
            progress: self.progress,
            mini_progress: self.mini_progress,
        }
    }

    /// Drain the redraw work accumulated since the last call.
    pub fn take_render_delta(&mut self) -> RenderDelta {
        std::mem::take(&mut self.pending)
    }

    const fn tracks_mini_progress(&self) -> bool {
        matches!(
            self.mini_progress_mode,
            MiniProgress::VisibleAlongsideMainProgress
        )
    }

    fn tracks(&self, file_name: &str) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|attachment| attachment.is_resolvable() && attachment.file_name == file_name)
    }

    fn playback_state(&self, attachment: &AttachmentRef) -> ButtonState {
        let playback = &self.session.playback;
        ButtonState::from_playback(playback.is_playing(attachment), playback.is_paused())
    }

    fn ensure_observer(&mut self, attachment: &AttachmentRef) {
        if self.observing.as_deref() == Some(attachment.file_name.as_str()) {
            return;
        }
        if self.observing.is_some() {
            self.session.downloads.unregister(self.tag);
        }
        self.session
            .downloads
            .register(&attachment.file_name, attachment, self.tag);
        tracing::debug!(tag = %self.tag, file_name = %attachment.file_name, "Registered download observer");
        self.observing = Some(attachment.file_name.clone());
    }

    fn release_observer(&mut self) {
        if let Some(file_name) = self.observing.take() {
            self.session.downloads.unregister(self.tag);
            tracing::debug!(tag = %self.tag, %file_name, "Unregistered download observer");
        }
    }

    fn publish(&mut self, force: bool) -> bool {
        let next = self.visual();
        let changed = next != self.shown;
        self.pending.record(&self.shown, &next, force);
        self.shown = next;
        changed
    }
}

fn engine_progress<D: DownloadObserverPort>(downloads: &D, attachment: &AttachmentRef) -> f32 {
    downloads
        .current_progress(&attachment.file_name)
        .map_or(0.0, clamp_fraction)
}

impl<D, P, F> DownloadListener for AudioCell<D, P, F>
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    fn observer_tag(&self) -> ObserverTag {
        self.tag
    }

    fn on_progress(&mut self, file_name: &str, fraction: f32) {
        if !self.tracks(file_name) {
            return;
        }
        let fraction = clamp_fraction(fraction);
        tracing::trace!(tag = %self.tag, file_name, fraction, "Download progress");

        let already_downloading = if self.tracks_mini_progress() {
            self.mini_progress = fraction;
            self.mini == MiniButtonState::DownloadingMini
        } else {
            self.progress = fraction;
            self.button.is_downloading()
        };

        if already_downloading {
            self.publish(false);
        } else {
            self.reconcile(false);
        }
    }

    fn on_success(&mut self, file_name: &str) {
        if !self.tracks(file_name) {
            return;
        }
        tracing::debug!(tag = %self.tag, file_name, "Download finished");
        if self.tracks_mini_progress() {
            self.mini_progress = 1.0;
        } else {
            self.progress = 1.0;
        }
        self.reconcile(true);
    }

    fn on_failure(&mut self, file_name: &str, canceled: bool) {
        if !self.tracks(file_name) {
            return;
        }
        tracing::debug!(tag = %self.tag, file_name, canceled, "Download failed");
        self.reconcile(true);
    }
}

impl<D, P, F> Drop for AudioCell<D, P, F>
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    fn drop(&mut self) {
        self.release_observer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EngineCall, MemoryDownloads, MemoryFiles, MemoryPlayback};
    use crate::state::Icon;
    use pretty_assertions::assert_eq;

    type TestSession = Session<MemoryDownloads, MemoryPlayback, MemoryFiles>;
    type TestCell = AudioCell<MemoryDownloads, MemoryPlayback, MemoryFiles>;

    fn session(stream_media: bool) -> Arc<TestSession> {
        Arc::new(Session::new(
            MemoryDownloads::new(),
            MemoryPlayback::new(),
            MemoryFiles::default(),
            &PlayerSettings {
                stream_media,
                cache_dir: None,
            },
        ))
    }

    fn bound(session: &Arc<TestSession>, attachment: AttachmentRef) -> TestCell {
        let mut cell = AudioCell::new(Arc::clone(session));
        cell.bind(attachment);
        cell
    }

    fn deliver(cell: &mut TestCell, events: Vec<crate::ports::DownloadEvent>) {
        for event in events {
            event.dispatch(cell);
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn scenario_a_missing_file_needs_download() {
        let session = session(false);
        let cell = bound(&session, AttachmentRef::new("song.mp3"));

        assert_eq!(cell.button_state(), ButtonState::NeedsDownload);
        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert_eq!(cell.observed_file(), Some("song.mp3"));
        assert_eq!(
            session.downloads.observers_for("song.mp3"),
            vec![cell.tag()]
        );
    }

    #[test]
    fn scenario_b_tap_starts_download() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        session.downloads.clear_calls();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Downloading);
        assert!(approx(cell.progress(), 0.0));
        assert_eq!(
            session.downloads.calls(),
            vec![EngineCall::StartDownload {
                file_name: "song.mp3".to_string()
            }]
        );
        assert_eq!(cell.visual().main_icon, Icon::Cancel);
    }

    #[test]
    fn scenario_c_progress_keeps_downloading() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        cell.on_main_button_tapped();
        session.downloads.clear_calls();

        let events = session.downloads.progress("song.mp3", 0.42);
        deliver(&mut cell, events);

        assert_eq!(cell.button_state(), ButtonState::Downloading);
        assert!(approx(cell.progress(), 0.42));
        assert!(approx(cell.active_progress(), 0.42));
        assert!(session.downloads.calls().is_empty());
    }

    #[test]
    fn scenario_d_success_makes_playable() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        let mut cell = bound(&session, attachment.clone());
        cell.on_main_button_tapped();

        session.files.put_cached(&attachment, 4096);
        let events = session.downloads.complete("song.mp3");
        deliver(&mut cell, events);

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert!(approx(cell.progress(), 1.0));
        assert_eq!(cell.observed_file(), None);
        assert!(session.downloads.observers_for("song.mp3").is_empty());
    }

    #[test]
    fn scenario_e_streaming_with_local_file() {
        let session = session(true);
        let attachment = AttachmentRef::new("song.mp3").streamable(true);
        session.files.put_cached(&attachment, 10);
        session.playback.play_external(&attachment);

        let cell = bound(&session, attachment);

        assert_eq!(cell.button_state(), ButtonState::Playing);
        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert_eq!(
            cell.mini_progress_mode(),
            MiniProgress::HiddenBehindMainProgress
        );
        assert_eq!(cell.observed_file(), None);
        assert!(session.downloads.calls().is_empty());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        let calls = session.downloads.calls();
        let states = (cell.button_state(), cell.mini_button_state());
        cell.take_render_delta();

        assert!(!cell.reconcile(false));
        assert!(!cell.reconcile(false));

        assert_eq!((cell.button_state(), cell.mini_button_state()), states);
        assert_eq!(session.downloads.calls(), calls);
        assert!(cell.take_render_delta().is_empty());
    }

    #[test]
    fn forced_reconcile_redraws_everything() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        cell.take_render_delta();

        cell.reconcile(true);
        let delta = cell.take_render_delta();

        assert_eq!(delta.main_icon, Some(Icon::Download));
        assert_eq!(delta.mini_icon, Some(Icon::None));
        assert_eq!(delta.mini_visible, Some(false));
    }

    #[test]
    fn zero_length_file_is_purged() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        session.files.put_cached(&attachment, 0);
        let path = session.files.cache_path(&attachment);

        let cell = bound(&session, attachment);

        assert!(!session.files.contains(&path));
        assert_eq!(
            session.files.calls(),
            vec![EngineCall::RemoveFile { path: path.clone() }]
        );
        assert_eq!(cell.button_state(), ButtonState::NeedsDownload);
        assert_eq!(cell.cache_file_path(), Some(path.as_path()));
    }

    #[test]
    fn direct_attach_path_is_preferred() {
        let session = session(false);
        let attachment = AttachmentRef::new("voice.ogg")
            .voice()
            .with_attach_path("/sent/voice.ogg");
        session.files.put("/sent/voice.ogg", 512);

        let cell = bound(&session, attachment);

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.cache_file_path(), Some(Path::new("/sent/voice.ogg")));
        assert!(approx(cell.progress(), 1.0));
    }

    #[test]
    fn streaming_never_shows_download_on_main_button() {
        let session = session(true);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3").streamable(true));

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
        assert_eq!(
            cell.mini_progress_mode(),
            MiniProgress::VisibleAlongsideMainProgress
        );
        assert!(cell.visual().mini_visible);

        cell.on_mini_button_tapped();
        let events = session.downloads.progress("song.mp3", 0.3);
        deliver(&mut cell, events);

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.mini_button_state(), MiniButtonState::DownloadingMini);
        assert!(approx(cell.mini_progress(), 0.3));
        assert!(approx(cell.progress(), 0.0));

        let events = session.downloads.fail("song.mp3", false);
        deliver(&mut cell, events);
        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
    }

    #[test]
    fn streaming_picks_up_external_download() {
        let session = session(true);
        session.downloads.begin_external("song.mp3");
        session.downloads.progress("song.mp3", 0.6);

        let cell = bound(&session, AttachmentRef::new("song.mp3").streamable(true));

        assert_eq!(cell.mini_button_state(), MiniButtonState::DownloadingMini);
        assert!(approx(cell.mini_progress(), 0.6));
    }

    #[test]
    fn progress_without_downloading_state_reconciles() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        assert_eq!(cell.button_state(), ButtonState::NeedsDownload);

        // Another row started the same file.
        session.downloads.begin_external("song.mp3");
        let events = session.downloads.progress("song.mp3", 0.2);
        deliver(&mut cell, events);

        assert_eq!(cell.button_state(), ButtonState::Downloading);
        assert!(approx(cell.progress(), 0.2));
    }

    #[test]
    fn idle_tap_plays_local_file_without_downloading() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        session.files.put_cached(&attachment, 100);
        let mut cell = bound(&session, attachment.clone());
        session.downloads.clear_calls();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Playing);
        assert!(session.downloads.calls().is_empty());
        assert!(!session.downloads.is_download_in_flight("song.mp3"));
        assert_eq!(
            session.playback.calls(),
            vec![EngineCall::EnqueueAndPlay {
                attachment: attachment.id
            }]
        );
    }

    #[test]
    fn refused_play_keeps_idle() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        session.files.put_cached(&attachment, 100);
        session.playback.set_refusing(true);
        let mut cell = bound(&session, attachment);
        cell.take_render_delta();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert!(cell.take_render_delta().is_empty());
    }

    #[test]
    fn pause_tap_is_gated_on_engine() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        session.files.put_cached(&attachment, 100);
        let mut cell = bound(&session, attachment);
        cell.on_main_button_tapped();
        assert_eq!(cell.button_state(), ButtonState::Playing);

        session.playback.set_refusing(true);
        cell.on_main_button_tapped();
        assert_eq!(cell.button_state(), ButtonState::Playing);

        session.playback.set_refusing(false);
        cell.on_main_button_tapped();
        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert!(session.playback.is_paused());
    }

    #[test]
    fn cancel_tap_returns_to_needs_download() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        cell.on_main_button_tapped();
        session.downloads.clear_calls();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::NeedsDownload);
        assert_eq!(
            session.downloads.calls(),
            vec![EngineCall::CancelDownload {
                file_name: "song.mp3".to_string()
            }]
        );
        assert_eq!(cell.visual().main_icon, Icon::Download);
    }

    #[test]
    fn streaming_play_starts_mini_download() {
        let session = session(true);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3").streamable(true));
        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
        session.downloads.clear_calls();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Playing);
        assert_eq!(cell.mini_button_state(), MiniButtonState::DownloadingMini);
        assert_eq!(
            session.downloads.calls(),
            vec![EngineCall::StartDownload {
                file_name: "song.mp3".to_string()
            }]
        );
        assert!(session.downloads.is_download_in_flight("song.mp3"));
    }

    #[test]
    fn streaming_play_of_local_file_skips_download() {
        let session = session(true);
        let attachment = AttachmentRef::new("song.mp3").streamable(true);
        session.files.put_cached(&attachment, 100);
        let mut cell = bound(&session, attachment);
        assert_eq!(
            cell.mini_progress_mode(),
            MiniProgress::HiddenBehindMainProgress
        );

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Playing);
        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert!(session.downloads.calls().is_empty());
    }

    #[test]
    fn streaming_play_joins_running_mini_download() {
        let session = session(true);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3").streamable(true));
        cell.on_mini_button_tapped();
        session.downloads.clear_calls();

        cell.on_main_button_tapped();

        assert_eq!(cell.button_state(), ButtonState::Playing);
        assert!(session.downloads.calls().is_empty());
    }

    #[test]
    fn mini_cancel_tears_down_playback() {
        let session = session(true);
        let attachment = AttachmentRef::new("song.mp3").streamable(true);
        let mut cell = bound(&session, attachment);
        cell.on_main_button_tapped();
        session.downloads.clear_calls();
        session.playback.clear_calls();

        cell.on_mini_button_tapped();

        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(session.playback.calls(), vec![EngineCall::StopAndTeardown]);
        assert_eq!(
            session.downloads.calls(),
            vec![EngineCall::CancelDownload {
                file_name: "song.mp3".to_string()
            }]
        );
    }

    #[test]
    fn mini_cancel_without_playback_only_cancels() {
        let session = session(true);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3").streamable(true));
        cell.on_mini_button_tapped();
        assert!(approx(cell.mini_progress(), 0.0));
        session.downloads.clear_calls();

        cell.on_mini_button_tapped();

        assert!(session.playback.calls().is_empty());
        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
    }

    #[test]
    fn disabled_mini_ignores_taps() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        session.downloads.clear_calls();

        cell.on_mini_button_tapped();

        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert!(session.downloads.calls().is_empty());
    }

    #[test]
    fn disabled_mini_stays_disabled_for_binding() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3").streamable(true);
        let mut cell = bound(&session, attachment.clone());
        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);

        session.set_stream_media(true);
        cell.reconcile(false);
        cell.on_playback_changed();
        deliver(&mut cell, session.downloads.fail("song.mp3", true));
        cell.bind(attachment);

        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert_eq!(cell.mini_progress_mode(), MiniProgress::None);

        cell.bind(AttachmentRef::new("other.mp3").streamable(true));
        assert_eq!(cell.mini_button_state(), MiniButtonState::ReadyToDownload);
    }

    #[test]
    fn empty_file_name_is_inert() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new(""));

        cell.on_main_button_tapped();
        cell.on_progress("", 0.5);

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.observed_file(), None);
        assert!(session.downloads.calls().is_empty());
        assert!(session.playback.calls().is_empty());
    }

    #[test]
    fn unbind_drops_observer_and_late_events() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        cell.on_main_button_tapped();
        let tag = cell.tag();

        cell.unbind();
        cell.on_progress("song.mp3", 0.9);

        assert!(session.downloads.observers_for("song.mp3").is_empty());
        assert!(session
            .downloads
            .calls()
            .contains(&EngineCall::Unregister { tag }));
        assert!(approx(cell.progress(), 0.0));
    }

    #[test]
    fn events_for_other_files_are_ignored() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("song.mp3"));
        cell.on_main_button_tapped();

        cell.on_success("other.mp3");

        assert_eq!(cell.button_state(), ButtonState::Downloading);
    }

    #[test]
    fn rebinding_to_empty_name_resets_row() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("a.mp3"));
        cell.on_main_button_tapped();
        let events = session.downloads.progress("a.mp3", 0.4);
        deliver(&mut cell, events);
        assert_eq!(cell.button_state(), ButtonState::Downloading);

        cell.bind(AttachmentRef::new(""));

        assert_eq!(cell.button_state(), ButtonState::Idle);
        assert_eq!(cell.mini_button_state(), MiniButtonState::Disabled);
        assert_eq!(cell.observed_file(), None);
        assert!(session.downloads.observers_for("a.mp3").is_empty());
        assert!(approx(cell.progress(), 0.0));
        assert_eq!(cell.visual().main_icon, Icon::Play);
        assert_eq!(cell.take_render_delta().main_icon, Some(Icon::Play));

        let events = session.downloads.progress("a.mp3", 0.9);
        assert!(events.is_empty());
        cell.on_progress("a.mp3", 0.9);
        assert!(approx(cell.progress(), 0.0));
    }

    #[test]
    fn rebinding_switches_observer() {
        let session = session(false);
        let mut cell = bound(&session, AttachmentRef::new("a.mp3"));
        cell.bind(AttachmentRef::new("b.mp3"));

        assert!(session.downloads.observers_for("a.mp3").is_empty());
        assert_eq!(
            session.downloads.observers_for("b.mp3"),
            vec![cell.tag()]
        );
    }

    #[test]
    fn drop_unregisters_observer() {
        let session = session(false);
        let cell = bound(&session, AttachmentRef::new("song.mp3"));
        drop(cell);

        assert!(session.downloads.observers_for("song.mp3").is_empty());
    }

    #[test]
    fn playback_change_is_reflected() {
        let session = session(false);
        let attachment = AttachmentRef::new("song.mp3");
        session.files.put_cached(&attachment, 1);
        let mut cell = bound(&session, attachment.clone());

        session.playback.play_external(&attachment);
        cell.on_playback_changed();
        assert_eq!(cell.button_state(), ButtonState::Playing);

        session.playback.finish();
        cell.on_playback_changed();
        assert_eq!(cell.button_state(), ButtonState::Idle);
    }

    #[test]
    fn bind_derives_presentation() {
        let session = session(false);
        let cell = bound(
            &session,
            AttachmentRef::new("song.mp3").with_track("Title", "Artist"),
        );
        let presentation = cell.presentation().unwrap();
        assert_eq!(presentation.title.as_deref(), Some("Title"));
        assert_eq!(presentation.description.as_deref(), Some("Artist"));
    }
}

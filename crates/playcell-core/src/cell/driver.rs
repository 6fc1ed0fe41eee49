//! Event funnel that serializes taps and engine callbacks onto one cell.

use tokio::sync::mpsc;

use super::AudioCell;
use crate::models::AttachmentRef;
use crate::ports::{DownloadEvent, DownloadObserverPort, FileResolution, PlaybackPort};

/// Anything that can change a row's state.
#[derive(Debug, Clone, PartialEq)]
pub enum CellEvent {
    Bind(AttachmentRef),
    Unbind,
    MainTapped,
    MiniTapped,
    Download(DownloadEvent),
    PlaybackChanged,
}

/// Cloneable sender that engines and the view use to reach a running cell.
///
/// Safe to use from any thread; events are applied in send order.
#[derive(Debug, Clone)]
pub struct CellHandle {
    sender: mpsc::UnboundedSender<CellEvent>,
}

impl CellHandle {
    /// Create a handle and the receiver to pass to [`AudioCell::run`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CellEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event. Returns `false` once the cell has stopped.
    pub fn send(&self, event: CellEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn bind(&self, attachment: AttachmentRef) -> bool {
        self.send(CellEvent::Bind(attachment))
    }

    pub fn tap_main(&self) -> bool {
        self.send(CellEvent::MainTapped)
    }

    pub fn tap_mini(&self) -> bool {
        self.send(CellEvent::MiniTapped)
    }

    pub fn download(&self, event: DownloadEvent) -> bool {
        self.send(CellEvent::Download(event))
    }

    pub fn playback_changed(&self) -> bool {
        self.send(CellEvent::PlaybackChanged)
    }
}

impl<D, P, F> AudioCell<D, P, F>
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    /// Apply one event synchronously.
    pub fn handle(&mut self, event: CellEvent) {
        match event {
            CellEvent::Bind(attachment) => self.bind(attachment),
            CellEvent::Unbind => self.unbind(),
            CellEvent::MainTapped => self.on_main_button_tapped(),
            CellEvent::MiniTapped => self.on_mini_button_tapped(),
            CellEvent::Download(event) => {
                if !event.dispatch(self) {
                    tracing::trace!(
                        tag = %self.tag(),
                        event_tag = %event.tag,
                        "Dropping download event for another observer"
                    );
                }
            }
            CellEvent::PlaybackChanged => self.on_playback_changed(),
        }
    }

    /// Drain events one at a time until every [`CellHandle`] is dropped,
    /// then hand the cell back.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<CellEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::debug!(tag = %self.tag(), "Cell event loop finished");
        self
    }
}

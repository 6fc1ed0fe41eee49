//! Discrete button states and the pure transition helpers built on them.

use serde::{Deserialize, Serialize};

/// Main play/download control state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    /// Playable and not currently playing.
    #[default]
    Idle,
    /// This attachment is the active, unpaused playback item.
    Playing,
    /// No local copy and no download in flight.
    NeedsDownload,
    /// Download in flight for the main control.
    Downloading,
}

/// Secondary download control shown only while streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniButtonState {
    /// Not drawn and never receives taps.
    #[default]
    Disabled,
    /// Streaming allowed, full file not downloaded, nothing in flight.
    ReadyToDownload,
    /// Full file download in flight.
    DownloadingMini,
}

/// How the mini progress ring relates to the main one for this pass.
#[doc(alias = "HasMiniProgress")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniProgress {
    /// Streaming does not apply.
    #[default]
    None,
    /// Streaming applies and the file is already local.
    HiddenBehindMainProgress,
    /// Streaming applies and the file is not yet fully local.
    VisibleAlongsideMainProgress,
}

impl MiniProgress {
    /// Whether streaming applies at all.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Icon drawn for a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Play,
    Pause,
    Download,
    Cancel,
    None,
}

impl ButtonState {
    /// Icon for the main control.
    #[must_use]
    pub const fn icon(self) -> Icon {
        match self {
            Self::Idle => Icon::Play,
            Self::Playing => Icon::Pause,
            Self::NeedsDownload => Icon::Download,
            Self::Downloading => Icon::Cancel,
        }
    }

    /// Whether the main control is tracking a download.
    #[must_use]
    pub const fn is_downloading(self) -> bool {
        matches!(self, Self::Downloading)
    }

    /// Derive the playable state from playback truth.
    #[must_use]
    pub const fn from_playback(playing: bool, paused: bool) -> Self {
        if playing && !paused {
            Self::Playing
        } else {
            Self::Idle
        }
    }

    /// Derive the download state from the engine's in-flight flag.
    #[must_use]
    pub const fn from_download(in_flight: bool) -> Self {
        if in_flight {
            Self::Downloading
        } else {
            Self::NeedsDownload
        }
    }
}

impl MiniButtonState {
    /// Icon for the mini control.
    #[must_use]
    pub const fn icon(self) -> Icon {
        match self {
            Self::Disabled => Icon::None,
            Self::ReadyToDownload => Icon::Download,
            Self::DownloadingMini => Icon::Cancel,
        }
    }

    /// Whether the mini control is drawn and accepts taps.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Derive the enabled state from the engine's in-flight flag.
    #[must_use]
    pub const fn from_download(in_flight: bool) -> Self {
        if in_flight {
            Self::DownloadingMini
        } else {
            Self::ReadyToDownload
        }
    }
}

/// Engine work requested by a main-control tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainTapAction {
    /// Enqueue and play; also start the full download when the mini
    /// control was ready to fetch it.
    Play { start_download: bool },
    /// Pause the active item.
    Pause,
    /// Reset progress and start downloading.
    StartDownload,
    /// Cancel the in-flight download.
    CancelDownload,
}

/// Engine work requested by a mini-control tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiniTapAction {
    /// Reset mini progress and start downloading.
    StartDownload,
    /// Stop playback if this item is playing, then cancel the download.
    CancelDownload,
    /// Control is disabled.
    Ignore,
}

/// Decide what a main-control tap does.
#[must_use]
pub const fn main_tap_action(button: ButtonState, mini: MiniButtonState) -> MainTapAction {
    match button {
        ButtonState::Idle => MainTapAction::Play {
            start_download: matches!(mini, MiniButtonState::ReadyToDownload),
        },
        ButtonState::Playing => MainTapAction::Pause,
        ButtonState::NeedsDownload => MainTapAction::StartDownload,
        ButtonState::Downloading => MainTapAction::CancelDownload,
    }
}

/// Next main state once `action` has run; `accepted` is the playback
/// engine's verdict for `Play`/`Pause` and ignored otherwise.
#[must_use]
pub const fn main_state_after(
    button: ButtonState,
    action: MainTapAction,
    accepted: bool,
) -> ButtonState {
    match action {
        MainTapAction::Play { .. } if accepted => ButtonState::Playing,
        MainTapAction::Pause if accepted => ButtonState::Idle,
        MainTapAction::StartDownload => ButtonState::Downloading,
        MainTapAction::CancelDownload => ButtonState::NeedsDownload,
        _ => button,
    }
}

/// Decide what a mini-control tap does.
#[must_use]
pub const fn mini_tap_action(mini: MiniButtonState) -> MiniTapAction {
    match mini {
        MiniButtonState::Disabled => MiniTapAction::Ignore,
        MiniButtonState::ReadyToDownload => MiniTapAction::StartDownload,
        MiniButtonState::DownloadingMini => MiniTapAction::CancelDownload,
    }
}

/// Next mini state once `action` has run.
#[must_use]
pub const fn mini_state_after(mini: MiniButtonState, action: MiniTapAction) -> MiniButtonState {
    match action {
        MiniTapAction::StartDownload => MiniButtonState::DownloadingMini,
        MiniTapAction::CancelDownload => MiniButtonState::ReadyToDownload,
        MiniTapAction::Ignore => mini,
    }
}

use std::path::Path;
use std::sync::Arc;

use playcell_core::memory::{MemoryDownloads, MemoryFiles, MemoryPlayback};
use playcell_core::ports::{DownloadEvent, FileResolution};
use playcell_core::{AttachmentRef, AudioCell, CellEvent, PlayerSettings, Session};
use serde::Deserialize;

use crate::commands::common::{cell_report, print_reports, CellReport};
use crate::error::CliError;

type MemorySession = Session<MemoryDownloads, MemoryPlayback, MemoryFiles>;
type MemoryCell = AudioCell<MemoryDownloads, MemoryPlayback, MemoryFiles>;

/// A scripted sequence of taps and engine callbacks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub stream_media: bool,
    pub attachment: AttachmentRef,
    /// Size of a cached copy present before the first step.
    #[serde(default)]
    pub cached_bytes: Option<u64>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum Step {
    Bind,
    Unbind,
    TapMain,
    TapMini,
    Progress { fraction: f32 },
    Complete {
        #[serde(default = "default_completed_bytes")]
        bytes: u64,
    },
    Fail {
        #[serde(default)]
        canceled: bool,
    },
    PlaybackStopped,
    SetStreamMedia { enabled: bool },
}

const fn default_completed_bytes() -> u64 {
    1
}

impl Step {
    fn label(self) -> String {
        match self {
            Self::Bind => "bind".to_string(),
            Self::Unbind => "unbind".to_string(),
            Self::TapMain => "tap_main".to_string(),
            Self::TapMini => "tap_mini".to_string(),
            Self::Progress { fraction } => format!("progress {fraction:.2}"),
            Self::Complete { .. } => "complete".to_string(),
            Self::Fail { canceled: true } => "cancel".to_string(),
            Self::Fail { canceled: false } => "fail".to_string(),
            Self::PlaybackStopped => "playback_stopped".to_string(),
            Self::SetStreamMedia { enabled } => format!("stream_media={enabled}"),
        }
    }
}

pub fn load_script(path: &Path) -> Result<Script, CliError> {
    let content = std::fs::read_to_string(path)?;
    parse_script(&content, path)
}

pub fn parse_script(content: &str, path: &Path) -> Result<Script, CliError> {
    let script: Script =
        serde_json::from_str(content).map_err(|error| CliError::InvalidScript {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
    if script.steps.is_empty() {
        return Err(CliError::EmptyScript);
    }
    Ok(script)
}

/// Replay `script` against in-memory engines, reporting after every step.
pub fn run_script(script: &Script) -> Vec<CellReport> {
    let session: Arc<MemorySession> = Arc::new(Session::new(
        MemoryDownloads::new(),
        MemoryPlayback::new(),
        MemoryFiles::default(),
        &PlayerSettings {
            stream_media: script.stream_media,
            cache_dir: None,
        },
    ));
    if let Some(bytes) = script.cached_bytes {
        session.files.put_cached(&script.attachment, bytes);
    }

    let mut cell: MemoryCell = AudioCell::new(Arc::clone(&session));
    let mut reports = Vec::with_capacity(script.steps.len());
    for step in &script.steps {
        apply_step(&session, &mut cell, &script.attachment, *step);
        reports.push(cell_report(step.label(), &cell));
    }
    reports
}

fn apply_step(
    session: &MemorySession,
    cell: &mut MemoryCell,
    attachment: &AttachmentRef,
    step: Step,
) {
    let file_name = attachment.file_name.as_str();
    match step {
        Step::Bind => cell.handle(CellEvent::Bind(attachment.clone())),
        Step::Unbind => cell.handle(CellEvent::Unbind),
        Step::TapMain => cell.handle(CellEvent::MainTapped),
        Step::TapMini => cell.handle(CellEvent::MiniTapped),
        Step::Progress { fraction } => {
            deliver(cell, session.downloads.progress(file_name, fraction));
        }
        Step::Complete { bytes } => {
            session
                .files
                .put(session.files.cache_path(attachment), bytes);
            deliver(cell, session.downloads.complete(file_name));
        }
        Step::Fail { canceled } => {
            deliver(cell, session.downloads.fail(file_name, canceled));
        }
        Step::PlaybackStopped => {
            session.playback.finish();
            cell.handle(CellEvent::PlaybackChanged);
        }
        Step::SetStreamMedia { enabled } => {
            session.set_stream_media(enabled);
            cell.reconcile(false);
        }
    }
}

fn deliver(cell: &mut MemoryCell, events: Vec<DownloadEvent>) {
    for event in events {
        cell.handle(CellEvent::Download(event));
    }
}

pub fn run_simulate(script_path: &Path, as_json: bool) -> Result<(), CliError> {
    let script = load_script(script_path)?;
    let reports = run_script(&script);
    print_reports(&reports, as_json)?;
    Ok(())
}

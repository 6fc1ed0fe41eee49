use playcell_core::ports::{DownloadObserverPort, FileResolution, PlaybackPort};
use playcell_core::{AudioCell, ButtonState, Icon, MiniButtonState, MiniProgress};
use serde::Serialize;

/// Snapshot of a row printed after each command or step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    pub label: String,
    pub button: ButtonState,
    pub mini_button: MiniButtonState,
    pub mini_progress_mode: MiniProgress,
    pub main_icon: Icon,
    pub mini_icon: Icon,
    pub progress: f32,
    pub mini_progress: f32,
    pub observing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn cell_report<D, P, F>(label: impl Into<String>, cell: &AudioCell<D, P, F>) -> CellReport
where
    D: DownloadObserverPort,
    P: PlaybackPort,
    F: FileResolution,
{
    let visual = cell.visual();
    let presentation = cell.presentation();
    CellReport {
        label: label.into(),
        button: cell.button_state(),
        mini_button: cell.mini_button_state(),
        mini_progress_mode: cell.mini_progress_mode(),
        main_icon: visual.main_icon,
        mini_icon: visual.mini_icon,
        progress: visual.progress,
        mini_progress: visual.mini_progress,
        observing: cell.observed_file().is_some(),
        cache_file: cell
            .cache_file_path()
            .map(|path| path.display().to_string()),
        title: presentation.and_then(|value| value.title.clone()),
        description: presentation.and_then(|value| value.description.clone()),
    }
}

pub fn format_report_line(report: &CellReport) -> String {
    let mut line = format!(
        "{:<18} main={:<14} mini={:<16} progress={:>3}% mini_progress={:>3}%",
        report.label,
        format!("{:?}", report.button),
        format!("{:?}", report.mini_button),
        percent(report.progress),
        percent(report.mini_progress),
    );
    if report.observing {
        line.push_str(" observing");
    }
    line
}

fn percent(fraction: f32) -> u8 {
    let scaled = (fraction.clamp(0.0, 1.0) * 100.0).round();
    // Clamped above, so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = scaled as u8;
    value
}

pub fn print_reports(reports: &[CellReport], as_json: bool) -> Result<(), serde_json::Error> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            println!("{}", format_report_line(report));
        }
    }
    Ok(())
}

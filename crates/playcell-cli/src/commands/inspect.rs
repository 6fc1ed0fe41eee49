use std::path::PathBuf;
use std::sync::Arc;

use playcell_core::config::cache_dir_for;
use playcell_core::memory::{MemoryDownloads, MemoryPlayback};
use playcell_core::storage::FsFileResolver;
use playcell_core::{AttachmentRef, AudioCell, PlayerSettings, Session};

use crate::commands::common::{cell_report, print_reports, CellReport};
use crate::error::CliError;

#[derive(Debug, Clone, Default)]
pub struct InspectArgs {
    pub file_name: String,
    pub cache_dir: Option<PathBuf>,
    pub attach_path: Option<PathBuf>,
    pub streamable: bool,
    pub stream_media: bool,
    pub voice: bool,
}

/// Bind a row against the real cache with idle engines and report it.
pub fn inspect_attachment(
    args: InspectArgs,
    settings: &PlayerSettings,
) -> Result<CellReport, CliError> {
    let file_name = args.file_name.trim().to_string();
    if file_name.is_empty() {
        return Err(CliError::EmptyFileName);
    }

    let mut settings = settings.clone();
    settings.stream_media |= args.stream_media;
    let cache_dir = args.cache_dir.unwrap_or_else(|| cache_dir_for(&settings));
    tracing::debug!("Inspecting {} in {}", file_name, cache_dir.display());

    let session = Arc::new(Session::new(
        MemoryDownloads::new(),
        MemoryPlayback::new(),
        FsFileResolver::new(cache_dir),
        &settings,
    ));

    let mut attachment = AttachmentRef::new(file_name).streamable(args.streamable);
    if let Some(path) = args.attach_path {
        attachment = attachment.with_attach_path(path);
    }
    if args.voice {
        attachment = attachment.voice();
    }

    let mut cell = AudioCell::new(session);
    cell.bind(attachment);
    Ok(cell_report("inspect", &cell))
}

pub fn run_inspect(
    args: InspectArgs,
    settings: &PlayerSettings,
    as_json: bool,
) -> Result<(), CliError> {
    let report = inspect_attachment(args, settings)?;
    if as_json {
        print_reports(std::slice::from_ref(&report), true)?;
        return Ok(());
    }

    print_reports(std::slice::from_ref(&report), false)?;
    if let Some(path) = &report.cache_file {
        println!("cache file: {path}");
    }
    if let Some(title) = &report.title {
        println!("title: {title}");
    }
    if let Some(description) = &report.description {
        println!("description: {description}");
    }
    Ok(())
}

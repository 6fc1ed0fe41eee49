//! Player settings model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Session-wide playback settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Allow playback to start before an attachment is fully downloaded
    #[serde(default)]
    pub stream_media: bool,
    /// Directory holding canonical cached copies of attachments
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

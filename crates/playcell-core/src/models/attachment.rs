//! Attachment model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for an attachment, using UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    /// Create a new unique attachment ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttachmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// What kind of playable document the attachment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Music track carrying title/performer metadata.
    #[default]
    Music,
    /// Recorded voice message.
    Voice,
}

/// Embedded thumbnail variant attached to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// The audio/voice document a row is bound to.
///
/// Carries everything the state machine needs to locate the local copy and
/// to address the download engine, plus presentation-only metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Stable identifier used by the playback engine.
    #[serde(default)]
    pub id: AttachmentId,
    /// Derived file name used for observer registration. May be empty.
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub file_name: String,
    /// Direct local path, set when this device produced the file.
    #[serde(default)]
    pub attach_path: Option<PathBuf>,
    /// Music or voice presentation.
    #[serde(default)]
    pub kind: AttachmentKind,
    /// Whether the surrounding dialog allows playback before full download.
    #[serde(default)]
    pub dialog_is_streamable: bool,
    /// Track title from the audio metadata.
    #[serde(default)]
    pub title: Option<String>,
    /// Track performer from the audio metadata.
    #[serde(default)]
    pub performer: Option<String>,
    /// Display name of the voice message sender.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Remote artwork URL used when no thumbnail is embedded.
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Embedded thumbnail, if any.
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

impl AttachmentRef {
    /// Create a music attachment reference for a file name.
    ///
    /// An empty name is accepted; such an attachment never downloads.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: AttachmentId::new(),
            file_name: file_name.into().trim().to_string(),
            attach_path: None,
            kind: AttachmentKind::Music,
            dialog_is_streamable: false,
            title: None,
            performer: None,
            sender_name: None,
            artwork_url: None,
            thumbnail: None,
        }
    }

    /// Mark the attachment as a voice message.
    #[must_use]
    pub const fn voice(mut self) -> Self {
        self.kind = AttachmentKind::Voice;
        self
    }

    /// Set whether the dialog permits streaming playback.
    #[must_use]
    pub const fn streamable(mut self, streamable: bool) -> Self {
        self.dialog_is_streamable = streamable;
        self
    }

    /// Set the direct local attach path.
    #[must_use]
    pub fn with_attach_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.attach_path = Some(path.into());
        self
    }

    /// Set track title and performer.
    #[must_use]
    pub fn with_track(mut self, title: impl Into<String>, performer: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.performer = Some(performer.into());
        self
    }

    /// Whether the attachment carries music metadata.
    #[must_use]
    pub const fn has_music_metadata(&self) -> bool {
        matches!(self.kind, AttachmentKind::Music)
    }

    /// Whether the attachment is a recorded voice message.
    #[must_use]
    pub const fn is_voice_message(&self) -> bool {
        matches!(self.kind, AttachmentKind::Voice)
    }

    /// Whether there is a file name to track downloads by.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        !self.file_name.is_empty()
    }

    /// Direct attach path, ignoring empty values.
    #[must_use]
    pub fn direct_path(&self) -> Option<&Path> {
        self.attach_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

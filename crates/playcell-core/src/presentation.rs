//! Display values derived from attachment metadata.
//!
//! Every field is derived on its own: a missing or unusable value leaves that
//! field empty without affecting the others or the button state machine.

use serde::Serialize;

use crate::models::{AttachmentRef, Thumbnail};
use crate::util::{normalize_text_option, single_line};

/// Smallest thumbnail side that is worth drawing as an overlay.
pub const MIN_THUMBNAIL_SIDE: u32 = 90;

const VOICE_TITLE: &str = "Voice message";
const UNKNOWN_TITLE: &str = "Unknown Track";
const UNKNOWN_PERFORMER: &str = "Unknown Artist";

/// Image drawn behind the main control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ArtworkOverlay {
    Thumbnail { width: u32, height: u32 },
    Remote { url: String },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub overlay: ArtworkOverlay,
}

impl Presentation {
    #[must_use]
    pub fn derive(attachment: &AttachmentRef) -> Self {
        Self {
            title: title_for(attachment),
            description: description_for(attachment),
            overlay: overlay_for(attachment),
        }
    }

    /// Spoken label for assistive technologies.
    #[must_use]
    pub fn accessibility_label(&self) -> Option<String> {
        match (&self.description, &self.title) {
            (Some(description), Some(title)) => Some(format!("{description}, {title}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

fn clean(value: Option<&String>) -> Option<String> {
    normalize_text_option(value.map(|value| single_line(value)))
}

fn title_for(attachment: &AttachmentRef) -> Option<String> {
    if attachment.is_voice_message() {
        return Some(VOICE_TITLE.to_string());
    }
    clean(attachment.title.as_ref())
        .or_else(|| clean(Some(&attachment.file_name)))
        .or_else(|| Some(UNKNOWN_TITLE.to_string()))
}

fn description_for(attachment: &AttachmentRef) -> Option<String> {
    if attachment.is_voice_message() {
        return clean(attachment.sender_name.as_ref());
    }
    clean(attachment.performer.as_ref()).or_else(|| Some(UNKNOWN_PERFORMER.to_string()))
}

fn overlay_for(attachment: &AttachmentRef) -> ArtworkOverlay {
    if let Some(Thumbnail { width, height }) = attachment.thumbnail {
        if width.max(height) >= MIN_THUMBNAIL_SIDE {
            return ArtworkOverlay::Thumbnail { width, height };
        }
    }
    normalize_text_option(attachment.artwork_url.clone())
        .map_or(ArtworkOverlay::None, |url| ArtworkOverlay::Remote { url })
}

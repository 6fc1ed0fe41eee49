//! Data models for playcell

mod attachment;
mod settings;

pub use attachment::{AttachmentId, AttachmentKind, AttachmentRef, Thumbnail};
pub use settings::PlayerSettings;

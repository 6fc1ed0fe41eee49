//! playcell-core - Core library for playcell
//!
//! This crate contains the attachment models, the download/playback ports and
//! the button state machine that keeps a playable audio row consistent with
//! the download and playback engines it drives.

pub mod cell;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod ports;
pub mod presentation;
pub mod state;
pub mod storage;
pub mod util;

pub use cell::{AudioCell, CellEvent, CellHandle, CellVisual, RenderDelta, Session};
pub use error::{Error, Result};
pub use models::{AttachmentId, AttachmentKind, AttachmentRef, PlayerSettings, Thumbnail};
pub use state::{ButtonState, Icon, MiniButtonState, MiniProgress};

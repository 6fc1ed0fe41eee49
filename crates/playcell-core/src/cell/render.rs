//! What the view draws, and the minimal changes it has to apply.

use serde::Serialize;

use crate::state::Icon;

/// Full visual state of a row's controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellVisual {
    pub main_icon: Icon,
    pub mini_icon: Icon,
    pub mini_visible: bool,
    pub progress: f32,
    pub mini_progress: f32,
}

impl Default for CellVisual {
    fn default() -> Self {
        Self {
            main_icon: Icon::Play,
            mini_icon: Icon::None,
            mini_visible: false,
            progress: 0.0,
            mini_progress: 0.0,
        }
    }
}

/// Fields the view must redraw. `None` means unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RenderDelta {
    pub main_icon: Option<Icon>,
    pub mini_icon: Option<Icon>,
    pub mini_visible: Option<bool>,
    pub progress: Option<f32>,
    pub mini_progress: Option<f32>,
}

impl RenderDelta {
    /// Nothing to redraw.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.main_icon.is_none()
            && self.mini_icon.is_none()
            && self.mini_visible.is_none()
            && self.progress.is_none()
            && self.mini_progress.is_none()
    }

    /// Record the difference between `previous` and `next`; every field when
    /// `force` is set.
    pub fn record(&mut self, previous: &CellVisual, next: &CellVisual, force: bool) {
        if force || previous.main_icon != next.main_icon {
            self.main_icon = Some(next.main_icon);
        }
        if force || previous.mini_icon != next.mini_icon {
            self.mini_icon = Some(next.mini_icon);
        }
        if force || previous.mini_visible != next.mini_visible {
            self.mini_visible = Some(next.mini_visible);
        }
        if force || differs(previous.progress, next.progress) {
            self.progress = Some(next.progress);
        }
        if force || differs(previous.mini_progress, next.mini_progress) {
            self.mini_progress = Some(next.mini_progress);
        }
    }
}

fn differs(a: f32, b: f32) -> bool {
    (a - b).abs() > f32::EPSILON
}

// SPDX-License-Identifier: GPL-3.0-only

//! Touch-to-focus overlay
//!
//! Translates touches on the main preview into sensor-space focus and
//! metering regions, drives the focus indicator and schedules the
//! delayed return to continuous autofocus.

use crate::backends::camera::inspector::CameraInfo;
use crate::backends::camera::types::{AfState, MeteringRect, Rect, SensorRotation};
use crate::constants::{FOCUS_AREA_FRACTION, METERING_AREA_SCALE, METERING_WEIGHT_MAX};
use crate::ui::UiSink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Called with the timer generation when a focus reset is due
pub type ResetNotifier = Arc<dyn Fn(u64) + Send + Sync>;

pub struct FocusOverlayController {
    ui: Arc<dyn UiSink>,
    notifier: ResetNotifier,
    reset_delay: Duration,
    preview_width: u32,
    preview_height: u32,
    active_array: Rect,
    orientation: SensorRotation,
    generation: u64,
    pending: Option<tokio::task::JoinHandle<()>>,
}

impl FocusOverlayController {
    pub fn new(ui: Arc<dyn UiSink>, reset_delay: Duration, notifier: ResetNotifier) -> Self {
        Self {
            ui,
            notifier,
            reset_delay,
            preview_width: 0,
            preview_height: 0,
            active_array: Rect::default(),
            orientation: SensorRotation::None,
            generation: 0,
            pending: None,
        }
    }

    /// Record the main preview size and the main device geometry
    pub fn on_preview_changed(&mut self, width: u32, height: u32, info: &CameraInfo) {
        debug!(
            width,
            height,
            orientation = %info.sensor_orientation,
            "Focus overlay geometry updated"
        );
        self.preview_width = width;
        self.preview_height = height;
        self.active_array = info.active_array;
        self.orientation = info.sensor_orientation;
    }

    /// Show the indicator at (x, y) and restart the reset timer
    pub fn start_focus(&mut self, x: f32, y: f32) {
        self.ui.show_focus(x, y);
        self.remove_delay_message();

        let generation = self.generation;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let notifier = Arc::clone(&self.notifier);
                let delay = self.reset_delay;
                self.pending = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier(generation);
                }));
            }
            Err(_) => trace!("No runtime, focus reset not scheduled"),
        }
    }

    /// Whether a reset for `generation` is still wanted
    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && generation == self.generation
    }

    /// Consume the pending reset, if `generation` is the live one
    pub fn take_reset(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Cancel any scheduled reset
    pub fn remove_delay_message(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        // A timer that already fired may still be queued; bumping the
        // generation makes it stale
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn hide_focus_ui(&self) {
        self.ui.hide_focus();
    }

    pub fn on_af_state_changed(&self, state: AfState) {
        match state {
            AfState::Focused => self.ui.focus_succeeded(),
            AfState::Failed => self.ui.focus_failed(),
            AfState::Idle | AfState::Scanning => {}
        }
    }

    /// Sensor-space region for a touch at preview coordinates (x, y)
    ///
    /// The focus region is a square of a fifth of the shorter preview side,
    /// the metering region is half as large again.
    pub fn focus_area(&self, x: f32, y: f32, is_focus: bool) -> MeteringRect {
        let (width, height) = if self.preview_width == 0 || self.preview_height == 0 {
            (
                self.active_array.width().max(0) as u32,
                self.active_array.height().max(0) as u32,
            )
        } else {
            (self.preview_width, self.preview_height)
        };

        let scale = if is_focus { 1.0 } else { METERING_AREA_SCALE };
        let side = (width.min(height) as f32 * FOCUS_AREA_FRACTION * scale).round() as i64;
        let side = side.clamp(0, width.min(height) as i64);

        let left = (x.round() as i64 - side / 2).clamp(0, width as i64 - side);
        let top = (y.round() as i64 - side / 2).clamp(0, height as i64 - side);

        let preview = PreviewSquare {
            left: left as f64 / width.max(1) as f64,
            top: top as f64 / height.max(1) as f64,
            right: (left + side) as f64 / width.max(1) as f64,
            bottom: (top + side) as f64 / height.max(1) as f64,
        };

        MeteringRect {
            rect: self.to_sensor(preview),
            weight: METERING_WEIGHT_MAX,
        }
    }

    fn to_sensor(&self, square: PreviewSquare) -> Rect {
        let (x0, y0) = rotate(square.left, square.top, self.orientation);
        let (x1, y1) = rotate(square.right, square.bottom, self.orientation);

        let array = self.active_array;
        let map_x = |n: f64| array.left + (n * array.width() as f64).round() as i32;
        let map_y = |n: f64| array.top + (n * array.height() as f64).round() as i32;

        Rect::new(
            map_x(x0.min(x1)).clamp(array.left, array.right),
            map_y(y0.min(y1)).clamp(array.top, array.bottom),
            map_x(x0.max(x1)).clamp(array.left, array.right),
            map_y(y0.max(y1)).clamp(array.top, array.bottom),
        )
    }
}

impl Drop for FocusOverlayController {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// Normalised square in upright preview coordinates
#[derive(Debug, Clone, Copy)]
struct PreviewSquare {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

/// Map a normalised upright-preview point onto the normalised sensor array
fn rotate(x: f64, y: f64, orientation: SensorRotation) -> (f64, f64) {
    match orientation {
        SensorRotation::None => (x, y),
        SensorRotation::Rotate90 => (y, 1.0 - x),
        SensorRotation::Rotate180 => (1.0 - x, 1.0 - y),
        SensorRotation::Rotate270 => (1.0 - y, x),
    }
}

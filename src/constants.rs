// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Number of per-device picture callbacks that complete one dual capture
pub const DUAL_CAPTURE_BARRIER: u8 = 2;

/// Role labels attached to persisted pictures
pub const ROLE_LABEL_MAIN: &str = "MAIN";
pub const ROLE_LABEL_AUX: &str = "AUX";

/// Focus/metering region weight (maximum accepted by the HAL)
pub const METERING_WEIGHT_MAX: u32 = 1000;

/// Side of the focus square as a fraction of the shorter preview side
pub const FOCUS_AREA_FRACTION: f32 = 0.2;

/// Metering square is this much larger than the focus square
pub const METERING_AREA_SCALE: f32 = 1.5;

/// Longest edge of generated thumbnails in pixels
pub const THUMBNAIL_MAX_EDGE: u32 = 160;

/// Delay before a touch-to-focus region reverts to continuous autofocus
pub const DEFAULT_FOCUS_RESET_DELAY: Duration = Duration::from_millis(3000);

/// Default JPEG quality for re-encoded pictures
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Virtual platform defaults
pub mod virtual_sensor {
    /// Active pixel array of the synthetic sensors
    pub const ACTIVE_ARRAY_WIDTH: u32 = 4032;
    pub const ACTIVE_ARRAY_HEIGHT: u32 = 3024;

    /// Still capture size produced by the synthetic sensors
    pub const STILL_WIDTH: u32 = 640;
    pub const STILL_HEIGHT: u32 = 480;

    /// Preview frame size
    pub const PREVIEW_WIDTH: u32 = 320;
    pub const PREVIEW_HEIGHT: u32 = 240;

    pub const DEFAULT_PREVIEW_FPS: u32 = 30;
}

/// Timeouts used by the command-line front end
pub mod cli_timing {
    use std::time::Duration;

    /// Maximum wait for both devices to open and preview to start
    pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum wait for both pictures to be persisted
    pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);
}

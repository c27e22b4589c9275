// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the device layer and capture sessions

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// One of the two device slots managed by a composite module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Main,
    Aux,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Main, Role::Aux];

    /// Label attached to persisted pictures ("MAIN" / "AUX")
    pub fn label(&self) -> &'static str {
        match self {
            Role::Main => crate::constants::ROLE_LABEL_MAIN,
            Role::Aux => crate::constants::ROLE_LABEL_AUX,
        }
    }

    /// Index into per-role arrays
    pub fn index(&self) -> usize {
        match self {
            Role::Main => 0,
            Role::Aux => 1,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Opaque reference to an opened hardware device
///
/// Produced by the device layer, owned by the coordinator until it is
/// moved into the capture session bound to the same role.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    camera_id: String,
    token: uuid::Uuid,
}

impl DeviceHandle {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            token: uuid::Uuid::new_v4(),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Unique token of this open instance (differs across reopen)
    pub fn token(&self) -> uuid::Uuid {
        self.token
    }
}

/// Platform video sink a preview stream renders into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceTarget {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl SurfaceTarget {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Phone sensors are commonly mounted at 90° or 270° relative to the
/// natural display orientation, so touch coordinates have to be rotated
/// before they can address the sensor array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Integer rectangle in sensor pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Focus or metering region with its weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteringRect {
    pub rect: Rect,
    pub weight: u32,
}

/// Autofocus mode applied to a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    Off,
    Auto,
    #[default]
    ContinuousPicture,
    ContinuousVideo,
}

/// Autofocus state reported by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfState {
    #[default]
    Idle,
    Scanning,
    Focused,
    Failed,
}

/// Static properties reported by the device layer, undecoded
///
/// Codes follow the common camera HAL numbering, see
/// [`crate::backends::camera::inspector`] for the decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCharacteristics {
    pub lens_facing: Option<i32>,
    pub focal_lengths: Vec<f32>,
    pub hardware_level: Option<i32>,
    pub capabilities: Vec<i32>,
    pub active_array: Rect,
    pub sensor_orientation: i32,
}

/// A single preview frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels
    pub data: Arc<[u8]>,
    /// Monotonic sequence number within one preview stream
    pub sequence: u64,
    pub captured_at: Instant,
}

/// State of a per-device capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unbound,
    Bound,
    Previewing,
    Capturing,
    Released,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Unbound => "UNBOUND",
            SessionState::Bound => "BOUND",
            SessionState::Previewing => "PREVIEWING",
            SessionState::Capturing => "CAPTURING",
            SessionState::Released => "RELEASED",
        };
        write!(f, "{}", name)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for device layer and streaming operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Device could not be opened
    OpenFailed(String),
    /// Device disconnected while in use
    Disconnected,
    /// Stream configuration or capture request failed
    SessionFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::OpenFailed(msg) => write!(f, "Open failed: {}", msg),
            BackendError::Disconnected => write!(f, "Device disconnected"),
            BackendError::SessionFailed(msg) => write!(f, "Session failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Result type for capture session commands
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from capture session commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Command not valid in the current state; the command was dropped
    InvalidState {
        command: &'static str,
        state: SessionState,
    },
    /// Session has been released
    Released,
    /// The streaming layer rejected the command
    Backend(BackendError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidState { command, state } => {
                write!(f, "{} not allowed in state {}", command, state)
            }
            SessionError::Released => write!(f, "Session released"),
            SessionError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_normalisation() {
        assert_eq!(SensorRotation::from_degrees_int(-90), SensorRotation::Rotate270);
        assert_eq!(SensorRotation::from_degrees_int(450), SensorRotation::Rotate90);
        assert_eq!(SensorRotation::from_degrees_int(45), SensorRotation::None);
        assert!(SensorRotation::Rotate270.swaps_dimensions());
        assert!(!SensorRotation::Rotate180.swaps_dimensions());
    }

    #[test]
    fn test_device_handles_are_unique() {
        let a = DeviceHandle::new("0");
        let b = DeviceHandle::new("0");
        assert_eq!(a.camera_id(), b.camera_id());
        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Main.label(), "MAIN");
        assert_eq!(Role::Aux.to_string(), "AUX");
        assert_eq!(Role::Aux.index(), 1);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Capability inspection
//!
//! Decodes the raw numeric characteristics reported by the device layer
//! into typed descriptions. Lookups never fail: an unknown identifier
//! yields `None` and an unrecognised capability code becomes
//! [`Capability::Other`].

use super::CharacteristicsSource;
use super::types::{RawCharacteristics, Rect, SensorRotation};
use tracing::{debug, info};

/// Direction the lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Front,
    Back,
    External,
    Unknown,
}

impl Facing {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Facing::Front,
            Some(1) => Facing::Back,
            Some(_) => Facing::External,
            None => Facing::Unknown,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Facing::Front => "FRONT",
            Facing::Back => "BACK",
            Facing::External => "EXTERNAL",
            Facing::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Supported hardware level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareLevel {
    Legacy,
    Limited,
    Full,
    Level3,
    Unknown,
}

impl HardwareLevel {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => HardwareLevel::Limited,
            Some(1) => HardwareLevel::Full,
            Some(2) => HardwareLevel::Legacy,
            Some(3) => HardwareLevel::Level3,
            _ => HardwareLevel::Unknown,
        }
    }
}

impl std::fmt::Display for HardwareLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HardwareLevel::Legacy => "LEGACY",
            HardwareLevel::Limited => "LIMITED",
            HardwareLevel::Full => "FULL",
            HardwareLevel::Level3 => "LEVEL_3",
            HardwareLevel::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Hardware feature flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BackwardCompatible,
    ManualSensor,
    ManualPostProcessing,
    Raw,
    PrivateReprocessing,
    ReadSensorSettings,
    BurstCapture,
    YuvReprocessing,
    DepthOutput,
    ConstrainedHighSpeedVideo,
    MotionTracking,
    LogicalMultiCamera,
    Monochrome,
    /// Code without a known name
    Other(i32),
}

impl Capability {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Capability::BackwardCompatible,
            1 => Capability::ManualSensor,
            2 => Capability::ManualPostProcessing,
            3 => Capability::Raw,
            4 => Capability::PrivateReprocessing,
            5 => Capability::ReadSensorSettings,
            6 => Capability::BurstCapture,
            7 => Capability::YuvReprocessing,
            8 => Capability::DepthOutput,
            9 => Capability::ConstrainedHighSpeedVideo,
            10 => Capability::MotionTracking,
            11 => Capability::LogicalMultiCamera,
            12 => Capability::Monochrome,
            other => Capability::Other(other),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::BackwardCompatible => "BACKWARD_COMPATIBLE",
            Capability::ManualSensor => "MANUAL_SENSOR",
            Capability::ManualPostProcessing => "MANUAL_POST_PROCESSING",
            Capability::Raw => "RAW",
            Capability::PrivateReprocessing => "PRIVATE_REPROCESSING",
            Capability::ReadSensorSettings => "READ_SENSOR_SETTINGS",
            Capability::BurstCapture => "BURST_CAPTURE",
            Capability::YuvReprocessing => "YUV_REPROCESSING",
            Capability::DepthOutput => "DEPTH_OUTPUT",
            Capability::ConstrainedHighSpeedVideo => "CONSTRAINED_HIGH_SPEED_VIDEO",
            Capability::MotionTracking => "MOTION_TRACKING",
            Capability::LogicalMultiCamera => "LOGICAL_MULTI_CAMERA",
            Capability::Monochrome => "MONOCHROME",
            Capability::Other(code) => return write!(f, "CAPABILITY_{}", code),
        };
        write!(f, "{}", name)
    }
}

/// Decoded static description of one device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub id: String,
    pub facing: Facing,
    pub focal_lengths: Vec<f32>,
    pub hardware_level: HardwareLevel,
    pub capabilities: Vec<Capability>,
    /// Sensor active pixel array
    pub active_array: Rect,
    pub sensor_orientation: SensorRotation,
}

impl CameraInfo {
    pub fn from_raw(id: &str, raw: &RawCharacteristics) -> Self {
        Self {
            id: id.to_string(),
            facing: Facing::from_code(raw.lens_facing),
            focal_lengths: raw.focal_lengths.clone(),
            hardware_level: HardwareLevel::from_code(raw.hardware_level),
            capabilities: raw.capabilities.iter().copied().map(Capability::from_code).collect(),
            active_array: raw.active_array,
            sensor_orientation: SensorRotation::from_degrees_int(raw.sensor_orientation),
        }
    }

    pub fn is_logical_multi_camera(&self) -> bool {
        self.capabilities.contains(&Capability::LogicalMultiCamera)
    }

    /// Focal lengths formatted like "4.25mm, 6mm"
    pub fn focal_lengths_display(&self) -> String {
        self.focal_lengths
            .iter()
            .map(|f| format!("{}mm", f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn capabilities_display(&self) -> String {
        self.capabilities
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Capability inspector over any characteristics source
pub struct CapabilityInspector<'a> {
    source: &'a dyn CharacteristicsSource,
}

impl<'a> CapabilityInspector<'a> {
    pub fn new(source: &'a dyn CharacteristicsSource) -> Self {
        Self { source }
    }

    /// Describe one device, `None` if the identifier is unknown
    pub fn describe(&self, camera_id: &str) -> Option<CameraInfo> {
        let Some(raw) = self.source.characteristics(camera_id) else {
            debug!(id = camera_id, "No characteristics for camera");
            return None;
        };

        let info = CameraInfo::from_raw(camera_id, &raw);
        info!(
            id = %info.id,
            facing = %info.facing,
            logical_multi_camera = info.is_logical_multi_camera(),
            focal_lengths = %info.focal_lengths_display(),
            hardware_level = %info.hardware_level,
            capabilities = %info.capabilities_display(),
            "Camera info"
        );
        Some(info)
    }

    /// Describe every enumerated device, skipping unknown ones
    pub fn describe_all(&self) -> Vec<CameraInfo> {
        self.source
            .list_identifiers()
            .iter()
            .filter_map(|id| self.describe(id))
            .collect()
    }
}

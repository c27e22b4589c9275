// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The hardware side of a composite module is split into two contracts:
//! the device layer (enumeration, characteristics, open/close of both
//! devices) and the streaming layer (one [`SessionBackend`] per device).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐
//! │    Composite module     │
//! └──────┬───────────┬──────┘
//!        │           │
//!        ▼           ▼
//! ┌─────────────┐ ┌─────────────────────┐
//! │ DualDevice  │ │ CaptureSession ×2   │  ← state machines
//! │ Manager     │ │ (MAIN, AUX)         │
//! └──────┬──────┘ └──────────┬──────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌─────────────┐ ┌─────────────────────┐
//! │ DeviceLayer │ │ SessionBackend ×2   │  ← platform
//! └─────────────┘ └─────────────────────┘
//! ```

pub mod frame_loop;
pub mod inspector;
pub mod manager;
pub mod session;
pub mod types;
pub mod virtual_device;

pub use inspector::{CameraInfo, Capability, CapabilityInspector, Facing, HardwareLevel};
pub use manager::DualDeviceManager;
pub use session::CaptureSession;
pub use types::*;

use std::sync::Arc;

/// Read-only device introspection
///
/// Holds no mutable state, so it may be queried from any thread.
pub trait CharacteristicsSource: Send + Sync {
    /// Enumerate available physical devices (empty if hardware is unavailable)
    fn list_identifiers(&self) -> Vec<String>;

    /// Raw characteristics of a device, `None` for an unknown identifier
    fn characteristics(&self, camera_id: &str) -> Option<RawCharacteristics>;
}

/// Device layer: opens and closes the two physical devices
pub trait DeviceLayer: CharacteristicsSource {
    /// Asynchronously open `main_id` and, if given, `aux_id`
    ///
    /// Results are reported through `sink`. Returning `Err` means the
    /// request could not even be issued.
    fn open(
        &self,
        main_id: &str,
        aux_id: Option<&str>,
        sink: Arc<dyn DeviceEventSink>,
    ) -> BackendResult<()>;

    /// Release both devices (idempotent)
    fn close(&self);
}

/// Receiver of hardware open/close events
///
/// Every method defaults to a no-op so sinks only implement what they use.
#[allow(unused_variables)]
pub trait DeviceEventSink: Send + Sync {
    fn on_main_opened(&self, handle: DeviceHandle) {}
    fn on_aux_opened(&self, handle: DeviceHandle) {}
    fn on_closed(&self) {}
    fn on_open_error(&self, role: Role, reason: String) {}
}

/// Receiver of per-device streaming callbacks
#[allow(unused_variables)]
pub trait CaptureCallbackSink: Send + Sync {
    fn on_frame(&self, frame: CameraFrame) {}
    fn on_geometry_changed(&self, width: u32, height: u32) {}
    fn on_autofocus_state_changed(&self, state: AfState) {}
    /// A still picture produced by `capture_still`
    fn on_data_back(&self, data: Vec<u8>, width: u32, height: u32) {}
}

/// Streaming layer for a single opened device
///
/// Implementations deliver results later through the sink given to
/// [`SessionBackend::configure`]; no method blocks on hardware.
pub trait SessionBackend: Send {
    /// Configure streams for `device` into `surface` and start the repeating preview
    fn configure(
        &mut self,
        device: &DeviceHandle,
        surface: &SurfaceTarget,
        sink: Arc<dyn CaptureCallbackSink>,
    ) -> BackendResult<()>;

    /// Issue a single still capture with the given output orientation
    fn capture_still(&mut self, orientation: u32) -> BackendResult<()>;

    /// Resume the repeating preview request after a still capture
    fn resume_repeating(&mut self) -> BackendResult<()>;

    fn set_regions(&mut self, focus: MeteringRect, meter: MeteringRect) -> BackendResult<()>;

    fn set_af_mode(&mut self, mode: FocusMode) -> BackendResult<()>;

    /// Tear down streams (idempotent)
    fn close(&mut self);
}

/// Creates the streaming layer for each role when a module starts
pub trait SessionBackendFactory: Send + Sync {
    fn create(&self, role: Role) -> Box<dyn SessionBackend>;
}

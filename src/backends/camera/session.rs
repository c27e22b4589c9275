// SPDX-License-Identifier: GPL-3.0-only

//! Per-device capture session
//!
//! ```text
//! UNBOUND ──bind──▶ BOUND ──start_preview──▶ PREVIEWING ◀──restart_preview──┐
//!                                               │                            │
//!                                          take_picture ──▶ CAPTURING ───────┘
//! (any) ──release──▶ RELEASED
//! ```
//!
//! Commands issued in the wrong state are logged and dropped; they never
//! reach the streaming layer.

use super::types::*;
use super::{CaptureCallbackSink, SessionBackend};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Capture session for one role
pub struct CaptureSession {
    role: Role,
    backend: Box<dyn SessionBackend>,
    state: SessionState,
    device: Option<DeviceHandle>,
    surface: Option<SurfaceTarget>,
    released: Arc<AtomicBool>,
}

impl CaptureSession {
    pub fn new(role: Role, backend: Box<dyn SessionBackend>) -> Self {
        Self {
            role,
            backend,
            state: SessionState::Unbound,
            device: None,
            surface: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier of the bound device
    pub fn camera_id(&self) -> Option<&str> {
        self.device.as_ref().map(DeviceHandle::camera_id)
    }

    /// Surface the preview currently renders into
    pub fn surface(&self) -> Option<&SurfaceTarget> {
        self.surface.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        matches!(
            self.state,
            SessionState::Bound | SessionState::Previewing | SessionState::Capturing
        )
    }

    fn reject(&self, command: &'static str) -> SessionError {
        if self.state == SessionState::Released {
            debug!(role = %self.role, command, "Command on released session dropped");
            return SessionError::Released;
        }
        warn!(role = %self.role, command, state = %self.state, "Invalid session command dropped");
        SessionError::InvalidState {
            command,
            state: self.state,
        }
    }

    /// UNBOUND → BOUND; the session owns `device` from here on
    pub fn bind(&mut self, device: DeviceHandle) -> SessionResult<()> {
        if self.state != SessionState::Unbound {
            return Err(self.reject("bind"));
        }
        info!(role = %self.role, id = device.camera_id(), "Session bound");
        self.device = Some(device);
        self.state = SessionState::Bound;
        Ok(())
    }

    /// BOUND | PREVIEWING → PREVIEWING
    ///
    /// Callbacks reach `sink` only until the session is released.
    pub fn start_preview(
        &mut self,
        surface: SurfaceTarget,
        sink: Arc<dyn CaptureCallbackSink>,
    ) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Bound | SessionState::Previewing) {
            return Err(self.reject("start_preview"));
        }
        let Some(device) = self.device.as_ref() else {
            return Err(self.reject("start_preview"));
        };

        let guarded: Arc<dyn CaptureCallbackSink> = Arc::new(GuardedSink {
            released: Arc::clone(&self.released),
            inner: sink,
        });
        self.backend.configure(device, &surface, guarded)?;

        info!(role = %self.role, surface = %surface.name, "Preview started");
        self.surface = Some(surface);
        self.state = SessionState::Previewing;
        Ok(())
    }

    /// PREVIEWING → CAPTURING; exactly one `on_data_back` follows
    pub fn take_picture(&mut self, orientation: u32) -> SessionResult<()> {
        if self.state != SessionState::Previewing {
            return Err(self.reject("take_picture"));
        }
        self.backend.capture_still(orientation)?;
        info!(role = %self.role, orientation, "Still capture issued");
        self.state = SessionState::Capturing;
        Ok(())
    }

    /// Any bound state with a known surface → PREVIEWING
    pub fn restart_preview(&mut self) -> SessionResult<()> {
        if !self.is_bound() || self.surface.is_none() {
            return Err(self.reject("restart_preview"));
        }
        self.backend.resume_repeating()?;
        debug!(role = %self.role, "Preview restarted");
        self.state = SessionState::Previewing;
        Ok(())
    }

    pub fn set_focus_regions(&mut self, focus: MeteringRect, meter: MeteringRect) -> SessionResult<()> {
        if !self.is_bound() {
            return Err(self.reject("set_focus_regions"));
        }
        self.backend.set_regions(focus, meter)?;
        debug!(role = %self.role, ?focus, ?meter, "Focus regions applied");
        Ok(())
    }

    pub fn set_focus_mode(&mut self, mode: FocusMode) -> SessionResult<()> {
        if !self.is_bound() {
            return Err(self.reject("set_focus_mode"));
        }
        self.backend.set_af_mode(mode)?;
        debug!(role = %self.role, ?mode, "Focus mode applied");
        Ok(())
    }

    /// Any state → RELEASED (idempotent)
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        self.released.store(true, Ordering::SeqCst);
        if self.is_bound() {
            self.backend.close();
        }
        self.device = None;
        self.surface = None;
        info!(role = %self.role, from = %self.state, "Session released");
        self.state = SessionState::Released;
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("camera_id", &self.camera_id())
            .finish()
    }
}

/// Drops callbacks once the owning session has been released
struct GuardedSink {
    released: Arc<AtomicBool>,
    inner: Arc<dyn CaptureCallbackSink>,
}

impl GuardedSink {
    fn live(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }
}

impl CaptureCallbackSink for GuardedSink {
    fn on_frame(&self, frame: CameraFrame) {
        if self.live() {
            self.inner.on_frame(frame);
        }
    }

    fn on_geometry_changed(&self, width: u32, height: u32) {
        if self.live() {
            self.inner.on_geometry_changed(width, height);
        }
    }

    fn on_autofocus_state_changed(&self, state: AfState) {
        if self.live() {
            self.inner.on_autofocus_state_changed(state);
        }
    }

    fn on_data_back(&self, data: Vec<u8>, width: u32, height: u32) {
        if self.live() {
            self.inner.on_data_back(data, width, height);
        } else {
            debug!(size = data.len(), "Late picture after release discarded");
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Module lifecycle and device handlers
//!
//! Handles start/stop, device open/close events and the shared
//! "start preview once opened and UI ready" check.

use crate::backends::camera::CaptureSession;
use crate::backends::camera::types::{DeviceHandle, Role, SessionState};
use crate::errors::CameraError;
use crate::module::DualCameraModule;
use crate::module::sinks::{ModuleDeviceSink, ModuleSessionSink};
use crate::module::state::{DeviceEvent, PendingCaptureCounter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl DualCameraModule {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub(crate) fn handle_start(&mut self) {
        if self.flags.running {
            debug!("Module already running");
            return;
        }

        self.epoch = self.epoch.wrapping_add(1);
        // UI_READY belongs to the surfaces and survives a restart
        self.flags.running = true;
        self.flags.opened = false;
        self.capturing = false;
        self.frames = [0; 2];

        // Log what the platform offers before choosing
        let described = self.manager.inspector().describe_all();
        debug!(count = described.len(), "Cameras described");

        let selection = self
            .manager
            .select_devices(
                self.config.main_camera_id.as_deref(),
                self.config.aux_camera_id.as_deref(),
            )
            .clone();

        if selection.main.is_none() {
            let err = CameraError::NoCameraFound;
            error!(error = %err, "Module not started");
            self.ui.show_notice(&err.to_string());
            self.handle_stop();
            return;
        }

        self.sessions = [
            Some(CaptureSession::new(Role::Main, self.factory.create(Role::Main))),
            selection
                .aux
                .as_ref()
                .map(|_| CaptureSession::new(Role::Aux, self.factory.create(Role::Aux))),
        ];
        self.counter = PendingCaptureCounter::new(self.present_roles().len() as u8);
        self.main_info = self.manager.characteristics(Role::Main);

        self.ui.attach_module(true);
        info!(
            epoch = self.epoch,
            main = ?selection.main,
            aux = ?selection.aux,
            "Starting module"
        );

        let sink = Arc::new(ModuleDeviceSink {
            sender: self.sender.clone(),
            epoch: self.epoch,
        });
        if let Err(e) = self.manager.open(sink) {
            let err = CameraError::from(e);
            error!(error = %err, "Failed to open cameras");
            self.ui.show_notice(&err.to_string());
            self.handle_stop();
        }
    }

    /// Safe from any state, including a partially opened one
    pub(crate) fn handle_stop(&mut self) {
        if !self.flags.running {
            debug!("Module not running, nothing to stop");
            return;
        }

        self.ui.attach_module(false);
        self.ui.show_cover();
        self.focus.hide_focus_ui();
        self.focus.remove_delay_message();

        for session in self.sessions.iter_mut().flatten() {
            session.release();
        }
        self.manager.release();

        self.flags.running = false;
        self.flags.opened = false;
        self.abort_capture();
        info!(epoch = self.epoch, "Module stopped");
    }

    // =========================================================================
    // Device events
    // =========================================================================

    pub(crate) fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::AuxOpened(handle) => self.handle_aux_opened(handle),
            DeviceEvent::MainOpened(handle) => self.handle_main_opened(handle),
            DeviceEvent::Closed => self.handle_device_closed(),
            DeviceEvent::OpenError(role, reason) => self.handle_open_error(role, reason),
        }
    }

    /// Bind only; preview waits for the main device
    fn handle_aux_opened(&mut self, handle: DeviceHandle) {
        info!(id = handle.camera_id(), "Aux camera opened");
        match self.session_mut(Role::Aux) {
            Some(session) => {
                if let Err(e) = session.bind(handle) {
                    warn!(error = %e, "Failed to bind aux session");
                }
            }
            None => warn!(id = handle.camera_id(), "Aux camera opened without an aux slot"),
        }
    }

    fn handle_main_opened(&mut self, handle: DeviceHandle) {
        info!(id = handle.camera_id(), "Main camera opened");
        let Some(session) = self.session_mut(Role::Main) else {
            warn!("Main camera opened without a session");
            return;
        };
        if let Err(e) = session.bind(handle) {
            warn!(error = %e, "Failed to bind main session");
            return;
        }
        self.flags.opened = true;
        self.try_start_preview();
    }

    fn handle_device_closed(&mut self) {
        info!("Cameras closed");
        self.flags.opened = false;
        self.frames = [0; 2];
        self.abort_capture();
        self.ui.reset_frame_count();
        self.ui.show_cover();
    }

    /// Drop an in-flight capture; its pictures will never complete the barrier
    fn abort_capture(&mut self) {
        if self.capturing {
            warn!(pending = self.counter.count(), "Capture abandoned");
            self.capturing = false;
            self.set_clickable(true);
        }
        self.counter.reset();
    }

    /// Any open failure ends this module instance
    fn handle_open_error(&mut self, role: Role, reason: String) {
        let err = CameraError::OpenFailed {
            role: role.label().to_string(),
            reason,
        };
        error!(error = %err, "Camera open failed");
        self.ui.show_notice(&err.to_string());
        self.handle_stop();
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Start preview on every present session once opened and UI ready
    ///
    /// Called from both edges (device opened, surface ready); whichever
    /// arrives second starts the preview.
    pub(crate) fn try_start_preview(&mut self) {
        if !self.flags.preview_ready() {
            debug!(flags = ?self.flags, "Preview not ready yet");
            return;
        }
        if self.capturing {
            // The completion barrier picks the new surfaces up
            debug!("Capture in flight, preview start deferred");
            return;
        }

        for role in self.present_roles() {
            let Some(surface) = self.surfaces[role.index()].clone() else {
                warn!(%role, "No surface for preview");
                continue;
            };
            let sink = Arc::new(ModuleSessionSink {
                sender: self.sender.clone(),
                role,
                epoch: self.epoch,
            });
            let Some(session) = self.session_mut(role) else {
                continue;
            };
            if session.state() == SessionState::Unbound {
                warn!(%role, "Session not bound, preview skipped");
                continue;
            }
            if let Err(e) = session.start_preview(surface, sink) {
                error!(%role, error = %e, "Failed to start preview");
            }
        }
    }
}

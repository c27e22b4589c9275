// SPDX-License-Identifier: GPL-3.0-only

//! Capture handlers
//!
//! Shutter press, per-device picture callbacks, the completion barrier and
//! save results.

use crate::backends::camera::types::Role;
use crate::errors::PhotoError;
use crate::module::DualCameraModule;
use crate::module::state::Message;
use crate::storage::{SaveRequest, SaveResult};
use tracing::{debug, error, info, warn};

impl DualCameraModule {
    pub(crate) fn handle_orientation(&mut self, degrees: i32) {
        // Snap to the nearest quarter turn
        let snapped = ((degrees.rem_euclid(360) + 45) / 90 % 4 * 90) as u32;
        if snapped != self.orientation {
            debug!(degrees, snapped, "Orientation changed");
            self.orientation = snapped;
        }
    }

    /// Disable the UI and issue a still capture on every present session
    pub(crate) fn handle_take_picture(&mut self) {
        if !self.flags.running {
            debug!("Shutter ignored, module not running");
            return;
        }
        if self.capturing {
            warn!(
                pending = self.counter.count(),
                "Shutter ignored: {}",
                PhotoError::CaptureInProgress
            );
            return;
        }

        info!(orientation = self.orientation, "Taking picture");
        self.set_clickable(false);
        self.capturing = true;
        self.counter.reset();

        let orientation = self.orientation;
        for role in self.present_roles() {
            let issued = match self.session_mut(role) {
                Some(session) => session.take_picture(orientation),
                None => continue,
            };
            if let Err(e) = issued {
                // No picture will arrive for this role; count it so the
                // barrier can still complete
                let err = PhotoError::CaptureFailed(format!("{}: {}", role.label(), e));
                error!(%role, error = %err, "Capture not issued");
                self.ui.show_notice(&err.to_string());
                self.complete_capture(role);
            }
        }
    }

    /// A device delivered its still picture
    pub(crate) fn handle_picture(&mut self, role: Role, data: Vec<u8>, width: u32, height: u32) {
        if !self.capturing {
            warn!(%role, size = data.len(), "Picture without a pending capture discarded");
            return;
        }
        info!(%role, size = data.len(), width, height, "Picture received");

        let device_tag = self
            .manager
            .camera_id(role)
            .unwrap_or(role.label())
            .to_string();
        let request = SaveRequest {
            data,
            width,
            height,
            device_tag,
            format: self.config.picture_format,
            role,
        };

        let sender = self.sender.clone();
        let epoch = self.epoch;
        self.saver.save(
            request,
            Box::new(move |result| {
                let _ = sender.send(Message::FileSaved {
                    role,
                    epoch,
                    result,
                });
            }),
        );

        self.complete_capture(role);
    }

    /// Count one completion; on the last one restore the UI and restart preview
    fn complete_capture(&mut self, role: Role) {
        if !self.counter.record(role) {
            debug!(%role, pending = self.counter.count(), "Waiting for the other picture");
            return;
        }

        info!("All pictures received");
        self.capturing = false;
        self.set_clickable(true);
        for role in self.present_roles() {
            if let Some(session) = self.session_mut(role) {
                if let Err(e) = session.restart_preview() {
                    warn!(%role, error = %e, "Failed to restart preview");
                }
            }
        }

        // Surfaces replaced during the capture were deferred until now
        let stale = self.present_roles().into_iter().any(|role| {
            self.sessions[role.index()]
                .as_ref()
                .is_some_and(|session| session.surface() != self.surfaces[role.index()].as_ref())
        });
        if stale {
            debug!("Preview surfaces changed during capture");
            self.try_start_preview();
        }
    }

    /// A save result restores interactivity unless a capture is in flight
    pub(crate) fn handle_file_saved(&mut self, role: Role, result: SaveResult) {
        match result {
            SaveResult::Saved(media) => {
                info!(%role, uri = %media.uri, "Picture stored");
                if let Some(thumbnail) = &media.thumbnail {
                    self.ui.set_thumbnail(thumbnail);
                }
                self.last_saved = Some(media);
            }
            SaveResult::SaveFailed(message) => {
                error!(%role, %message, "Picture not stored");
                self.ui.show_notice(&message);
            }
        }
        // In flight, the barrier owns the UI
        if !self.capturing {
            self.set_clickable(true);
        }
    }
}

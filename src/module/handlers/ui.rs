// SPDX-License-Identifier: GPL-3.0-only

//! UI and preview handlers
//!
//! Surface lifecycle, touch-to-focus, focus reset and per-session preview
//! callbacks.

use crate::backends::camera::types::{AfState, FocusMode, Role, SurfaceTarget};
use crate::module::DualCameraModule;
use tracing::{debug, info, trace, warn};

impl DualCameraModule {
    // =========================================================================
    // Surfaces
    // =========================================================================

    pub(crate) fn handle_surface_ready(&mut self, main: SurfaceTarget, aux: SurfaceTarget) {
        info!(main = %main.name, aux = %aux.name, "Preview surfaces ready");
        self.surfaces = [Some(main), Some(aux)];
        self.flags.ui_ready = true;
        self.try_start_preview();
    }

    /// Surfaces go away during re-layout; sessions stay as they are
    pub(crate) fn handle_surface_destroyed(&mut self) {
        info!("Preview surfaces destroyed");
        self.flags.ui_ready = false;
    }

    pub(crate) fn handle_preview_ready(&mut self) {
        if self.flags.running {
            self.ui.hide_cover();
        }
    }

    // =========================================================================
    // Preview callbacks
    // =========================================================================

    pub(crate) fn handle_frame(&mut self, role: Role, sequence: u64) {
        let count = &mut self.frames[role.index()];
        *count += 1;
        trace!(%role, sequence, count = *count, "Preview frame");
        self.ui.preview_frame(role, *count);
    }

    /// Main preview geometry drives the UI size and the focus mapping
    pub(crate) fn handle_geometry(&mut self, role: Role, width: u32, height: u32) {
        debug!(%role, width, height, "Preview geometry changed");
        if role != Role::Main {
            return;
        }
        self.ui.update_ui_size(width, height);
        match &self.main_info {
            Some(info) => self.focus.on_preview_changed(width, height, info),
            None => warn!("No main camera characteristics, focus mapping unchanged"),
        }
    }

    pub(crate) fn handle_af_state(&mut self, role: Role, state: AfState) {
        trace!(%role, ?state, "Autofocus state");
        if role == Role::Main {
            self.focus.on_af_state_changed(state);
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Focus and metering regions go to the main session only
    pub(crate) fn handle_touch(&mut self, x: f32, y: f32) {
        if !self.flags.running {
            return;
        }
        let bound = self
            .sessions[Role::Main.index()]
            .as_ref()
            .is_some_and(|session| session.is_bound());
        if !bound {
            debug!(x, y, "Touch ignored, main session not bound");
            return;
        }

        self.focus.start_focus(x, y);
        let focus = self.focus.focus_area(x, y, true);
        let meter = self.focus.focus_area(x, y, false);
        debug!(x, y, ?focus, ?meter, "Touch to focus");

        if let Some(session) = self.session_mut(Role::Main) {
            let applied = session
                .set_focus_mode(FocusMode::Auto)
                .and_then(|_| session.set_focus_regions(focus, meter));
            if let Err(e) = applied {
                warn!(error = %e, "Failed to apply focus regions");
            }
        }
    }

    /// Return both sessions to continuous autofocus
    pub(crate) fn handle_focus_reset(&mut self, generation: u64) {
        if !self.focus.take_reset(generation) {
            trace!(generation, "Stale focus reset ignored");
            return;
        }
        self.focus.hide_focus_ui();
        if !self.flags.running {
            return;
        }
        for role in self.present_roles() {
            if let Some(session) = self.session_mut(role) {
                if !session.is_bound() {
                    continue;
                }
                if let Err(e) = session.set_focus_mode(FocusMode::ContinuousPicture) {
                    warn!(%role, error = %e, "Failed to reset focus mode");
                }
            }
        }
    }
}

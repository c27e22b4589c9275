// SPDX-License-Identifier: GPL-3.0-only

//! Message dispatch
//!
//! `update()` routes each message to a handler in `handlers`:
//!
//! - `handlers::device`: start/stop, device open/close, preview start
//! - `handlers::capture`: shutter, picture callbacks, save results
//! - `handlers::ui`: surfaces, touch-to-focus, clicks

use super::DualCameraModule;
use super::state::{Message, SessionEvent, UiEvent};
use std::ops::ControlFlow;
use tracing::{debug, trace};

impl DualCameraModule {
    /// Handle one message; `Break` ends the message loop
    pub fn update(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Start => self.handle_start(),
            Message::Stop => self.handle_stop(),
            Message::Shutdown => {
                self.handle_stop();
                return ControlFlow::Break(());
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }

            Message::Device { epoch, event } => {
                if self.is_stale(epoch) {
                    debug!(epoch, ?event, "Stale device event discarded");
                } else {
                    self.handle_device_event(event);
                }
            }

            Message::Session { role, epoch, event } => {
                if self.is_stale(epoch) {
                    trace!(%role, epoch, "Stale session event discarded");
                    return ControlFlow::Continue(());
                }
                match event {
                    SessionEvent::Frame(frame) => self.handle_frame(role, frame.sequence),
                    SessionEvent::Geometry { width, height } => {
                        self.handle_geometry(role, width, height)
                    }
                    SessionEvent::Autofocus(state) => self.handle_af_state(role, state),
                    SessionEvent::Picture {
                        data,
                        width,
                        height,
                    } => self.handle_picture(role, data, width, height),
                }
            }

            Message::FileSaved { role, epoch, result } => {
                if self.is_stale(epoch) {
                    debug!(%role, epoch, "Save result for a stopped run discarded");
                } else {
                    self.handle_file_saved(role, result);
                }
            }

            Message::FocusReset { generation } => self.handle_focus_reset(generation),

            Message::Ui(event) => match event {
                UiEvent::SurfaceReady { main, aux } => self.handle_surface_ready(main, aux),
                UiEvent::SurfaceDestroyed => self.handle_surface_destroyed(),
                UiEvent::PreviewReady => self.handle_preview_ready(),
                UiEvent::Touch { x, y } => self.handle_touch(x, y),
                UiEvent::ShutterPressed => self.handle_take_picture(),
                UiEvent::SettingsPressed => self.ui.show_settings(),
                UiEvent::ThumbnailPressed => self.ui.open_gallery(self.last_saved.as_ref()),
                UiEvent::ModuleSwitch(id) => self.ui.switch_module(id),
                UiEvent::OrientationChanged(degrees) => self.handle_orientation(degrees),
            },
        }
        ControlFlow::Continue(())
    }

    /// Hardware callbacks only count while running and for the current run
    fn is_stale(&self, epoch: u64) -> bool {
        !self.flags.running || epoch != self.epoch
    }
}

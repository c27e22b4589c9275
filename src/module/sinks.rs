// SPDX-License-Identifier: GPL-3.0-only

//! Callback adapters that post into the module queue

use super::state::{DeviceEvent, Message, SessionEvent};
use crate::backends::camera::types::{AfState, CameraFrame, DeviceHandle, Role};
use crate::backends::camera::{CaptureCallbackSink, DeviceEventSink};
use tokio::sync::mpsc;
use tracing::trace;

fn post(sender: &mpsc::UnboundedSender<Message>, message: Message) {
    if sender.send(message).is_err() {
        trace!("Module queue closed, callback dropped");
    }
}

pub(super) struct ModuleDeviceSink {
    pub sender: mpsc::UnboundedSender<Message>,
    pub epoch: u64,
}

impl ModuleDeviceSink {
    fn post(&self, event: DeviceEvent) {
        post(
            &self.sender,
            Message::Device {
                epoch: self.epoch,
                event,
            },
        );
    }
}

impl DeviceEventSink for ModuleDeviceSink {
    fn on_main_opened(&self, handle: DeviceHandle) {
        self.post(DeviceEvent::MainOpened(handle));
    }

    fn on_aux_opened(&self, handle: DeviceHandle) {
        self.post(DeviceEvent::AuxOpened(handle));
    }

    fn on_closed(&self) {
        self.post(DeviceEvent::Closed);
    }

    fn on_open_error(&self, role: Role, reason: String) {
        self.post(DeviceEvent::OpenError(role, reason));
    }
}

/// Role-tagged streaming callbacks
pub(super) struct ModuleSessionSink {
    pub sender: mpsc::UnboundedSender<Message>,
    pub role: Role,
    pub epoch: u64,
}

impl ModuleSessionSink {
    fn post(&self, event: SessionEvent) {
        post(
            &self.sender,
            Message::Session {
                role: self.role,
                epoch: self.epoch,
                event,
            },
        );
    }
}

impl CaptureCallbackSink for ModuleSessionSink {
    fn on_frame(&self, frame: CameraFrame) {
        self.post(SessionEvent::Frame(frame));
    }

    fn on_geometry_changed(&self, width: u32, height: u32) {
        self.post(SessionEvent::Geometry { width, height });
    }

    fn on_autofocus_state_changed(&self, state: AfState) {
        self.post(SessionEvent::Autofocus(state));
    }

    fn on_data_back(&self, data: Vec<u8>, width: u32, height: u32) {
        self.post(SessionEvent::Picture {
            data,
            width,
            height,
        });
    }
}

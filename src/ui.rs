// SPDX-License-Identifier: GPL-3.0-only

//! UI-facing contract
//!
//! The module drives its user interface only through [`UiSink`]. Gestures
//! and surface lifecycle travel the other way as
//! [`crate::module::UiEvent`]s.

use crate::backends::camera::types::Role;
use crate::storage::{SavedMedia, Thumbnail};
use futures::channel::mpsc;
use tracing::trace;

/// Commands from the module to its user interface
///
/// All methods default to no-ops.
#[allow(unused_variables)]
pub trait UiSink: Send + Sync {
    /// Interactivity of the dual-preview controls
    fn set_module_clickable(&self, clickable: bool) {}
    /// Interactivity of the shared camera controls (shutter, settings, thumbnail)
    fn set_base_clickable(&self, clickable: bool) {}
    /// Attach or detach the module's view and gesture routing
    fn attach_module(&self, attached: bool) {}
    fn show_cover(&self) {}
    fn hide_cover(&self) {}
    fn reset_frame_count(&self) {}
    fn preview_frame(&self, role: Role, count: u64) {}
    fn update_ui_size(&self, width: u32, height: u32) {}
    fn set_thumbnail(&self, thumbnail: &Thumbnail) {}
    /// Transient user-visible message
    fn show_notice(&self, message: &str) {}
    fn show_settings(&self) {}
    fn open_gallery(&self, media: Option<&SavedMedia>) {}
    fn switch_module(&self, module_id: u32) {}
    fn show_focus(&self, x: f32, y: f32) {}
    fn focus_succeeded(&self) {}
    fn focus_failed(&self) {}
    fn hide_focus(&self) {}
}

/// UI that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUi;

impl UiSink for NullUi {}

/// Owned form of every [`UiSink`] call
#[derive(Debug, Clone, PartialEq)]
pub enum UiNotification {
    ModuleClickable(bool),
    BaseClickable(bool),
    Attached(bool),
    ShowCover,
    HideCover,
    ResetFrameCount,
    PreviewFrame(Role, u64),
    UiSize(u32, u32),
    Thumbnail(Thumbnail),
    Notice(String),
    ShowSettings,
    OpenGallery(Option<SavedMedia>),
    SwitchModule(u32),
    ShowFocus(f32, f32),
    FocusSucceeded,
    FocusFailed,
    HideFocus,
}

/// UI that forwards every call as a [`UiNotification`]
#[derive(Debug, Clone)]
pub struct ChannelUi {
    sender: mpsc::UnboundedSender<UiNotification>,
    /// Per-frame notifications are noisy; off unless asked for
    forward_frames: bool,
}

impl ChannelUi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiNotification>) {
        let (sender, receiver) = mpsc::unbounded();
        (
            Self {
                sender,
                forward_frames: false,
            },
            receiver,
        )
    }

    pub fn with_frames(mut self, forward_frames: bool) -> Self {
        self.forward_frames = forward_frames;
        self
    }

    fn send(&self, notification: UiNotification) {
        if self.sender.unbounded_send(notification).is_err() {
            trace!("UI receiver gone, notification dropped");
        }
    }
}

impl UiSink for ChannelUi {
    fn set_module_clickable(&self, clickable: bool) {
        self.send(UiNotification::ModuleClickable(clickable));
    }
    fn set_base_clickable(&self, clickable: bool) {
        self.send(UiNotification::BaseClickable(clickable));
    }
    fn attach_module(&self, attached: bool) {
        self.send(UiNotification::Attached(attached));
    }
    fn show_cover(&self) {
        self.send(UiNotification::ShowCover);
    }
    fn hide_cover(&self) {
        self.send(UiNotification::HideCover);
    }
    fn reset_frame_count(&self) {
        self.send(UiNotification::ResetFrameCount);
    }
    fn preview_frame(&self, role: Role, count: u64) {
        if self.forward_frames {
            self.send(UiNotification::PreviewFrame(role, count));
        }
    }
    fn update_ui_size(&self, width: u32, height: u32) {
        self.send(UiNotification::UiSize(width, height));
    }
    fn set_thumbnail(&self, thumbnail: &Thumbnail) {
        self.send(UiNotification::Thumbnail(thumbnail.clone()));
    }
    fn show_notice(&self, message: &str) {
        self.send(UiNotification::Notice(message.to_string()));
    }
    fn show_settings(&self) {
        self.send(UiNotification::ShowSettings);
    }
    fn open_gallery(&self, media: Option<&SavedMedia>) {
        self.send(UiNotification::OpenGallery(media.cloned()));
    }
    fn switch_module(&self, module_id: u32) {
        self.send(UiNotification::SwitchModule(module_id));
    }
    fn show_focus(&self, x: f32, y: f32) {
        self.send(UiNotification::ShowFocus(x, y));
    }
    fn focus_succeeded(&self) {
        self.send(UiNotification::FocusSucceeded);
    }
    fn focus_failed(&self) {
        self.send(UiNotification::FocusFailed);
    }
    fn hide_focus(&self) {
        self.send(UiNotification::HideFocus);
    }
}

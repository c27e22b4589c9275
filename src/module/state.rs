// SPDX-License-Identifier: GPL-3.0-only

//! Module state and message types

use crate::backends::camera::types::{AfState, CameraFrame, DeviceHandle, Role, SessionState, SurfaceTarget};
use crate::constants::DUAL_CAPTURE_BARRIER;
use crate::storage::{SaveResult, SavedMedia};
use tokio::sync::oneshot;

/// Composite module flags
///
/// Only the module's own message loop mutates these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleFlags {
    /// Devices are open and the main session is bound
    pub opened: bool,
    /// Preview surfaces are available
    pub ui_ready: bool,
    /// Module is started
    pub running: bool,
}

impl ModuleFlags {
    /// Both preconditions for starting preview hold
    pub fn preview_ready(&self) -> bool {
        self.opened && self.ui_ready
    }
}

/// Join barrier over the picture callbacks of one shutter press
///
/// Each role counts at most once, so a duplicated callback can never fire
/// the barrier twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCaptureCounter {
    arrived: [bool; 2],
    target: u8,
}

impl Default for PendingCaptureCounter {
    fn default() -> Self {
        Self::new(DUAL_CAPTURE_BARRIER)
    }
}

impl PendingCaptureCounter {
    /// `target` is the number of present device slots (1 or 2)
    pub fn new(target: u8) -> Self {
        Self {
            arrived: [false; 2],
            target: target.clamp(1, DUAL_CAPTURE_BARRIER),
        }
    }

    pub fn count(&self) -> u8 {
        self.arrived.iter().filter(|arrived| **arrived).count() as u8
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    /// Record a completion for `role`
    ///
    /// Returns `true` exactly when the barrier is reached, at which point the
    /// counter is back to zero.
    pub fn record(&mut self, role: Role) -> bool {
        if self.arrived[role.index()] {
            return false;
        }
        self.arrived[role.index()] = true;
        if self.count() >= self.target {
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.arrived = [false; 2];
    }
}

/// Hardware open/close events
#[derive(Debug)]
pub enum DeviceEvent {
    MainOpened(DeviceHandle),
    AuxOpened(DeviceHandle),
    Closed,
    OpenError(Role, String),
}

/// Per-session streaming callbacks
#[derive(Debug)]
pub enum SessionEvent {
    Frame(CameraFrame),
    Geometry { width: u32, height: u32 },
    Autofocus(AfState),
    Picture { data: Vec<u8>, width: u32, height: u32 },
}

/// Gestures and surface lifecycle from the user interface
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Both preview surfaces are available
    SurfaceReady {
        main: SurfaceTarget,
        aux: SurfaceTarget,
    },
    SurfaceDestroyed,
    /// First preview frames are on screen
    PreviewReady,
    Touch { x: f32, y: f32 },
    ShutterPressed,
    SettingsPressed,
    ThumbnailPressed,
    ModuleSwitch(u32),
    /// Device orientation in degrees, applied to captured pictures
    OrientationChanged(i32),
}

/// Everything the module reacts to
///
/// Hardware events carry the epoch of the run that produced them so
/// callbacks from a stopped run are recognised and dropped.
#[derive(Debug)]
pub enum Message {
    Start,
    Stop,
    Device {
        epoch: u64,
        event: DeviceEvent,
    },
    Session {
        role: Role,
        epoch: u64,
        event: SessionEvent,
    },
    Ui(UiEvent),
    FocusReset {
        generation: u64,
    },
    FileSaved {
        role: Role,
        epoch: u64,
        result: SaveResult,
    },
    Snapshot(oneshot::Sender<ModuleSnapshot>),
    Shutdown,
}

/// Point-in-time view of the module, for front ends and tests
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSnapshot {
    pub flags: ModuleFlags,
    pub epoch: u64,
    pub pending: u8,
    pub barrier_target: u8,
    pub capturing: bool,
    pub main_id: Option<String>,
    pub aux_id: Option<String>,
    pub main_state: SessionState,
    /// `None` when no aux device is selected
    pub aux_state: Option<SessionState>,
    pub frames: [u64; 2],
    pub last_saved: Option<SavedMedia>,
}

impl ModuleSnapshot {
    pub fn session_state(&self, role: Role) -> Option<SessionState> {
        match role {
            Role::Main => Some(self.main_state),
            Role::Aux => self.aux_state,
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Composite dual-camera module
//!
//! Presents a MAIN and an AUX device as one synchronized capture target.
//! Every hardware callback, UI gesture and save result is funnelled into a
//! single queue of [`Message`]s consumed by one task, so the flag checks and
//! the capture barrier never run concurrently.
//!
//! # Message flow
//!
//! ```text
//! DeviceLayer ──┐
//! Sessions ─────┼──▶ mpsc queue ──▶ DualCameraModule::update ──▶ UiSink
//! FileSaver ────┤                          │
//! UI / timers ──┘                          ▼
//!                               DualDeviceManager, CaptureSession ×2
//! ```

mod handlers;
mod sinks;
pub mod state;
mod update;

pub use state::{
    DeviceEvent, Message, ModuleFlags, ModuleSnapshot, PendingCaptureCounter, SessionEvent,
    UiEvent,
};

use crate::backends::camera::inspector::CameraInfo;
use crate::backends::camera::types::{Role, SessionState, SurfaceTarget};
use crate::backends::camera::{
    CaptureSession, DeviceLayer, DualDeviceManager, SessionBackendFactory,
};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::focus::FocusOverlayController;
use crate::storage::{FileSaver, SavedMedia};
use crate::ui::UiSink;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Collaborators of a module instance
#[derive(Clone)]
pub struct ModuleParts {
    pub layer: Arc<dyn DeviceLayer>,
    pub sessions: Arc<dyn SessionBackendFactory>,
    pub saver: Arc<dyn FileSaver>,
    pub ui: Arc<dyn UiSink>,
    pub config: Config,
}

pub struct DualCameraModule {
    manager: DualDeviceManager,
    factory: Arc<dyn SessionBackendFactory>,
    saver: Arc<dyn FileSaver>,
    ui: Arc<dyn UiSink>,
    config: Config,
    sender: mpsc::UnboundedSender<Message>,

    flags: ModuleFlags,
    /// Incremented on every start; stale callbacks carry an older value
    epoch: u64,
    sessions: [Option<CaptureSession>; 2],
    surfaces: [Option<SurfaceTarget>; 2],
    main_info: Option<CameraInfo>,
    counter: PendingCaptureCounter,
    capturing: bool,
    orientation: u32,
    frames: [u64; 2],
    last_saved: Option<SavedMedia>,
    focus: FocusOverlayController,
}

impl DualCameraModule {
    /// Build a module together with the receiving end of its queue
    pub fn new(parts: ModuleParts) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let reset_sender = sender.clone();
        let focus = FocusOverlayController::new(
            Arc::clone(&parts.ui),
            parts.config.focus_reset_delay(),
            Arc::new(move |generation| {
                let _ = reset_sender.send(Message::FocusReset { generation });
            }),
        );

        let module = Self {
            manager: DualDeviceManager::new(parts.layer),
            factory: parts.sessions,
            saver: parts.saver,
            ui: parts.ui,
            config: parts.config,
            sender,
            flags: ModuleFlags::default(),
            epoch: 0,
            sessions: [None, None],
            surfaces: [None, None],
            main_info: None,
            counter: PendingCaptureCounter::default(),
            capturing: false,
            orientation: 0,
            frames: [0; 2],
            last_saved: None,
            focus,
        };
        (module, receiver)
    }

    /// Spawn the module's message loop on the current tokio runtime
    pub fn spawn(parts: ModuleParts) -> (ModuleHandle, tokio::task::JoinHandle<()>) {
        let (module, receiver) = Self::new(parts);
        let handle = module.handle();
        let task = tokio::spawn(module.run(receiver));
        (handle, task)
    }

    /// Consume messages until [`Message::Shutdown`]
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Message>) {
        info!("Module message loop started");
        while let Some(message) = receiver.recv().await {
            if self.update(message).is_break() {
                break;
            }
        }
        self.handle_stop();
        info!("Module message loop finished");
    }

    pub fn handle(&self) -> ModuleHandle {
        ModuleHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn flags(&self) -> ModuleFlags {
        self.flags
    }

    pub fn last_saved(&self) -> Option<&SavedMedia> {
        self.last_saved.as_ref()
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        let state = |role: Role| {
            self.sessions[role.index()]
                .as_ref()
                .map(CaptureSession::state)
        };
        ModuleSnapshot {
            flags: self.flags,
            epoch: self.epoch,
            pending: self.counter.count(),
            barrier_target: self.counter.target(),
            capturing: self.capturing,
            main_id: self.manager.camera_id(Role::Main).map(str::to_string),
            aux_id: self.manager.camera_id(Role::Aux).map(str::to_string),
            main_state: state(Role::Main).unwrap_or(SessionState::Unbound),
            aux_state: state(Role::Aux),
            frames: self.frames,
            last_saved: self.last_saved.clone(),
        }
    }

    fn session_mut(&mut self, role: Role) -> Option<&mut CaptureSession> {
        self.sessions[role.index()].as_mut()
    }

    /// Roles that have a session in the current run
    fn present_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.sessions[role.index()].is_some())
            .collect()
    }

    fn set_clickable(&self, clickable: bool) {
        debug!(clickable, "UI interactivity");
        self.ui.set_module_clickable(clickable);
        self.ui.set_base_clickable(clickable);
    }
}

/// Cloneable sender side of a running module
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    sender: mpsc::UnboundedSender<Message>,
}

impl ModuleHandle {
    pub fn send(&self, message: Message) -> AppResult<()> {
        self.sender
            .send(message)
            .map_err(|_| AppError::Other("Module is not running".to_string()))
    }

    pub fn start(&self) -> AppResult<()> {
        self.send(Message::Start)
    }

    pub fn stop(&self) -> AppResult<()> {
        self.send(Message::Stop)
    }

    pub fn ui(&self, event: UiEvent) -> AppResult<()> {
        self.send(Message::Ui(event))
    }

    pub async fn snapshot(&self) -> AppResult<ModuleSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Snapshot(tx))?;
        rx.await
            .map_err(|_| AppError::Other("Module exited before answering".to_string()))
    }

    /// Stop the module and end its message loop
    pub fn shutdown(&self) -> AppResult<()> {
        self.send(Message::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

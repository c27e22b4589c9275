// SPDX-License-Identifier: GPL-3.0-only

//! Dual Camera - synchronized capture from a MAIN and an AUX camera
//!
//! This library presents two physical cameras as one composite capture
//! target: both devices open together, preview together, and every shutter
//! press produces one picture per device.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Device layer and per-device capture sessions
//! - [`module`]: The composite module state machine (single message loop)
//! - [`focus`]: Touch-to-focus region mapping and indicator control
//! - [`storage`]: Picture persistence and thumbnails
//! - [`ui`]: Contract between the module and its user interface
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let (ui, _notifications) = ChannelUi::new();
//! let (handle, _task) = DualCameraModule::spawn(ModuleParts {
//!     layer: Arc::new(VirtualDeviceLayer::dual()),
//!     sessions: Arc::new(VirtualSessionFactory::default()),
//!     saver: Arc::new(DiskFileSaver::new("/tmp/pictures", 92)),
//!     ui: Arc::new(ui),
//!     config: Config::default(),
//! });
//! handle.start()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod focus;
pub mod module;
pub mod storage;
pub mod ui;

// Re-export commonly used types
pub use config::{Config, PictureFormat};
pub use errors::{AppError, AppResult};
pub use module::{DualCameraModule, Message, ModuleHandle, ModuleParts, ModuleSnapshot, UiEvent};

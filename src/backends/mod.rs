// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: Device layer contracts, the dual device coordinator,
//!   per-device capture sessions and the virtual platform

pub mod camera;

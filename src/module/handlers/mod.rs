// SPDX-License-Identifier: GPL-3.0-only

//! Message handler modules, grouped by concern

pub mod capture;
pub mod device;
pub mod ui;

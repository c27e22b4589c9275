// SPDX-License-Identifier: GPL-3.0-only

//! Dual device coordinator
//!
//! The manager provides:
//! - Role selection (which identifier is MAIN, which is AUX)
//! - Open/close of both devices through the device layer
//! - Ordered delivery: the AUX-open event always precedes MAIN-open

use super::inspector::{CameraInfo, CapabilityInspector};
use super::types::*;
use super::{DeviceEventSink, DeviceLayer};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Identifiers bound to the two roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelection {
    pub main: Option<String>,
    pub aux: Option<String>,
}

impl DeviceSelection {
    /// Resolve roles from the enumerated identifiers and optional preferences
    ///
    /// Unset preferences fall back to the first identifier for MAIN and the
    /// last one for AUX (only when at least two devices exist).
    pub fn resolve(ids: &[String], main_pref: Option<&str>, aux_pref: Option<&str>) -> Self {
        let main = main_pref
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| ids.first().cloned());

        let aux = aux_pref
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| if ids.len() > 1 { ids.last().cloned() } else { None });

        let aux = match (&main, aux) {
            (Some(main_id), Some(aux_id)) if *main_id == aux_id => {
                warn!(id = %aux_id, "Aux camera equals main camera, running without aux");
                None
            }
            (_, aux) => aux,
        };

        Self { main, aux }
    }
}

/// Coordinator for the MAIN and AUX physical devices
pub struct DualDeviceManager {
    layer: Arc<dyn DeviceLayer>,
    selection: DeviceSelection,
    opened: bool,
}

impl DualDeviceManager {
    pub fn new(layer: Arc<dyn DeviceLayer>) -> Self {
        Self {
            layer,
            selection: DeviceSelection::default(),
            opened: false,
        }
    }

    /// Enumerate available physical devices
    pub fn list_identifiers(&self) -> Vec<String> {
        self.layer.list_identifiers()
    }

    pub fn inspector(&self) -> CapabilityInspector<'_> {
        CapabilityInspector::new(self.layer.as_ref())
    }

    /// Bind the two roles, see [`DeviceSelection::resolve`]
    pub fn select_devices(
        &mut self,
        main_pref: Option<&str>,
        aux_pref: Option<&str>,
    ) -> &DeviceSelection {
        let ids = self.list_identifiers();
        self.selection = DeviceSelection::resolve(&ids, main_pref, aux_pref);
        info!(
            main = ?self.selection.main,
            aux = ?self.selection.aux,
            "Selected cameras"
        );
        &self.selection
    }

    pub fn selection(&self) -> &DeviceSelection {
        &self.selection
    }

    pub fn camera_id(&self, role: Role) -> Option<&str> {
        match role {
            Role::Main => self.selection.main.as_deref(),
            Role::Aux => self.selection.aux.as_deref(),
        }
    }

    pub fn has_aux(&self) -> bool {
        self.selection.aux.is_some()
    }

    /// Decoded characteristics of the device bound to `role`
    pub fn characteristics(&self, role: Role) -> Option<CameraInfo> {
        let id = self.camera_id(role)?;
        let raw = self.layer.characteristics(id)?;
        Some(CameraInfo::from_raw(id, &raw))
    }

    /// Asynchronously open both selected devices
    ///
    /// Events reach `sink` with AUX-open strictly before MAIN-open.
    pub fn open(&mut self, sink: Arc<dyn DeviceEventSink>) -> BackendResult<()> {
        let Some(main_id) = self.selection.main.clone() else {
            return Err(BackendError::DeviceNotFound(
                "No main camera selected".to_string(),
            ));
        };
        let aux_id = self.selection.aux.clone();

        info!(main = %main_id, aux = ?aux_id, "Opening cameras");
        let ordered = Arc::new(OrderedOpenSink::new(sink, aux_id.is_some()));
        self.layer.open(&main_id, aux_id.as_deref(), ordered)?;
        self.opened = true;
        Ok(())
    }

    /// Release both device handles (idempotent)
    pub fn release(&mut self) {
        if !self.opened {
            debug!("Cameras already released");
            return;
        }
        info!("Releasing cameras");
        self.layer.close();
        self.opened = false;
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }
}

impl std::fmt::Debug for DualDeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualDeviceManager")
            .field("selection", &self.selection)
            .field("opened", &self.opened)
            .finish()
    }
}

#[derive(Default)]
struct OpenOrder {
    aux_delivered: bool,
    aux_failed: bool,
    held_main: Option<DeviceHandle>,
}

/// Sink adapter that holds back MAIN-open until AUX-open was delivered
struct OrderedOpenSink {
    inner: Arc<dyn DeviceEventSink>,
    expect_aux: bool,
    order: Mutex<OpenOrder>,
}

impl OrderedOpenSink {
    fn new(inner: Arc<dyn DeviceEventSink>, expect_aux: bool) -> Self {
        Self {
            inner,
            expect_aux,
            order: Mutex::new(OpenOrder::default()),
        }
    }
}

impl DeviceEventSink for OrderedOpenSink {
    fn on_main_opened(&self, handle: DeviceHandle) {
        {
            let mut order = self.order.lock().unwrap();
            if order.aux_failed {
                debug!("Dropping main handle after aux open failure");
                return;
            }
            if self.expect_aux && !order.aux_delivered {
                debug!("Main opened before aux, holding until aux is ready");
                order.held_main = Some(handle);
                return;
            }
        }
        self.inner.on_main_opened(handle);
    }

    fn on_aux_opened(&self, handle: DeviceHandle) {
        self.inner.on_aux_opened(handle);
        let held = {
            let mut order = self.order.lock().unwrap();
            order.aux_delivered = true;
            order.held_main.take()
        };
        if let Some(main) = held {
            self.inner.on_main_opened(main);
        }
    }

    fn on_closed(&self) {
        self.inner.on_closed();
    }

    fn on_open_error(&self, role: Role, reason: String) {
        if role == Role::Aux {
            let mut order = self.order.lock().unwrap();
            order.aux_failed = true;
            order.held_main = None;
        }
        self.inner.on_open_error(role, reason);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Virtual dual-camera platform
//!
//! Synthetic device layer and streaming layer that behave like real
//! hardware from the module's point of view: events arrive later, from
//! other threads, and still captures produce real JPEG buffers.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::*;
use super::{
    CaptureCallbackSink, CharacteristicsSource, DeviceEventSink, DeviceLayer, SessionBackend,
    SessionBackendFactory,
};
use crate::constants::virtual_sensor;
use image::{ImageEncoder, RgbImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A synthetic camera exposed by [`VirtualDeviceLayer`]
#[derive(Debug, Clone)]
pub struct VirtualCamera {
    pub id: String,
    pub characteristics: RawCharacteristics,
}

impl VirtualCamera {
    fn back_camera(id: &str, focal_length: f32, hardware_level: i32, capabilities: Vec<i32>) -> Self {
        Self {
            id: id.to_string(),
            characteristics: RawCharacteristics {
                lens_facing: Some(1),
                focal_lengths: vec![focal_length],
                hardware_level: Some(hardware_level),
                capabilities,
                active_array: Rect::new(
                    0,
                    0,
                    virtual_sensor::ACTIVE_ARRAY_WIDTH as i32,
                    virtual_sensor::ACTIVE_ARRAY_HEIGHT as i32,
                ),
                sensor_orientation: 90,
            },
        }
    }

    /// Wide angle main sensor
    pub fn wide(id: &str) -> Self {
        Self::back_camera(id, 4.25, 1, vec![0, 1, 2, 3, 5, 6])
    }

    /// Telephoto secondary sensor
    pub fn tele(id: &str) -> Self {
        Self::back_camera(id, 6.0, 0, vec![0, 6, 12])
    }
}

/// How `open` delivers its events
#[derive(Debug, Clone, Default)]
pub struct VirtualOpenBehavior {
    /// Deliver MAIN-open before AUX-open
    pub main_first: bool,
    /// Report an open failure for this role instead of a handle
    pub fail: Option<Role>,
    /// Delay before events are delivered
    pub delay: Duration,
}

/// Synthetic device layer
pub struct VirtualDeviceLayer {
    cameras: Vec<VirtualCamera>,
    behavior: VirtualOpenBehavior,
    /// Bumped on every open/close so stale workers stay silent
    generation: Arc<AtomicU64>,
    sink: Mutex<Option<Arc<dyn DeviceEventSink>>>,
}

impl VirtualDeviceLayer {
    pub fn new(cameras: Vec<VirtualCamera>) -> Self {
        Self {
            cameras,
            behavior: VirtualOpenBehavior::default(),
            generation: Arc::new(AtomicU64::new(0)),
            sink: Mutex::new(None),
        }
    }

    /// Two back cameras, "0" (wide) and "1" (tele)
    pub fn dual() -> Self {
        Self::new(vec![VirtualCamera::wide("0"), VirtualCamera::tele("1")])
    }

    pub fn with_behavior(mut self, behavior: VirtualOpenBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn knows(&self, camera_id: &str) -> bool {
        self.cameras.iter().any(|c| c.id == camera_id)
    }
}

impl CharacteristicsSource for VirtualDeviceLayer {
    fn list_identifiers(&self) -> Vec<String> {
        self.cameras.iter().map(|c| c.id.clone()).collect()
    }

    fn characteristics(&self, camera_id: &str) -> Option<RawCharacteristics> {
        self.cameras
            .iter()
            .find(|c| c.id == camera_id)
            .map(|c| c.characteristics.clone())
    }
}

enum OpenOutcome {
    Opened(Role, DeviceHandle),
    Failed(Role, String),
}

impl DeviceLayer for VirtualDeviceLayer {
    fn open(
        &self,
        main_id: &str,
        aux_id: Option<&str>,
        sink: Arc<dyn DeviceEventSink>,
    ) -> BackendResult<()> {
        if self.cameras.is_empty() {
            return Err(BackendError::NotAvailable("No virtual cameras".to_string()));
        }

        let outcome = |role: Role, id: &str| {
            if self.behavior.fail == Some(role) {
                OpenOutcome::Failed(role, format!("camera {} refused to open", id))
            } else if !self.knows(id) {
                OpenOutcome::Failed(role, format!("unknown camera {}", id))
            } else {
                OpenOutcome::Opened(role, DeviceHandle::new(id))
            }
        };

        let mut events = Vec::new();
        if let Some(aux_id) = aux_id {
            events.push(outcome(Role::Aux, aux_id));
        }
        events.push(outcome(Role::Main, main_id));
        if self.behavior.main_first {
            events.reverse();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.sink.lock().unwrap() = Some(Arc::clone(&sink));

        let current = Arc::clone(&self.generation);
        let delay = self.behavior.delay;
        thread::spawn(move || {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            for event in events {
                if current.load(Ordering::SeqCst) != generation {
                    debug!("Virtual open cancelled by close");
                    return;
                }
                match event {
                    OpenOutcome::Opened(Role::Main, handle) => sink.on_main_opened(handle),
                    OpenOutcome::Opened(Role::Aux, handle) => sink.on_aux_opened(handle),
                    OpenOutcome::Failed(role, reason) => {
                        warn!(role = %role, reason = %reason, "Virtual open failed");
                        sink.on_open_error(role, reason);
                        return;
                    }
                }
            }
        });

        info!(main = main_id, aux = ?aux_id, "Virtual cameras opening");
        Ok(())
    }

    fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().unwrap().take() {
            info!("Virtual cameras closed");
            sink.on_closed();
        }
    }
}

/// Synthetic streaming layer for one device
pub struct VirtualSessionBackend {
    role: Role,
    frame_interval: Duration,
    camera_id: Option<String>,
    sink: Option<Arc<dyn CaptureCallbackSink>>,
    preview: Option<CaptureLoopController>,
    preview_size: (u32, u32),
    af_mode: FocusMode,
}

impl VirtualSessionBackend {
    pub fn new(role: Role, fps: u32) -> Self {
        Self {
            role,
            frame_interval: Duration::from_millis(1000 / u64::from(fps.max(1))),
            camera_id: None,
            sink: None,
            preview: None,
            preview_size: (virtual_sensor::PREVIEW_WIDTH, virtual_sensor::PREVIEW_HEIGHT),
            af_mode: FocusMode::default(),
        }
    }

    fn start_repeating(&mut self) -> BackendResult<()> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BackendError::SessionFailed("Stream not configured".to_string()))?;
        if self.preview.as_ref().is_some_and(CaptureLoopController::is_running) {
            return Ok(());
        }

        let (width, height) = self.preview_size;
        let shade = match self.role {
            Role::Main => 0u8,
            Role::Aux => 128u8,
        };
        let started = Instant::now();
        let name = format!("virtual-preview-{}", self.role);
        let preview = CaptureLoopController::start(&name, self.frame_interval, move |sequence| {
            let tick = (started.elapsed().as_millis() / 16) as u8;
            let data: Vec<u8> = (0..width * height)
                .flat_map(|i| {
                    let x = (i % width) as u8;
                    [x.wrapping_add(tick), shade, 255 - x, 255]
                })
                .collect();
            sink.on_frame(CameraFrame {
                width,
                height,
                data: Arc::from(data),
                sequence,
                captured_at: Instant::now(),
            });
            LoopAction::Continue
        })
        .map_err(|e| BackendError::IoError(e.to_string()))?;
        self.preview = Some(preview);
        Ok(())
    }

    fn stop_repeating(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.stop();
        }
    }
}

/// Render a gradient test card and encode it as JPEG
pub fn render_test_picture(width: u32, height: u32, orientation: u32) -> Result<Vec<u8>, String> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = (orientation % 360 * 255 / 360) as u8;
        image::Rgb([r, g, b])
    });

    let mut buffer = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 90)
        .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(buffer)
}

impl SessionBackend for VirtualSessionBackend {
    fn configure(
        &mut self,
        device: &DeviceHandle,
        surface: &SurfaceTarget,
        sink: Arc<dyn CaptureCallbackSink>,
    ) -> BackendResult<()> {
        self.stop_repeating();
        self.camera_id = Some(device.camera_id().to_string());
        if surface.width > 0 && surface.height > 0 {
            self.preview_size = (
                surface.width.min(virtual_sensor::PREVIEW_WIDTH),
                surface.height.min(virtual_sensor::PREVIEW_HEIGHT),
            );
        }
        sink.on_geometry_changed(self.preview_size.0, self.preview_size.1);
        self.sink = Some(sink);
        self.start_repeating()
    }

    fn capture_still(&mut self, orientation: u32) -> BackendResult<()> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BackendError::SessionFailed("Stream not configured".to_string()))?;
        self.stop_repeating();

        let role = self.role;
        thread::spawn(move || {
            let (width, height) = (virtual_sensor::STILL_WIDTH, virtual_sensor::STILL_HEIGHT);
            match render_test_picture(width, height, orientation) {
                Ok(data) => sink.on_data_back(data, width, height),
                Err(e) => warn!(role = %role, error = %e, "Virtual still capture failed"),
            }
        });
        Ok(())
    }

    fn resume_repeating(&mut self) -> BackendResult<()> {
        self.start_repeating()
    }

    fn set_regions(&mut self, _focus: MeteringRect, _meter: MeteringRect) -> BackendResult<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| BackendError::SessionFailed("Stream not configured".to_string()))?;
        // The synthetic lens locks instantly
        sink.on_autofocus_state_changed(AfState::Scanning);
        sink.on_autofocus_state_changed(AfState::Focused);
        Ok(())
    }

    fn set_af_mode(&mut self, mode: FocusMode) -> BackendResult<()> {
        self.af_mode = mode;
        Ok(())
    }

    fn close(&mut self) {
        self.stop_repeating();
        self.sink = None;
        if let Some(id) = self.camera_id.take() {
            debug!(role = %self.role, id = %id, "Virtual session closed");
        }
    }
}

/// Creates [`VirtualSessionBackend`]s
#[derive(Debug, Clone)]
pub struct VirtualSessionFactory {
    pub fps: u32,
}

impl Default for VirtualSessionFactory {
    fn default() -> Self {
        Self {
            fps: virtual_sensor::DEFAULT_PREVIEW_FPS,
        }
    }
}

impl VirtualSessionFactory {
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }
}

impl SessionBackendFactory for VirtualSessionFactory {
    fn create(&self, role: Role) -> Box<dyn SessionBackend> {
        Box::new(VirtualSessionBackend::new(role, self.fps))
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for dual camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras and the resolved MAIN/AUX roles
//! - Describing a single camera
//! - Running one composite capture on the virtual platform

use dualcam::backends::camera::manager::DeviceSelection;
use dualcam::backends::camera::types::{Role, SurfaceTarget};
use dualcam::backends::camera::virtual_device::{VirtualDeviceLayer, VirtualSessionFactory};
use dualcam::backends::camera::{CameraInfo, CapabilityInspector, CharacteristicsSource};
use dualcam::constants::{cli_timing, virtual_sensor};
use dualcam::module::{DualCameraModule, ModuleParts, UiEvent};
use dualcam::storage::{DiskFileSaver, FileSaver, SaveListener, SaveRequest, SaveResult};
use dualcam::ui::{ChannelUi, UiNotification};
use dualcam::Config;
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let layer = VirtualDeviceLayer::dual();
    let cameras = CapabilityInspector::new(&layer).describe_all();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        print_camera(camera);
        println!();
    }

    let config = Config::load();
    let selection = DeviceSelection::resolve(
        &layer.list_identifiers(),
        config.main_camera_id.as_deref(),
        config.aux_camera_id.as_deref(),
    );
    println!(
        "Roles: MAIN = {}, AUX = {}",
        selection.main.as_deref().unwrap_or("none"),
        selection.aux.as_deref().unwrap_or("none")
    );

    Ok(())
}

/// Describe one camera
pub fn camera_info(camera_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let layer = VirtualDeviceLayer::dual();
    match CapabilityInspector::new(&layer).describe(camera_id) {
        Some(camera) => print_camera(&camera),
        None => println!("Camera {} not found.", camera_id),
    }
    Ok(())
}

fn print_camera(camera: &CameraInfo) {
    println!("  [{}] {} camera", camera.id, camera.facing);
    println!("      Logical multi-camera: {}", camera.is_logical_multi_camera());
    println!("      Focal lengths: {}", camera.focal_lengths_display());
    println!("      Hardware level: {}", camera.hardware_level);
    println!("      Sensor orientation: {}", camera.sensor_orientation);
    println!(
        "      Active array: {}x{}",
        camera.active_array.width(),
        camera.active_array.height()
    );
    println!("      Capabilities: {}", camera.capabilities_display());
}

/// Run one composite capture and print where the pictures went
pub fn capture(
    main: Option<String>,
    aux: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if main.is_some() {
        config.main_camera_id = main;
    }
    if aux.is_some() {
        config.aux_camera_id = aux;
    }
    let output_dir = output.unwrap_or_else(|| config.photo_directory());
    std::fs::create_dir_all(&output_dir)?;

    let rt = tokio::runtime::Runtime::new()?;
    let saved = rt.block_on(run_capture(config, output_dir))?;

    for (role, path) in saved {
        println!("{} picture saved: {}", role.label(), path.display());
    }
    Ok(())
}

async fn run_capture(
    config: Config,
    output_dir: PathBuf,
) -> Result<Vec<(Role, PathBuf)>, Box<dyn std::error::Error>> {
    let (ui, mut notifications) = ChannelUi::new();
    let (reports, mut results) = mpsc::unbounded();
    let saver = ReportingSaver {
        inner: DiskFileSaver::new(output_dir, config.jpeg_quality),
        reports,
    };

    let (handle, task) = DualCameraModule::spawn(ModuleParts {
        layer: Arc::new(VirtualDeviceLayer::dual()),
        sessions: Arc::new(VirtualSessionFactory::new(config.preview_fps)),
        saver: Arc::new(saver),
        ui: Arc::new(ui.with_frames(true)),
        config,
    });

    handle.start()?;
    let snapshot = handle.snapshot().await?;
    if !snapshot.flags.running {
        task.await?;
        return Err("Module failed to start".into());
    }
    let expected = snapshot.barrier_target as usize;
    println!(
        "Using cameras: MAIN = {}, AUX = {}",
        snapshot.main_id.as_deref().unwrap_or("none"),
        snapshot.aux_id.as_deref().unwrap_or("none")
    );

    let (width, height) = (virtual_sensor::PREVIEW_WIDTH, virtual_sensor::PREVIEW_HEIGHT);
    handle.ui(UiEvent::SurfaceReady {
        main: SurfaceTarget::new("main", width, height),
        aux: SurfaceTarget::new("aux", width, height),
    })?;

    // Wait until every present device shows frames
    let previewing = tokio::time::timeout(cli_timing::PREVIEW_TIMEOUT, async {
        let mut seen = HashSet::new();
        while let Some(notification) = notifications.next().await {
            match notification {
                UiNotification::PreviewFrame(role, _) => {
                    seen.insert(role);
                    if seen.len() >= expected {
                        return Ok(());
                    }
                }
                UiNotification::Notice(message) => return Err(message),
                _ => {}
            }
        }
        Err("Module stopped".to_string())
    })
    .await;

    match previewing {
        Ok(Ok(())) => {}
        Ok(Err(message)) => {
            handle.shutdown()?;
            task.await?;
            return Err(message.into());
        }
        Err(_) => {
            handle.shutdown()?;
            task.await?;
            return Err("Timed out waiting for preview".into());
        }
    }

    println!("Capturing...");
    handle.ui(UiEvent::PreviewReady)?;
    handle.ui(UiEvent::ShutterPressed)?;

    let collected = tokio::time::timeout(cli_timing::CAPTURE_TIMEOUT, async {
        let mut saved = Vec::new();
        let mut failures = Vec::new();
        while saved.len() + failures.len() < expected {
            match results.next().await {
                Some((role, SaveResult::Saved(media))) => saved.push((role, media.path)),
                Some((role, SaveResult::SaveFailed(message))) => {
                    failures.push(format!("{}: {}", role.label(), message))
                }
                None => break,
            }
        }
        (saved, failures)
    })
    .await;

    handle.shutdown()?;
    task.await?;

    let (saved, failures) = collected.map_err(|_| "Timed out waiting for pictures")?;
    if !failures.is_empty() {
        return Err(format!("Failed to save: {}", failures.join(", ")).into());
    }
    Ok(saved)
}

/// Disk saver that also reports each result to the command
struct ReportingSaver {
    inner: DiskFileSaver,
    reports: mpsc::UnboundedSender<(Role, SaveResult)>,
}

impl FileSaver for ReportingSaver {
    fn save(&self, request: SaveRequest, listener: SaveListener) {
        let role = request.role;
        let reports = self.reports.clone();
        self.inner.save(
            request,
            Box::new(move |result| {
                let _ = reports.unbounded_send((role, result.clone()));
                listener(result);
            }),
        );
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the composite module state machine
//!
//! The module is driven synchronously: every message it posts to its own
//! queue is pumped back into `update()`. Scripted backends record commands
//! and never spawn threads.

use dualcam::backends::camera::types::*;
use dualcam::backends::camera::{
    CaptureCallbackSink, CharacteristicsSource, DeviceEventSink, DeviceLayer, SessionBackend,
    SessionBackendFactory,
};
use dualcam::module::{DualCameraModule, Message, ModuleParts, ModuleSnapshot, UiEvent};
use dualcam::storage::{FileSaver, SaveListener, SaveRequest, SaveResult, SavedMedia, Thumbnail};
use dualcam::ui::{ChannelUi, UiNotification};
use dualcam::Config;
use futures::channel::mpsc as ui_channel;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// Scripted collaborators
// =============================================================================

#[derive(Default)]
struct ScriptedLayer {
    ids: Vec<String>,
    sink: Mutex<Option<Arc<dyn DeviceEventSink>>>,
    opens: Mutex<Vec<(String, Option<String>)>>,
    closes: Mutex<u32>,
}

impl ScriptedLayer {
    fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    fn sink(&self) -> Arc<dyn DeviceEventSink> {
        self.sink.lock().unwrap().clone().expect("open was not called")
    }

    fn closes(&self) -> u32 {
        *self.closes.lock().unwrap()
    }
}

impl CharacteristicsSource for ScriptedLayer {
    fn list_identifiers(&self) -> Vec<String> {
        self.ids.clone()
    }

    fn characteristics(&self, camera_id: &str) -> Option<RawCharacteristics> {
        self.ids.iter().any(|id| id == camera_id).then(|| RawCharacteristics {
            lens_facing: Some(1),
            focal_lengths: vec![4.0],
            hardware_level: Some(1),
            capabilities: vec![0],
            active_array: Rect::new(0, 0, 4000, 3000),
            sensor_orientation: 0,
        })
    }
}

impl DeviceLayer for ScriptedLayer {
    fn open(
        &self,
        main_id: &str,
        aux_id: Option<&str>,
        sink: Arc<dyn DeviceEventSink>,
    ) -> BackendResult<()> {
        self.opens
            .lock()
            .unwrap()
            .push((main_id.to_string(), aux_id.map(str::to_string)));
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn close(&self) {
        *self.closes.lock().unwrap() += 1;
    }
}

#[derive(Default)]
struct ScriptedFactory {
    log: Arc<Mutex<Vec<String>>>,
    sinks: Arc<Mutex<Vec<(Role, Arc<dyn CaptureCallbackSink>)>>>,
}

impl ScriptedFactory {
    fn calls(&self, role: Role, command: &str) -> usize {
        let entry = format!("{}:{}", role.label(), command);
        self.log.lock().unwrap().iter().filter(|e| **e == entry).count()
    }

    fn commands(&self, role: Role) -> Vec<String> {
        let prefix = format!("{}:", role.label());
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Latest callback sink registered for `role`
    fn sink(&self, role: Role) -> Arc<dyn CaptureCallbackSink> {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(r, _)| *r == role)
            .map(|(_, sink)| Arc::clone(sink))
            .expect("preview was not started")
    }
}

impl SessionBackendFactory for ScriptedFactory {
    fn create(&self, role: Role) -> Box<dyn SessionBackend> {
        Box::new(ScriptedSession {
            role,
            log: Arc::clone(&self.log),
            sinks: Arc::clone(&self.sinks),
        })
    }
}

struct ScriptedSession {
    role: Role,
    log: Arc<Mutex<Vec<String>>>,
    sinks: Arc<Mutex<Vec<(Role, Arc<dyn CaptureCallbackSink>)>>>,
}

impl ScriptedSession {
    fn record(&self, command: impl std::fmt::Display) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.role.label(), command));
    }
}

impl SessionBackend for ScriptedSession {
    fn configure(
        &mut self,
        _device: &DeviceHandle,
        _surface: &SurfaceTarget,
        sink: Arc<dyn CaptureCallbackSink>,
    ) -> BackendResult<()> {
        self.record("configure");
        self.sinks.lock().unwrap().push((self.role, sink));
        Ok(())
    }

    fn capture_still(&mut self, _orientation: u32) -> BackendResult<()> {
        self.record("capture");
        Ok(())
    }

    fn resume_repeating(&mut self) -> BackendResult<()> {
        self.record("resume");
        Ok(())
    }

    fn set_regions(&mut self, _focus: MeteringRect, _meter: MeteringRect) -> BackendResult<()> {
        self.record("regions");
        Ok(())
    }

    fn set_af_mode(&mut self, mode: FocusMode) -> BackendResult<()> {
        self.record(format!("af={:?}", mode));
        Ok(())
    }

    fn close(&mut self) {
        self.record("close");
    }
}

#[derive(Default)]
struct ScriptedSaver {
    pending: Mutex<Vec<(SaveRequest, Option<SaveListener>)>>,
}

impl ScriptedSaver {
    fn requests(&self) -> Vec<(Role, String)> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| (request.role, request.device_tag.clone()))
            .collect()
    }

    fn complete(&self, index: usize, result: SaveResult) {
        let listener = self.pending.lock().unwrap()[index]
            .1
            .take()
            .expect("already completed");
        listener(result);
    }
}

impl FileSaver for ScriptedSaver {
    fn save(&self, request: SaveRequest, listener: SaveListener) {
        self.pending.lock().unwrap().push((request, Some(listener)));
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    module: DualCameraModule,
    queue: mpsc::UnboundedReceiver<Message>,
    layer: Arc<ScriptedLayer>,
    factory: Arc<ScriptedFactory>,
    saver: Arc<ScriptedSaver>,
    notifications: ui_channel::UnboundedReceiver<UiNotification>,
}

impl Harness {
    fn new(ids: &[&str]) -> Self {
        Self::with_config(ids, Config::default())
    }

    fn with_config(ids: &[&str], config: Config) -> Self {
        let layer = Arc::new(ScriptedLayer::new(ids));
        let factory = Arc::new(ScriptedFactory::default());
        let saver = Arc::new(ScriptedSaver::default());
        let (ui, notifications) = ChannelUi::new();
        let (module, queue) = DualCameraModule::new(ModuleParts {
            layer: layer.clone(),
            sessions: factory.clone(),
            saver: saver.clone(),
            ui: Arc::new(ui),
            config,
        });
        Self {
            module,
            queue,
            layer,
            factory,
            saver,
            notifications,
        }
    }

    /// Feed everything the module posted to itself back into it
    fn pump(&mut self) {
        while let Ok(message) = self.queue.try_recv() {
            let _ = self.module.update(message);
        }
    }

    fn send(&mut self, message: Message) {
        let _ = self.module.update(message);
        self.pump();
    }

    fn ui(&mut self, event: UiEvent) {
        self.send(Message::Ui(event));
    }

    fn start(&mut self) {
        self.send(Message::Start);
    }

    fn aux_opened(&mut self, id: &str) {
        self.layer.sink().on_aux_opened(DeviceHandle::new(id));
        self.pump();
    }

    fn main_opened(&mut self, id: &str) {
        self.layer.sink().on_main_opened(DeviceHandle::new(id));
        self.pump();
    }

    fn surface_ready(&mut self) {
        self.ui(UiEvent::SurfaceReady {
            main: SurfaceTarget::new("main", 640, 480),
            aux: SurfaceTarget::new("aux", 640, 480),
        });
    }

    fn picture(&mut self, role: Role) {
        self.factory.sink(role).on_data_back(vec![0xFF, 0xD8, 0xFF], 640, 480);
        self.pump();
    }

    /// Start, open both devices and bring preview up
    fn previewing(ids: &[&str]) -> Self {
        let mut harness = Self::new(ids);
        harness.start();
        if ids.len() > 1 {
            harness.aux_opened(ids[ids.len() - 1]);
        }
        harness.main_opened(ids[0]);
        harness.surface_ready();
        harness.drain();
        harness
    }

    fn snapshot(&self) -> ModuleSnapshot {
        self.module.snapshot()
    }

    fn drain(&mut self) -> Vec<UiNotification> {
        let mut out = Vec::new();
        while let Ok(Some(notification)) = self.notifications.try_next() {
            out.push(notification);
        }
        out
    }
}

fn media(name: &str) -> SavedMedia {
    SavedMedia {
        uri: format!("file:///pictures/{}", name),
        path: format!("/pictures/{}", name).into(),
        thumbnail: Some(Thumbnail {
            width: 1,
            height: 1,
            rgba: Arc::new(vec![0, 0, 0, 255]),
        }),
    }
}

// =============================================================================
// Open sequencing
// =============================================================================

#[test]
fn test_preview_starts_once_for_every_ordering() {
    #[derive(Clone, Copy, Debug)]
    enum Step {
        Aux,
        Main,
        Surface,
    }

    let orderings = [
        [Step::Aux, Step::Main, Step::Surface],
        [Step::Aux, Step::Surface, Step::Main],
        [Step::Surface, Step::Aux, Step::Main],
    ];

    for ordering in orderings {
        let mut harness = Harness::new(&["0", "1"]);
        harness.start();

        for (index, step) in ordering.iter().enumerate() {
            match step {
                Step::Aux => harness.aux_opened("1"),
                Step::Main => harness.main_opened("0"),
                Step::Surface => harness.surface_ready(),
            }

            let expected = if index == ordering.len() - 1 { 1 } else { 0 };
            for role in Role::ALL {
                assert_eq!(
                    harness.factory.calls(role, "configure"),
                    expected,
                    "{:?} after step {} of {:?}",
                    role,
                    index,
                    ordering
                );
            }
        }

        let snapshot = harness.snapshot();
        assert!(snapshot.flags.opened && snapshot.flags.ui_ready);
        assert_eq!(snapshot.main_state, SessionState::Previewing);
        assert_eq!(snapshot.aux_state, Some(SessionState::Previewing));
    }
}

#[test]
fn test_main_delivered_first_is_held_until_aux() {
    let mut harness = Harness::new(&["0", "1"]);
    harness.start();
    harness.surface_ready();

    harness.main_opened("0");
    assert!(!harness.snapshot().flags.opened);
    assert_eq!(harness.factory.calls(Role::Main, "configure"), 0);

    harness.aux_opened("1");
    let snapshot = harness.snapshot();
    assert!(snapshot.flags.opened);
    assert_eq!(snapshot.main_state, SessionState::Previewing);
    assert_eq!(snapshot.aux_state, Some(SessionState::Previewing));
}

#[test]
fn test_device_closed_clears_opened_and_shows_cover() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.factory.sink(Role::Main).on_frame(CameraFrame {
        width: 2,
        height: 2,
        data: Arc::from(vec![0u8; 16]),
        sequence: 1,
        captured_at: std::time::Instant::now(),
    });
    harness.pump();
    assert_eq!(harness.snapshot().frames, [1, 0]);

    harness.layer.sink().on_closed();
    harness.pump();

    let snapshot = harness.snapshot();
    assert!(!snapshot.flags.opened);
    assert_eq!(snapshot.frames, [0, 0]);
    let notifications = harness.drain();
    assert!(notifications.contains(&UiNotification::ResetFrameCount));
    assert!(notifications.contains(&UiNotification::ShowCover));
}

#[test]
fn test_open_error_stops_module() {
    let mut harness = Harness::new(&["0", "1"]);
    harness.start();
    harness.layer.sink().on_open_error(Role::Aux, "busy".to_string());
    harness.pump();

    let snapshot = harness.snapshot();
    assert!(!snapshot.flags.running);
    assert_eq!(harness.layer.closes(), 1);
    assert!(
        harness
            .drain()
            .iter()
            .any(|n| matches!(n, UiNotification::Notice(message) if message.contains("busy")))
    );
}

#[test]
fn test_no_camera_reports_notice() {
    let mut harness = Harness::new(&[]);
    harness.start();

    assert!(!harness.snapshot().flags.running);
    assert!(harness.layer.opens.lock().unwrap().is_empty());
    assert!(harness
        .drain()
        .contains(&UiNotification::Notice("No camera devices found".to_string())));
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_default_roles_first_and_last() {
    let mut harness = Harness::new(&["0", "1"]);
    harness.start();

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.main_id.as_deref(), Some("0"));
    assert_eq!(snapshot.aux_id.as_deref(), Some("1"));
    assert_eq!(
        *harness.layer.opens.lock().unwrap(),
        vec![("0".to_string(), Some("1".to_string()))]
    );
}

#[test]
fn test_configured_roles_win() {
    let config = Config {
        main_camera_id: Some("2".to_string()),
        aux_camera_id: Some("0".to_string()),
        ..Config::default()
    };
    let mut harness = Harness::with_config(&["0", "1", "2"], config);
    harness.start();

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.main_id.as_deref(), Some("2"));
    assert_eq!(snapshot.aux_id.as_deref(), Some("0"));
}

#[test]
fn test_single_camera_runs_main_only() {
    let mut harness = Harness::new(&["0"]);
    harness.start();

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.main_id.as_deref(), Some("0"));
    assert_eq!(snapshot.aux_id, None);
    assert_eq!(snapshot.session_state(Role::Aux), None);
    assert_eq!(snapshot.barrier_target, 1);

    harness.main_opened("0");
    harness.surface_ready();
    assert_eq!(harness.snapshot().main_state, SessionState::Previewing);

    harness.drain();
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);

    let snapshot = harness.snapshot();
    assert!(!snapshot.capturing);
    assert_eq!(snapshot.main_state, SessionState::Previewing);
    assert!(harness.drain().contains(&UiNotification::ModuleClickable(true)));
    assert!(harness.factory.commands(Role::Aux).is_empty());
}

#[test]
fn test_barrier_restores_ui_after_both_pictures() {
    for order in [[Role::Main, Role::Aux], [Role::Aux, Role::Main]] {
        let mut harness = Harness::previewing(&["0", "1"]);

        harness.ui(UiEvent::ShutterPressed);
        let notifications = harness.drain();
        assert!(notifications.contains(&UiNotification::ModuleClickable(false)));
        assert!(notifications.contains(&UiNotification::BaseClickable(false)));
        assert_eq!(harness.snapshot().main_state, SessionState::Capturing);
        assert_eq!(harness.snapshot().aux_state, Some(SessionState::Capturing));

        harness.picture(order[0]);
        let snapshot = harness.snapshot();
        assert_eq!(snapshot.pending, 1);
        assert!(snapshot.capturing);
        assert!(!harness.drain().contains(&UiNotification::ModuleClickable(true)));

        harness.picture(order[1]);
        let snapshot = harness.snapshot();
        assert_eq!(snapshot.pending, 0);
        assert!(!snapshot.capturing);
        assert_eq!(snapshot.main_state, SessionState::Previewing);
        assert_eq!(snapshot.aux_state, Some(SessionState::Previewing));
        assert!(harness.drain().contains(&UiNotification::ModuleClickable(true)));

        for role in Role::ALL {
            assert_eq!(harness.factory.calls(role, "resume"), 1);
        }
    }
}

#[test]
fn test_pictures_are_saved_with_role_and_device() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Aux);
    harness.picture(Role::Main);

    assert_eq!(
        harness.saver.requests(),
        vec![(Role::Aux, "1".to_string()), (Role::Main, "0".to_string())]
    );
}

#[test]
fn test_duplicate_picture_does_not_fire_barrier_twice() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);

    harness.picture(Role::Main);
    harness.picture(Role::Main);
    assert!(harness.snapshot().capturing);

    harness.picture(Role::Aux);
    harness.picture(Role::Aux);
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "resume"), 1);
    }
}

#[test]
fn test_shutter_ignored_while_capturing() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.ui(UiEvent::ShutterPressed);

    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "capture"), 1);
    }
}

#[test]
fn test_surface_destroyed_keeps_sessions() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::SurfaceDestroyed);

    let snapshot = harness.snapshot();
    assert!(!snapshot.flags.ui_ready);
    assert!(snapshot.flags.opened);
    assert_eq!(snapshot.main_state, SessionState::Previewing);
    assert_eq!(snapshot.aux_state, Some(SessionState::Previewing));
    assert_eq!(harness.layer.closes(), 0);
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "close"), 0);
    }

    // A new surface restarts preview on the live sessions
    harness.surface_ready();
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "configure"), 2);
    }
}

#[test]
fn test_failed_aux_save_keeps_main_result() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    harness.picture(Role::Aux);
    harness.drain();

    harness.saver.complete(0, SaveResult::Saved(media("main.jpg")));
    harness.pump();
    let notifications = harness.drain();
    assert!(notifications.iter().any(|n| matches!(n, UiNotification::Thumbnail(_))));

    harness
        .saver
        .complete(1, SaveResult::SaveFailed("Disk full".to_string()));
    harness.pump();
    let notifications = harness.drain();
    assert!(notifications.contains(&UiNotification::Notice("Disk full".to_string())));
    assert!(notifications.contains(&UiNotification::ModuleClickable(true)));
    assert!(notifications.contains(&UiNotification::BaseClickable(true)));
    assert!(!notifications.iter().any(|n| matches!(n, UiNotification::Thumbnail(_))));

    assert_eq!(harness.snapshot().last_saved, Some(media("main.jpg")));
}

#[test]
fn test_thumbnail_opens_last_saved_media() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ThumbnailPressed);
    assert!(harness.drain().contains(&UiNotification::OpenGallery(None)));

    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    harness.picture(Role::Aux);
    harness.saver.complete(1, SaveResult::Saved(media("aux.jpg")));
    harness.pump();
    harness.drain();

    harness.ui(UiEvent::ThumbnailPressed);
    assert!(harness
        .drain()
        .contains(&UiNotification::OpenGallery(Some(media("aux.jpg")))));
}

#[test]
fn test_clicks_are_forwarded() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::SettingsPressed);
    harness.ui(UiEvent::ModuleSwitch(3));
    harness.ui(UiEvent::PreviewReady);

    let notifications = harness.drain();
    assert!(notifications.contains(&UiNotification::ShowSettings));
    assert!(notifications.contains(&UiNotification::SwitchModule(3)));
    assert!(notifications.contains(&UiNotification::HideCover));
}

// =============================================================================
// Focus
// =============================================================================

#[test]
fn test_touch_focus_applies_to_main_only() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.factory.sink(Role::Main).on_geometry_changed(400, 300);
    harness.pump();
    harness.drain();

    harness.ui(UiEvent::Touch { x: 200.0, y: 150.0 });

    let main = harness.factory.commands(Role::Main);
    assert!(main.contains(&"af=Auto".to_string()));
    assert!(main.contains(&"regions".to_string()));
    let aux = harness.factory.commands(Role::Aux);
    assert!(!aux.iter().any(|c| c == "regions" || c.starts_with("af=")));
    assert!(harness.drain().contains(&UiNotification::ShowFocus(200.0, 150.0)));
}

#[test]
fn test_main_geometry_updates_ui_size() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.factory.sink(Role::Aux).on_geometry_changed(320, 240);
    harness.factory.sink(Role::Main).on_geometry_changed(640, 480);
    harness.pump();

    let sizes: Vec<_> = harness
        .drain()
        .into_iter()
        .filter(|n| matches!(n, UiNotification::UiSize(..)))
        .collect();
    assert_eq!(sizes, vec![UiNotification::UiSize(640, 480)]);
}

#[tokio::test]
async fn test_focus_reset_restores_continuous_focus() {
    let config = Config {
        focus_reset_delay_ms: 10,
        ..Config::default()
    };
    let mut harness = Harness::with_config(&["0", "1"], config);
    harness.start();
    harness.aux_opened("1");
    harness.main_opened("0");
    harness.surface_ready();

    harness.ui(UiEvent::Touch { x: 10.0, y: 10.0 });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    harness.pump();

    for role in Role::ALL {
        assert!(
            harness
                .factory
                .commands(role)
                .contains(&"af=ContinuousPicture".to_string()),
            "{:?} focus not reset",
            role
        );
    }
    assert!(harness.drain().contains(&UiNotification::HideFocus));
}

// =============================================================================
// Release and late callbacks
// =============================================================================

#[test]
fn test_stop_is_idempotent() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.send(Message::Stop);
    harness.send(Message::Stop);

    let snapshot = harness.snapshot();
    assert!(!snapshot.flags.running && !snapshot.flags.opened);
    assert_eq!(snapshot.main_state, SessionState::Released);
    assert_eq!(snapshot.aux_state, Some(SessionState::Released));
    assert_eq!(harness.layer.closes(), 1);
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "close"), 1);
    }
}

#[test]
fn test_stop_while_partially_opened() {
    let mut harness = Harness::new(&["0", "1"]);
    harness.start();
    harness.aux_opened("1");
    harness.send(Message::Stop);

    let snapshot = harness.snapshot();
    assert!(!snapshot.flags.running);
    assert_eq!(snapshot.main_state, SessionState::Released);
    assert_eq!(snapshot.aux_state, Some(SessionState::Released));
    assert_eq!(harness.factory.calls(Role::Aux, "close"), 1);
    // Main was never bound, nothing to close
    assert_eq!(harness.factory.calls(Role::Main, "close"), 0);

    // The main device finishing its open afterwards changes nothing
    harness.main_opened("0");
    assert_eq!(harness.snapshot().main_state, SessionState::Released);
}

#[test]
fn test_late_picture_and_save_after_stop_are_discarded() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    let aux_sink = harness.factory.sink(Role::Aux);

    harness.send(Message::Stop);
    harness.drain();

    aux_sink.on_data_back(vec![0xFF, 0xD8], 640, 480);
    harness.pump();
    harness.saver.complete(0, SaveResult::Saved(media("late.jpg")));
    harness.pump();

    assert_eq!(harness.saver.requests().len(), 1);
    assert_eq!(harness.snapshot().last_saved, None);
    assert!(!harness
        .drain()
        .iter()
        .any(|n| matches!(n, UiNotification::Thumbnail(_))));
}

#[test]
fn test_stop_mid_capture_restores_ui() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    harness.drain();

    harness.send(Message::Stop);
    let notifications = harness.drain();
    assert!(notifications.contains(&UiNotification::ModuleClickable(true)));
    assert!(notifications.contains(&UiNotification::BaseClickable(true)));
    assert!(!harness.snapshot().capturing);

    // The old run's save result is stale and must not matter
    harness.saver.complete(0, SaveResult::Saved(media("late.jpg")));
    harness.pump();

    harness.start();
    harness.aux_opened("1");
    harness.main_opened("0");
    harness.surface_ready();
    harness.drain();

    harness.ui(UiEvent::ShutterPressed);
    assert!(harness.snapshot().capturing);
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "capture"), 2);
    }
}

#[test]
fn test_device_closed_mid_capture_restores_ui() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    harness.drain();

    harness.layer.sink().on_closed();
    harness.pump();

    let snapshot = harness.snapshot();
    assert!(!snapshot.capturing);
    assert_eq!(snapshot.pending, 0);
    let notifications = harness.drain();
    assert!(notifications.contains(&UiNotification::ModuleClickable(true)));
    assert!(notifications.contains(&UiNotification::BaseClickable(true)));

    // A picture still on its way is not saved
    harness.picture(Role::Aux);
    assert_eq!(harness.saver.requests().len(), 1);
}

#[test]
fn test_save_result_mid_capture_keeps_ui_locked() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);
    harness.picture(Role::Main);
    harness.drain();

    harness.saver.complete(0, SaveResult::Saved(media("main.jpg")));
    harness.pump();

    let snapshot = harness.snapshot();
    assert!(snapshot.capturing);
    assert_eq!(snapshot.pending, 1);
    assert_eq!(snapshot.last_saved, Some(media("main.jpg")));
    let notifications = harness.drain();
    assert!(notifications.iter().any(|n| matches!(n, UiNotification::Thumbnail(_))));
    assert!(!notifications.contains(&UiNotification::ModuleClickable(true)));
    assert!(!notifications.contains(&UiNotification::BaseClickable(true)));

    harness.picture(Role::Aux);
    assert!(!harness.snapshot().capturing);
    assert!(harness.drain().contains(&UiNotification::ModuleClickable(true)));
}

#[test]
fn test_surfaces_replaced_during_capture_are_used_after_barrier() {
    let mut harness = Harness::previewing(&["0", "1"]);
    harness.ui(UiEvent::ShutterPressed);

    harness.ui(UiEvent::SurfaceDestroyed);
    harness.ui(UiEvent::SurfaceReady {
        main: SurfaceTarget::new("main-relayout", 800, 600),
        aux: SurfaceTarget::new("aux-relayout", 800, 600),
    });
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "configure"), 1);
    }

    harness.picture(Role::Main);
    harness.picture(Role::Aux);

    let snapshot = harness.snapshot();
    assert!(!snapshot.capturing);
    assert_eq!(snapshot.main_state, SessionState::Previewing);
    assert_eq!(snapshot.aux_state, Some(SessionState::Previewing));
    for role in Role::ALL {
        assert_eq!(harness.factory.calls(role, "configure"), 2);
    }
}

#[test]
fn test_restart_ignores_previous_run() {
    let mut harness = Harness::previewing(&["0", "1"]);
    let old_device_sink = harness.layer.sink();
    harness.send(Message::Stop);

    harness.start();
    assert_eq!(harness.snapshot().epoch, 2);
    assert_eq!(harness.snapshot().main_state, SessionState::Unbound);

    old_device_sink.on_aux_opened(DeviceHandle::new("1"));
    old_device_sink.on_main_opened(DeviceHandle::new("0"));
    harness.pump();
    assert!(!harness.snapshot().flags.opened);

    harness.aux_opened("1");
    harness.main_opened("0");
    harness.surface_ready();
    assert_eq!(harness.snapshot().main_state, SessionState::Previewing);
}

#[test]
fn test_shutdown_breaks_loop() {
    let mut harness = Harness::previewing(&["0", "1"]);
    assert!(harness.module.update(Message::Shutdown).is_break());
    assert!(!harness.snapshot().flags.running);
}

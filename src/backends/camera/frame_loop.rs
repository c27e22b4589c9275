// SPDX-License-Identifier: GPL-3.0-only
//! Repeating preview loop on a dedicated thread
//!
//! Streaming backends that emit preview frames themselves drive them from
//! a [`CaptureLoopController`]: one named thread, one callback per frame
//! slot, paced to a fixed interval and stoppable from any thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep between stop checks
const STOP_POLL: Duration = Duration::from_millis(10);

/// What the frame callback wants next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Owner of one repeating preview thread
///
/// The callback receives the 1-based sequence number of the frame slot it
/// fills. Dropping the controller stops and joins the thread.
pub struct CaptureLoopController {
    name: String,
    worker: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
}

impl CaptureLoopController {
    /// Spawn the loop; a zero `frame_interval` runs slots back to back
    pub fn start<F>(name: &str, frame_interval: Duration, mut on_frame: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) -> LoopAction + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let delivered = Arc::new(AtomicU64::new(0));

        let worker_stop = Arc::clone(&stop);
        let worker_delivered = Arc::clone(&delivered);
        let worker_name = name.to_string();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %worker_name, "Preview loop running");
                let mut next_slot = Instant::now();

                while !worker_stop.load(Ordering::Acquire) {
                    let sequence = worker_delivered.fetch_add(1, Ordering::AcqRel) + 1;
                    if on_frame(sequence) == LoopAction::Stop {
                        debug!(name = %worker_name, sequence, "Preview loop ended by callback");
                        break;
                    }

                    // Pace against the schedule, not the callback duration,
                    // but never try to catch up on missed slots
                    next_slot += frame_interval;
                    let now = Instant::now();
                    if next_slot < now {
                        next_slot = now;
                    }
                    while !worker_stop.load(Ordering::Acquire) {
                        let remaining = next_slot.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        thread::sleep(remaining.min(STOP_POLL));
                    }
                }

                debug!(
                    name = %worker_name,
                    frames = worker_delivered.load(Ordering::Acquire),
                    "Preview loop exited"
                );
            })?;

        info!(name = %name, ?frame_interval, "Preview loop started");
        Ok(Self {
            name: name.to_string(),
            worker: Some(worker),
            stop,
            delivered,
        })
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Frame slots handed to the callback so far
    pub fn frames(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for the thread; idempotent
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Called from inside the callback: the loop sees the flag and exits
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!(name = %self.name, "Preview loop thread panicked");
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

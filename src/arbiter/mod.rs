//! Exclusive ownership of the physical camera.
//!
//! At most one capture session runs at a time. Switching modes stops the
//! current session before the next one opens the device.

mod capture;
mod lifecycle;


pub use lifecycle::{CameraArbiter, CameraArbiterBuilder};

use crate::classifier::ModeId;
use crate::frame::FrameData;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// State shared between the arbiter and its capture thread.
///
/// Kept apart from the lifecycle lock so readers of the latest frame never
/// wait on a mode switch.
#[derive(Default)]
pub(crate) struct SharedState {
    latest: RwLock<Option<FrameData>>,
    session: Mutex<Option<(Uuid, ModeId)>>,
    live_captures: AtomicUsize,
    frames_published: AtomicU64,
}

impl SharedState {
    /// Store a frame unless its session has already been cancelled
    fn publish(&self, frame: FrameData, cancel: &CancellationToken) {
        let mut latest = self.latest.write();
        if cancel.is_cancelled() {
            return;
        }
        *latest = Some(frame);
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    fn begin_session(&self, id: Uuid, mode: ModeId) {
        *self.latest.write() = None;
        *self.session.lock() = Some((id, mode));
        self.live_captures.fetch_add(1, Ordering::SeqCst);
    }

    /// Clear the current session if it is still `id`
    fn end_session(&self, id: Uuid) {
        let mut session = self.session.lock();
        if session.is_some_and(|(current, _)| current == id) {
            *session = None;
            *self.latest.write() = None;
        }
    }

    fn release_capture(&self) {
        self.live_captures.fetch_sub(1, Ordering::SeqCst);
    }

    fn current(&self) -> Option<(Uuid, ModeId)> {
        *self.session.lock()
    }
}

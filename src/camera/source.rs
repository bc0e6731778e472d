use crate::error::CameraError;
use crate::frame::FrameData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A pull-based frame producer owned by one capture loop at a time.
///
/// `read` distinguishes a transient miss (`Ok(None)`, retry after a short
/// pause) from a hard failure (`Err`, the capture loop gives up).
pub trait VideoSource: Send {
    fn open(&mut self) -> Result<(), CameraError>;

    fn is_open(&self) -> bool;

    fn read(&mut self) -> Result<Option<FrameData>, CameraError>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}

/// Builds a fresh source for each capture session
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn VideoSource> + Send + Sync>;

/// Open/close counters shared between a source and an observer
#[derive(Debug, Default)]
pub struct SourceProbe {
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl SourceProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Sources currently open according to the counters
    pub fn open_sources(&self) -> usize {
        self.opens().saturating_sub(self.closes())
    }
}

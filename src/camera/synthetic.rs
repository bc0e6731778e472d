use super::source::{SourceProbe, VideoSource};
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, trace};

/// Generated RGB frames for demos and tests.
///
/// Frames are paced to the configured rate unless built with `unpaced`.
/// Failure injection covers the three outcomes a capture loop has to handle:
/// refusing to open, transient empty reads and a hard read failure.
pub struct SyntheticVideoSource {
    width: u32,
    height: u32,
    frame_interval: Option<Duration>,
    fail_open: bool,
    miss_every: Option<u64>,
    fail_after: Option<u64>,
    probe: Option<Arc<SourceProbe>>,
    open: bool,
    reads: u64,
    frames: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticVideoSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Some(Duration::from_millis(1000 / fps.max(1) as u64)),
            fail_open: false,
            miss_every: None,
            fail_after: None,
            probe: None,
            open: false,
            reads: 0,
            frames: 0,
            last_frame_at: None,
        }
    }

    /// Produce frames as fast as they are read
    pub fn unpaced(mut self) -> Self {
        self.frame_interval = None;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every `n`th read returns no frame
    pub fn missing_every(mut self, n: u64) -> Self {
        self.miss_every = Some(n.max(1));
        self
    }

    /// Reads fail hard once `frames` frames have been produced
    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn with_probe(mut self, probe: Arc<SourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    fn render(&self, id: u64) -> Vec<u8> {
        let shade = (id % 256) as u8;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            let row = (y * 255 / self.height.max(1)) as u8;
            for _ in 0..self.width {
                data.extend_from_slice(&[shade, row, 96]);
            }
        }
        data
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame_at) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl VideoSource for SyntheticVideoSource {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.fail_open {
            return Err(CameraError::DeviceOpen {
                device: 0,
                details: "synthetic source configured to fail".to_string(),
            });
        }
        if !self.open {
            self.open = true;
            if let Some(probe) = &self.probe {
                probe.record_open();
            }
            debug!("Synthetic source opened ({}x{})", self.width, self.height);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self) -> Result<Option<FrameData>, CameraError> {
        if !self.open {
            return Err(CameraError::CaptureStream {
                details: "Synthetic source is not open".to_string(),
            });
        }
        if self.fail_after.is_some_and(|limit| self.frames >= limit) {
            return Err(CameraError::CaptureStream {
                details: format!("Synthetic source failed after {} frames", self.frames),
            });
        }

        self.reads += 1;
        if self.miss_every.is_some_and(|n| self.reads % n == 0) {
            trace!("Synthetic source skipping read {}", self.reads);
            return Ok(None);
        }

        self.pace();
        let id = self.frames;
        self.frames += 1;
        Ok(Some(FrameData::new(
            id,
            SystemTime::now(),
            self.render(id),
            self.width,
            self.height,
            FrameFormat::Rgb24,
        )))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            if let Some(probe) = &self.probe {
                probe.record_close();
            }
            debug!("Synthetic source closed after {} frames", self.frames);
        }
    }
}

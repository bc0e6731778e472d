//! Per-mode analyzers for the request/response path.
//!
//! Unlike the camera arbiter, sessions here are driven one uploaded frame at
//! a time. Each mode keeps a single analyzer for the lifetime of the process
//! so counts accumulate across requests until reset.


use crate::analyzer::{AnalyzedFrame, AnalyzerFactory, FrameAnalyzer};
use crate::classifier::ModeId;
use crate::error::AnalysisError;
use crate::frame::FrameData;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ModeSessionRegistry {
    analyzers: AnalyzerFactory,
    sessions: Mutex<HashMap<ModeId, Arc<Mutex<FrameAnalyzer>>>>,
}

impl ModeSessionRegistry {
    pub fn new(analyzers: AnalyzerFactory) -> Self {
        Self {
            analyzers,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The analyzer for `mode`, created on first use
    pub fn get_or_create(&self, mode: ModeId) -> Arc<Mutex<FrameAnalyzer>> {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(mode).or_insert_with(|| {
            info!("Creating {} session", mode);
            Arc::new(Mutex::new(self.analyzers.build(mode)))
        });
        Arc::clone(session)
    }

    /// Analyse one frame for `mode`.
    ///
    /// Frames for the same mode are processed one at a time; different modes
    /// proceed in parallel.
    pub fn process_one(&self, mode: ModeId, frame: &FrameData) -> Result<AnalyzedFrame, AnalysisError> {
        let session = self.get_or_create(mode);
        let mut analyzer = session.lock();
        let result = analyzer.process(frame, Instant::now());
        debug!(
            "{} session processed frame {} ({} total)",
            mode,
            frame.id,
            analyzer.frames_processed()
        );
        result
    }

    /// Reset the mode's classifier, creating the session if it never ran
    pub fn reset(&self, mode: ModeId) {
        let session = self.get_or_create(mode);
        session.lock().reset();
        info!("{} session reset", mode);
    }

    /// Modes that have a live session
    pub fn modes(&self) -> Vec<ModeId> {
        let mut modes: Vec<ModeId> = self.sessions.lock().keys().copied().collect();
        modes.sort_by_key(|mode| mode.as_str());
        modes
    }
}

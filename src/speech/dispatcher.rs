use super::SpeechSink;
use crate::config::SpeechConfig;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

enum SpeechMessage {
    Speak(String),
    Shutdown,
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// Bounded, deduplicating queue in front of a [`SpeechSink`].
///
/// `say` never blocks: when the queue is full the message is dropped. A
/// dedicated thread owns the sink and speaks one message at a time. Messages
/// still queued at shutdown are discarded.
pub struct FeedbackDispatcher {
    sender: Sender<SpeechMessage>,
    last_accepted: Mutex<Option<String>>,
    stopping: Arc<AtomicBool>,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    shutdown_timeout: Duration,
    worker: Mutex<Option<Worker>>,
}

impl FeedbackDispatcher {
    pub fn start(sink: Box<dyn SpeechSink>, config: &SpeechConfig) -> Self {
        let (sender, receiver) = channel::bounded(config.queue_capacity.max(1));
        let (done_tx, done_rx) = channel::bounded(1);
        let stopping = Arc::new(AtomicBool::new(false));

        let worker_stopping = Arc::clone(&stopping);
        let handle = thread::Builder::new()
            .name("fitcam-speech".to_string())
            .spawn(move || {
                run_worker(sink, receiver, worker_stopping);
                let _ = done_tx.send(());
            });

        let worker = match handle {
            Ok(handle) => Some(Worker {
                handle,
                done: done_rx,
            }),
            Err(e) => {
                error!("Failed to spawn speech worker: {}", e);
                stopping.store(true, Ordering::Release);
                None
            }
        };

        Self {
            sender,
            last_accepted: Mutex::new(None),
            stopping,
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
            worker: Mutex::new(worker),
        }
    }

    /// Queue `text` unless it repeats the previously accepted message.
    ///
    /// Returns whether the text was queued.
    pub fn say(&self, text: &str) -> bool {
        if text.is_empty() || self.stopping.load(Ordering::Acquire) {
            return false;
        }

        let mut last = self.last_accepted.lock();
        if last.as_deref() == Some(text) {
            return false;
        }

        match self.sender.try_send(SpeechMessage::Speak(text.to_string())) {
            Ok(()) => {
                *last = Some(text.to_string());
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Speech queue full, dropping {:?}", text);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Speech worker gone, ignoring {:?}", text);
                false
            }
        }
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.stopping.load(Ordering::Acquire) && self.worker.lock().is_some()
    }

    /// Stop the worker, waiting at most the configured timeout.
    ///
    /// Returns `true` when the worker exited in time. A worker stuck inside
    /// the sink is detached and left to finish on its own.
    pub fn shutdown(&self) -> bool {
        self.stopping.store(true, Ordering::Release);
        let Some(worker) = self.worker.lock().take() else {
            return true;
        };

        let deadline = Instant::now() + self.shutdown_timeout;
        if self
            .sender
            .send_timeout(SpeechMessage::Shutdown, self.shutdown_timeout)
            .is_err()
        {
            debug!("Speech worker did not accept shutdown message");
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match worker.done.recv_timeout(remaining) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    error!("Speech worker panicked");
                }
                info!("Speech dispatcher stopped ({} messages queued)", self.enqueued());
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Speech worker did not stop within {:?}, detaching",
                    self.shutdown_timeout
                );
                false
            }
        }
    }
}

impl Drop for FeedbackDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    mut sink: Box<dyn SpeechSink>,
    receiver: Receiver<SpeechMessage>,
    stopping: Arc<AtomicBool>,
) {
    debug!("Speech worker started");
    let mut spoken = 0u64;

    while let Ok(message) = receiver.recv() {
        match message {
            SpeechMessage::Shutdown => break,
            SpeechMessage::Speak(_) if stopping.load(Ordering::Acquire) => continue,
            SpeechMessage::Speak(text) => match sink.speak(&text) {
                Ok(()) => spoken += 1,
                Err(e) => warn!("Speech sink failed for {:?}: {}", text, e),
            },
        }
    }

    debug!("Speech worker exiting after {} messages", spoken);
}

// Event marshaling from the native engine's threads onto a single
// delivery worker

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

use crate::error::{PlayerError, Result};
use crate::guard::ReleaseGuard;
use crate::state::{PlayerState, PlayerStateCell};

/// Event raised by the native engine. The origin thread is the engine's
/// own and is not consistent across categories.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// prepare() finished; the engine is ready
    Prepared,
    /// Playback ran to the end
    Completed,
    /// Buffering progress, 0-100
    BufferingUpdate { percent: i32 },
    VideoSizeChanged {
        width: i32,
        height: i32,
        sar_num: i32,
        sar_den: i32,
    },
    Error {
        code: i32,
        extra: i32,
        message: String,
    },
}

pub type PreparedListener = Arc<dyn Fn() + Send + Sync>;
pub type CompletionListener = Arc<dyn Fn() + Send + Sync>;
pub type BufferingListener = Arc<dyn Fn(i32) + Send + Sync>;
pub type VideoSizeListener = Arc<dyn Fn(i32, i32, i32, i32) + Send + Sync>;
/// Returns true if the error was handled; false leaves it to the caller's
/// own error path, nothing propagates further.
pub type ErrorListener = Arc<dyn Fn(i32, i32, &str) -> bool + Send + Sync>;

/// One replaceable slot per event category. Replacing a slot affects
/// subsequently delivered events only; a delivery already in flight keeps
/// the listener it read.
#[derive(Default)]
struct Listeners {
    prepared: Option<PreparedListener>,
    completion: Option<CompletionListener>,
    buffering: Option<BufferingListener>,
    video_size: Option<VideoSizeListener>,
    error: Option<ErrorListener>,
}

/// Bridges "whatever thread the engine raises on" to exactly one delivery
/// worker.
///
/// A single FIFO channel feeds the worker, which gives per-category raise
/// order for free and never fans deliveries out across threads. The release
/// flag is checked both when an event is raised and again at delivery time,
/// closing the race where release lands between the two.
pub struct CallbackDispatcher {
    guard: Arc<ReleaseGuard>,
    state: PlayerStateCell,
    listeners: Mutex<Listeners>,
    tx: Mutex<Option<Sender<EngineEvent>>>,
}

impl CallbackDispatcher {
    /// Starts the delivery worker and returns the shared dispatcher.
    pub fn spawn(guard: Arc<ReleaseGuard>, state: PlayerStateCell) -> Result<Arc<Self>> {
        let (tx, rx) = unbounded();
        let dispatcher = Arc::new(Self {
            guard,
            state,
            listeners: Mutex::new(Listeners::default()),
            tx: Mutex::new(Some(tx)),
        });

        let worker = Arc::clone(&dispatcher);
        thread::Builder::new()
            .name("media-bridge-events".to_string())
            .spawn(move || {
                for event in rx {
                    worker.deliver(event);
                }
            })
            .map_err(|e| PlayerError::Thread(format!("failed to spawn delivery worker: {}", e)))?;

        Ok(dispatcher)
    }

    /// Entry point for the engine's threads.
    ///
    /// Returns immediately once released, and without queuing when no
    /// listener is registered for the event's category. The facade state
    /// machine still advances on prepared/completed regardless of
    /// listener registration.
    pub fn raise(&self, event: EngineEvent) {
        if self.guard.is_released() {
            return;
        }

        match &event {
            EngineEvent::Prepared => {
                self.state.set_if(PlayerState::Preparing, PlayerState::Prepared);
            }
            EngineEvent::Completed => self.state.set(PlayerState::Completed),
            _ => {}
        }

        if !self.has_listener(&event) {
            return;
        }
        let tx = self.tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event);
        }
    }

    fn has_listener(&self, event: &EngineEvent) -> bool {
        let listeners = self.listeners.lock();
        match event {
            EngineEvent::Prepared => listeners.prepared.is_some(),
            EngineEvent::Completed => listeners.completion.is_some(),
            EngineEvent::BufferingUpdate { .. } => listeners.buffering.is_some(),
            EngineEvent::VideoSizeChanged { .. } => listeners.video_size.is_some(),
            EngineEvent::Error { .. } => listeners.error.is_some(),
        }
    }

    /// Runs on the delivery worker only. The listener slot is read once,
    /// outside the lock, so a replacement racing an in-flight delivery can
    /// never deadlock or tear.
    fn deliver(&self, event: EngineEvent) {
        if self.guard.is_released() {
            return;
        }

        match event {
            EngineEvent::Prepared => {
                let listener = self.listeners.lock().prepared.clone();
                if let Some(listener) = listener {
                    listener();
                }
            }
            EngineEvent::Completed => {
                let listener = self.listeners.lock().completion.clone();
                if let Some(listener) = listener {
                    listener();
                }
            }
            EngineEvent::BufferingUpdate { percent } => {
                let listener = self.listeners.lock().buffering.clone();
                if let Some(listener) = listener {
                    listener(percent);
                }
            }
            EngineEvent::VideoSizeChanged {
                width,
                height,
                sar_num,
                sar_den,
            } => {
                let listener = self.listeners.lock().video_size.clone();
                if let Some(listener) = listener {
                    listener(width, height, sar_num, sar_den);
                }
            }
            EngineEvent::Error {
                code,
                extra,
                message,
            } => {
                let listener = self.listeners.lock().error.clone();
                if let Some(listener) = listener {
                    if !listener(code, extra, &message) {
                        log::warn!(
                            "engine error {} (extra {}) left unhandled: {}",
                            code,
                            extra,
                            message
                        );
                    }
                }
            }
        }
    }

    pub fn set_on_prepared(&self, listener: Option<PreparedListener>) {
        self.listeners.lock().prepared = listener;
    }

    pub fn set_on_completion(&self, listener: Option<CompletionListener>) {
        self.listeners.lock().completion = listener;
    }

    pub fn set_on_buffering_update(&self, listener: Option<BufferingListener>) {
        self.listeners.lock().buffering = listener;
    }

    pub fn set_on_video_size_changed(&self, listener: Option<VideoSizeListener>) {
        self.listeners.lock().video_size = listener;
    }

    pub fn set_on_error(&self, listener: Option<ErrorListener>) {
        self.listeners.lock().error = listener;
    }

    /// Stops accepting events and lets the worker drain out and exit.
    /// Listener slots are cleared so caller closures are dropped promptly.
    pub fn shutdown(&self) {
        self.tx.lock().take();
        *self.listeners.lock() = Listeners::default();
    }
}

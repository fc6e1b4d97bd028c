// Public player contract and the facade that implements it

use std::collections::HashMap;
use std::sync::Arc;

use crate::callback::{
    BufferingListener, CallbackDispatcher, CompletionListener, ErrorListener, PreparedListener,
    VideoSizeListener,
};
use crate::engine::{EngineBackend, EngineHandle};
use crate::error::Result;
use crate::guard::ReleaseGuard;
use crate::registry::{self, EventToken};
use crate::state::{PlayerState, PlayerStateCell};
use crate::surface::{SurfaceBinding, SurfaceProvider};

/// Player contract exposed to callers.
///
/// Mutating calls are fire-and-forget: they return immediately and report
/// failures only through the error listener. Simple state reads may block
/// briefly on the engine's internal synchronization. Every method is a
/// silent no-op after `release()`.
pub trait Player: Send + Sync {
    /// Selects a local file source.
    fn set_data_source(&self, path: &str);
    /// Selects a source by locator with optional request headers.
    fn set_data_source_with_headers(&self, locator: &str, headers: Option<&HashMap<String, String>>);
    /// Asynchronous; readiness arrives as the prepared event.
    fn prepare(&self);
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, position_ms: i64);
    /// Forwarded as-is; the engine's own contract governs the valid range.
    fn set_speed(&self, factor: f32);
    fn set_volume(&self, left: f32, right: f32);
    /// Binds the rendering target to `provider`'s surface lifecycle, or
    /// detaches it with `None`.
    fn set_display(&self, provider: Option<&Arc<dyn SurfaceProvider>>);

    fn is_playing(&self) -> bool;
    fn position_ms(&self) -> i64;
    fn duration_ms(&self) -> i64;
    fn video_width(&self) -> i32;
    fn video_height(&self) -> i32;
    fn video_sar_num(&self) -> i32;
    fn video_sar_den(&self) -> i32;
    fn audio_session_id(&self) -> i32;
    fn state(&self) -> PlayerState;

    fn set_on_prepared(&self, listener: Option<PreparedListener>);
    fn set_on_completion(&self, listener: Option<CompletionListener>);
    fn set_on_buffering_update(&self, listener: Option<BufferingListener>);
    fn set_on_video_size_changed(&self, listener: Option<VideoSizeListener>);
    fn set_on_error(&self, listener: Option<ErrorListener>);

    /// Tears everything down exactly once; safe to call from any thread
    /// any number of times.
    fn release(&self);
}

/// Facade over one native engine instance.
///
/// Owns the handle for its entire lifetime and composes the release guard,
/// the surface binding and the callback dispatcher around it. Dropping the
/// facade releases it.
pub struct MediaPlayer {
    guard: Arc<ReleaseGuard>,
    engine: Arc<EngineHandle>,
    surface: Arc<SurfaceBinding>,
    dispatcher: Arc<CallbackDispatcher>,
    state: PlayerStateCell,
    token: EventToken,
}

impl MediaPlayer {
    /// Allocates a native engine instance through `backend`.
    ///
    /// Fails with `PlayerError::EngineCreate` when the native layer cannot
    /// allocate; a failed facade never reaches a usable state.
    pub fn new(backend: Arc<dyn EngineBackend>) -> Result<Self> {
        let guard = Arc::new(ReleaseGuard::new());
        let state = PlayerStateCell::new();
        let dispatcher = CallbackDispatcher::spawn(Arc::clone(&guard), state.clone())?;
        let token = registry::register(&dispatcher);

        let engine = match EngineHandle::create(backend, token) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                registry::unregister(token);
                dispatcher.shutdown();
                return Err(e);
            }
        };
        let surface = SurfaceBinding::new(Arc::clone(&guard), Arc::clone(&engine));

        log::debug!("facade created, event token {}", token);
        Ok(Self {
            guard,
            engine,
            surface,
            dispatcher,
            state,
            token,
        })
    }

    /// Token this facade registered for event delivery. The engine raises
    /// events against it via `registry::raise`.
    pub fn event_token(&self) -> EventToken {
        self.token
    }
}

impl Player for MediaPlayer {
    fn set_data_source(&self, path: &str) {
        if self.guard.is_released() {
            return;
        }
        self.engine.set_source(path, None);
        self.state.set_if(PlayerState::Idle, PlayerState::SourceSet);
    }

    fn set_data_source_with_headers(&self, locator: &str, headers: Option<&HashMap<String, String>>) {
        if self.guard.is_released() {
            return;
        }
        self.engine.set_source(locator, headers);
        self.state.set_if(PlayerState::Idle, PlayerState::SourceSet);
    }

    fn prepare(&self) {
        if self.guard.is_released() {
            return;
        }
        self.engine.prepare_async();
        self.state.set(PlayerState::Preparing);
    }

    fn play(&self) {
        if self.guard.is_released() {
            return;
        }
        if !self.surface.render_ready() {
            // A display is bound but its target is gone; the caller
            // re-issues play once the provider recreates it.
            log::debug!("play deferred, no valid render target bound");
            return;
        }
        self.engine.start();
        // The cell tracks issued commands; a start before the engine is
        // ready is forwarded but does not count as playing.
        self.state.set_any(
            &[
                PlayerState::Prepared,
                PlayerState::Paused,
                PlayerState::Completed,
            ],
            PlayerState::Playing,
        );
    }

    fn pause(&self) {
        if self.guard.is_released() {
            return;
        }
        self.engine.pause();
        self.state.set_if(PlayerState::Playing, PlayerState::Paused);
    }

    fn seek_to(&self, position_ms: i64) {
        if self.guard.is_released() {
            return;
        }
        self.engine.seek_to(position_ms);
    }

    fn set_speed(&self, factor: f32) {
        if self.guard.is_released() {
            return;
        }
        self.engine.set_speed(factor);
    }

    fn set_volume(&self, left: f32, right: f32) {
        if self.guard.is_released() {
            return;
        }
        self.engine.set_volume(left, right);
    }

    fn set_display(&self, provider: Option<&Arc<dyn SurfaceProvider>>) {
        if self.guard.is_released() {
            return;
        }
        self.surface.bind(provider);
    }

    // State reads go through the handle, which already no-ops to defaults
    // once the raw handle is zeroed.

    fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    fn position_ms(&self) -> i64 {
        self.engine.position_ms()
    }

    fn duration_ms(&self) -> i64 {
        self.engine.duration_ms()
    }

    fn video_width(&self) -> i32 {
        self.engine.video_width()
    }

    fn video_height(&self) -> i32 {
        self.engine.video_height()
    }

    fn video_sar_num(&self) -> i32 {
        self.engine.video_sar_num()
    }

    fn video_sar_den(&self) -> i32 {
        self.engine.video_sar_den()
    }

    fn audio_session_id(&self) -> i32 {
        self.engine.audio_session_id()
    }

    fn state(&self) -> PlayerState {
        self.state.get()
    }

    fn set_on_prepared(&self, listener: Option<PreparedListener>) {
        self.dispatcher.set_on_prepared(listener);
    }

    fn set_on_completion(&self, listener: Option<CompletionListener>) {
        self.dispatcher.set_on_completion(listener);
    }

    fn set_on_buffering_update(&self, listener: Option<BufferingListener>) {
        self.dispatcher.set_on_buffering_update(listener);
    }

    fn set_on_video_size_changed(&self, listener: Option<VideoSizeListener>) {
        self.dispatcher.set_on_video_size_changed(listener);
    }

    fn set_on_error(&self, listener: Option<ErrorListener>) {
        self.dispatcher.set_on_error(listener);
    }

    fn release(&self) {
        if !self.guard.try_release() {
            return;
        }
        log::debug!("releasing facade, event token {}", self.token);
        self.state.set(PlayerState::Released);
        self.surface.teardown();
        registry::unregister(self.token);
        self.dispatcher.shutdown();
        self.engine.destroy();
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

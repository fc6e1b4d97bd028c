// Command surface of the opaque native playback engine and the handle
// that exclusively owns one instance of it

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{PlayerError, Result};
use crate::registry::EventToken;
use crate::surface::SurfaceTarget;

/// Opaque token identifying one live native engine instance.
///
/// Zero means "no engine": never created, or already destroyed. The engine's
/// behavior on a zero handle is unspecified, so a zero handle must never be
/// forwarded; [`EngineHandle`] enforces that.
pub type RawHandle = i64;

/// The native engine's command set.
///
/// Commands are one-directional: they return immediately or block briefly
/// for simple state reads. Anything asynchronous (prepare completing,
/// playback errors, size changes) comes back later as an event raised
/// against the token passed to `create`. The real boundary lives in the
/// `ffi` module; tests substitute a recording double.
pub trait EngineBackend: Send + Sync {
    /// Allocates a new engine instance. Events for this instance are raised
    /// against `token`.
    fn create(&self, token: EventToken) -> Result<RawHandle>;
    fn set_source(&self, handle: RawHandle, locator: &str, headers: Option<&HashMap<String, String>>);
    /// Asynchronous; readiness is signaled by the prepared event.
    fn prepare_async(&self, handle: RawHandle);
    fn start(&self, handle: RawHandle);
    fn pause(&self, handle: RawHandle);
    fn seek_to(&self, handle: RawHandle, position_ms: i64);
    fn set_speed(&self, handle: RawHandle, factor: f32);
    fn set_volume(&self, handle: RawHandle, left: f32, right: f32);
    fn set_surface(&self, handle: RawHandle, target: Option<&SurfaceTarget>);
    fn is_playing(&self, handle: RawHandle) -> bool;
    fn position_ms(&self, handle: RawHandle) -> i64;
    fn duration_ms(&self, handle: RawHandle) -> i64;
    fn video_width(&self, handle: RawHandle) -> i32;
    fn video_height(&self, handle: RawHandle) -> i32;
    fn video_sar_num(&self, handle: RawHandle) -> i32;
    fn video_sar_den(&self, handle: RawHandle) -> i32;
    fn audio_session_id(&self, handle: RawHandle) -> i32;
    /// Must be called at most once per handle; `EngineHandle::destroy`
    /// guarantees that.
    fn destroy(&self, handle: RawHandle);
}

/// Exclusively-owned handle onto one native engine instance.
///
/// Created once, destroyed exactly once, never recreated. Every command on
/// a destroyed handle is a silent no-op returning a default: zero for
/// dimensions, positions and the session id, false for `is_playing`, and
/// 1/1 for the sample aspect ratio.
pub struct EngineHandle {
    backend: Arc<dyn EngineBackend>,
    raw: AtomicI64,
}

impl EngineHandle {
    pub fn create(backend: Arc<dyn EngineBackend>, token: EventToken) -> Result<Self> {
        let raw = backend.create(token)?;
        if raw == 0 {
            return Err(PlayerError::EngineCreate(
                "engine returned a null handle".to_string(),
            ));
        }
        Ok(Self {
            backend,
            raw: AtomicI64::new(raw),
        })
    }

    fn raw(&self) -> Option<RawHandle> {
        match self.raw.load(Ordering::Acquire) {
            0 => None,
            handle => Some(handle),
        }
    }

    pub fn set_source(&self, locator: &str, headers: Option<&HashMap<String, String>>) {
        if let Some(handle) = self.raw() {
            self.backend.set_source(handle, locator, headers);
        }
    }

    pub fn prepare_async(&self) {
        if let Some(handle) = self.raw() {
            self.backend.prepare_async(handle);
        }
    }

    pub fn start(&self) {
        if let Some(handle) = self.raw() {
            self.backend.start(handle);
        }
    }

    pub fn pause(&self) {
        if let Some(handle) = self.raw() {
            self.backend.pause(handle);
        }
    }

    pub fn seek_to(&self, position_ms: i64) {
        if let Some(handle) = self.raw() {
            self.backend.seek_to(handle, position_ms);
        }
    }

    pub fn set_speed(&self, factor: f32) {
        if let Some(handle) = self.raw() {
            self.backend.set_speed(handle, factor);
        }
    }

    pub fn set_volume(&self, left: f32, right: f32) {
        if let Some(handle) = self.raw() {
            self.backend.set_volume(handle, left, right);
        }
    }

    pub fn set_surface(&self, target: Option<&SurfaceTarget>) {
        if let Some(handle) = self.raw() {
            self.backend.set_surface(handle, target);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.raw().map_or(false, |h| self.backend.is_playing(h))
    }

    pub fn position_ms(&self) -> i64 {
        self.raw().map_or(0, |h| self.backend.position_ms(h))
    }

    pub fn duration_ms(&self) -> i64 {
        self.raw().map_or(0, |h| self.backend.duration_ms(h))
    }

    pub fn video_width(&self) -> i32 {
        self.raw().map_or(0, |h| self.backend.video_width(h))
    }

    pub fn video_height(&self) -> i32 {
        self.raw().map_or(0, |h| self.backend.video_height(h))
    }

    pub fn video_sar_num(&self) -> i32 {
        self.raw().map_or(1, |h| self.backend.video_sar_num(h))
    }

    pub fn video_sar_den(&self) -> i32 {
        self.raw().map_or(1, |h| self.backend.video_sar_den(h))
    }

    pub fn audio_session_id(&self) -> i32 {
        self.raw().map_or(0, |h| self.backend.audio_session_id(h))
    }

    /// Releases the engine instance, forwarding at most one `destroy`.
    ///
    /// The swap makes a second call harmless, but callers still serialize
    /// through [`crate::guard::ReleaseGuard`]: destroy racing a live
    /// command on the same handle is the engine's undefined behavior, and
    /// the guard is what rules it out.
    pub fn destroy(&self) {
        let handle = self.raw.swap(0, Ordering::AcqRel);
        if handle != 0 {
            self.backend.destroy(handle);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockEngine;
    use super::*;

    #[test]
    fn test_commands_forward_on_live_handle() {
        let engine = MockEngine::new();
        let handle = EngineHandle::create(engine.clone(), 1).unwrap();
        handle.start();
        handle.pause();
        assert_eq!(engine.count("start"), 1);
        assert_eq!(engine.count("pause"), 1);
    }

    #[test]
    fn test_destroyed_handle_is_silent_and_returns_defaults() {
        let engine = MockEngine::new();
        let handle = EngineHandle::create(engine.clone(), 1).unwrap();
        handle.destroy();
        let before = engine.total_calls();

        handle.start();
        handle.seek_to(500);
        assert!(!handle.is_playing());
        assert_eq!(handle.video_width(), 0);
        assert_eq!(handle.video_sar_num(), 1);
        assert_eq!(handle.video_sar_den(), 1);
        assert_eq!(handle.duration_ms(), 0);

        assert_eq!(engine.total_calls(), before);
    }

    #[test]
    fn test_destroy_forwards_once() {
        let engine = MockEngine::new();
        let handle = EngineHandle::create(engine.clone(), 1).unwrap();
        handle.destroy();
        handle.destroy();
        assert_eq!(engine.count("destroy"), 1);
    }

    #[test]
    fn test_create_failure_propagates() {
        let engine = MockEngine::failing();
        assert!(EngineHandle::create(engine, 1).is_err());
    }
}

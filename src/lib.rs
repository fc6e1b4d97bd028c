// Managed facade over an opaque native media-playback engine
//
// Decoding and rendering live entirely inside the native engine; this crate
// owns the handle lifecycle, the one-shot release protocol, the rendering
// surface rebinding, and the marshaling of engine events onto a single
// delivery context.

pub mod callback;
pub mod engine;
pub mod error;
pub mod guard;
pub mod player;
pub mod registry;
pub mod state;
pub mod surface;

// Real C boundary; off by default so the crate builds and tests without
// the vendor engine library present.
#[cfg(feature = "native-engine")]
pub mod ffi;

// Re-exports
pub use callback::{
    BufferingListener, CallbackDispatcher, CompletionListener, EngineEvent, ErrorListener,
    PreparedListener, VideoSizeListener,
};
pub use engine::{EngineBackend, EngineHandle, RawHandle};
pub use error::{codes, PlayerError, Result};
pub use guard::ReleaseGuard;
pub use player::{MediaPlayer, Player};
pub use registry::EventToken;
pub use state::PlayerState;
pub use surface::{SurfaceBinding, SurfaceObserver, SurfaceProvider, SurfaceTarget};

#[cfg(feature = "native-engine")]
pub use ffi::NativeEngine;

/// Initialize logging based on platform
pub fn init_logging() {
    #[cfg(feature = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("MediaBridge"),
        );
    }

    #[cfg(not(feature = "android"))]
    {
        // Host builds pick their own logger; tests run fine without one.
    }
}

// C boundary to the real native engine
//
// Commands go down through `NativeEngine`; events come back up through
// `media_bridge_post_event`, which the engine calls from its own threads
// with the token it was given at create time.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_float, c_int, c_longlong};

use crate::callback::EngineEvent;
use crate::engine::{EngineBackend, RawHandle};
use crate::error::{PlayerError, Result};
use crate::registry::{self, EventToken};
use crate::surface::SurfaceTarget;

// Event categories on the wire.
const EVENT_PREPARED: c_int = 1;
const EVENT_COMPLETED: c_int = 2;
const EVENT_BUFFERING: c_int = 3;
const EVENT_VIDEO_SIZE: c_int = 4;
const EVENT_ERROR: c_int = 5;

extern "C" {
    fn engine_create(token: c_longlong) -> c_longlong;
    fn engine_set_source(handle: c_longlong, locator: *const c_char, headers: *const c_char);
    fn engine_prepare_async(handle: c_longlong);
    fn engine_start(handle: c_longlong);
    fn engine_pause(handle: c_longlong);
    fn engine_seek_to(handle: c_longlong, position_ms: c_longlong);
    fn engine_set_speed(handle: c_longlong, factor: c_float);
    fn engine_set_volume(handle: c_longlong, left: c_float, right: c_float);
    fn engine_set_surface(handle: c_longlong, window: c_longlong);
    fn engine_is_playing(handle: c_longlong) -> c_int;
    fn engine_get_position(handle: c_longlong) -> c_longlong;
    fn engine_get_duration(handle: c_longlong) -> c_longlong;
    fn engine_get_video_width(handle: c_longlong) -> c_int;
    fn engine_get_video_height(handle: c_longlong) -> c_int;
    fn engine_get_video_sar_num(handle: c_longlong) -> c_int;
    fn engine_get_video_sar_den(handle: c_longlong) -> c_int;
    fn engine_get_audio_session_id(handle: c_longlong) -> c_int;
    fn engine_release(handle: c_longlong);
}

/// Flattens a header map to `key: value` CRLF lines for the C surface.
fn flatten_headers(headers: &HashMap<String, String>) -> String {
    let mut flat = String::new();
    for (key, value) in headers {
        flat.push_str(key);
        flat.push_str(": ");
        flat.push_str(value);
        flat.push_str("\r\n");
    }
    flat
}

/// Backend forwarding every command to the linked engine library.
pub struct NativeEngine;

impl EngineBackend for NativeEngine {
    fn create(&self, token: EventToken) -> Result<RawHandle> {
        let handle = unsafe { engine_create(token) };
        if handle == 0 {
            return Err(PlayerError::EngineCreate(
                "native engine allocation failed".to_string(),
            ));
        }
        Ok(handle)
    }

    fn set_source(&self, handle: RawHandle, locator: &str, headers: Option<&HashMap<String, String>>) {
        let locator = match CString::new(locator) {
            Ok(locator) => locator,
            Err(e) => {
                log::error!("locator not representable across FFI: {}", e);
                return;
            }
        };
        let headers = headers.map(flatten_headers).and_then(|flat| {
            CString::new(flat)
                .map_err(|e| log::error!("headers not representable across FFI: {}", e))
                .ok()
        });
        let headers_ptr = headers
            .as_ref()
            .map_or(std::ptr::null(), |h| h.as_ptr());
        unsafe { engine_set_source(handle, locator.as_ptr(), headers_ptr) };
    }

    fn prepare_async(&self, handle: RawHandle) {
        unsafe { engine_prepare_async(handle) };
    }

    fn start(&self, handle: RawHandle) {
        unsafe { engine_start(handle) };
    }

    fn pause(&self, handle: RawHandle) {
        unsafe { engine_pause(handle) };
    }

    fn seek_to(&self, handle: RawHandle, position_ms: i64) {
        unsafe { engine_seek_to(handle, position_ms) };
    }

    fn set_speed(&self, handle: RawHandle, factor: f32) {
        unsafe { engine_set_speed(handle, factor) };
    }

    fn set_volume(&self, handle: RawHandle, left: f32, right: f32) {
        unsafe { engine_set_volume(handle, left, right) };
    }

    fn set_surface(&self, handle: RawHandle, target: Option<&SurfaceTarget>) {
        let window = target.map_or(0, SurfaceTarget::raw);
        unsafe { engine_set_surface(handle, window) };
    }

    fn is_playing(&self, handle: RawHandle) -> bool {
        unsafe { engine_is_playing(handle) != 0 }
    }

    fn position_ms(&self, handle: RawHandle) -> i64 {
        unsafe { engine_get_position(handle) }
    }

    fn duration_ms(&self, handle: RawHandle) -> i64 {
        unsafe { engine_get_duration(handle) }
    }

    fn video_width(&self, handle: RawHandle) -> i32 {
        unsafe { engine_get_video_width(handle) }
    }

    fn video_height(&self, handle: RawHandle) -> i32 {
        unsafe { engine_get_video_height(handle) }
    }

    fn video_sar_num(&self, handle: RawHandle) -> i32 {
        unsafe { engine_get_video_sar_num(handle) }
    }

    fn video_sar_den(&self, handle: RawHandle) -> i32 {
        unsafe { engine_get_video_sar_den(handle) }
    }

    fn audio_session_id(&self, handle: RawHandle) -> i32 {
        unsafe { engine_get_audio_session_id(handle) }
    }

    fn destroy(&self, handle: RawHandle) {
        unsafe { engine_release(handle) };
    }
}

/// Event entry point the native engine calls from its own threads.
///
/// `what` selects the category; `arg1..arg4` carry the category's payload
/// (buffering percent; width/height/sar pair; error code and extra).
/// A token that no longer maps to a live facade is a safe no-op.
///
/// # Safety
///
/// `message` must be null or a valid NUL-terminated string that outlives
/// the call.
#[no_mangle]
pub unsafe extern "C" fn media_bridge_post_event(
    token: c_longlong,
    what: c_int,
    arg1: c_int,
    arg2: c_int,
    arg3: c_int,
    arg4: c_int,
    message: *const c_char,
) {
    let event = match what {
        EVENT_PREPARED => EngineEvent::Prepared,
        EVENT_COMPLETED => EngineEvent::Completed,
        EVENT_BUFFERING => EngineEvent::BufferingUpdate { percent: arg1 },
        EVENT_VIDEO_SIZE => EngineEvent::VideoSizeChanged {
            width: arg1,
            height: arg2,
            sar_num: arg3,
            sar_den: arg4,
        },
        EVENT_ERROR => {
            let message = if message.is_null() {
                String::new()
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            };
            EngineEvent::Error {
                code: arg1,
                extra: arg2,
                message,
            }
        }
        other => {
            log::warn!("unknown engine event category {}", other);
            return;
        }
    };
    registry::raise(token, event);
}

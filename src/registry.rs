// Process-wide token table routing engine events to live facades
//
// The native side never holds a pointer into the facade; it holds a token.
// Raising against a token that no longer maps to a live dispatcher is a
// safe no-op instead of a dangling dereference.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::callback::{CallbackDispatcher, EngineEvent};

/// Token a facade hands to the native engine at create time; the engine
/// raises every event for that instance against it.
pub type EventToken = i64;

static DISPATCHERS: Lazy<Mutex<HashMap<EventToken, Weak<CallbackDispatcher>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static NEXT_TOKEN: Lazy<Mutex<EventToken>> = Lazy::new(|| Mutex::new(1));

/// Registers a dispatcher and returns its token. The table keeps only a
/// weak reference; a dropped facade goes dead in the table automatically.
pub fn register(dispatcher: &Arc<CallbackDispatcher>) -> EventToken {
    let mut next = NEXT_TOKEN.lock();
    let token = *next;
    *next += 1;
    drop(next);

    DISPATCHERS.lock().insert(token, Arc::downgrade(dispatcher));
    token
}

pub fn unregister(token: EventToken) {
    DISPATCHERS.lock().remove(&token);
}

/// Raises an engine event against a token. Unknown and dead tokens are
/// silently dropped.
pub fn raise(token: EventToken, event: EngineEvent) {
    let dispatcher = DISPATCHERS
        .lock()
        .get(&token)
        .and_then(Weak::upgrade);
    if let Some(dispatcher) = dispatcher {
        dispatcher.raise(event);
    }
}

// Rendering-target binding against the windowing system's surface lifecycle

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::engine::EngineHandle;
use crate::guard::ReleaseGuard;

/// Strong reference to the renderable surface a provider currently offers.
///
/// Clones refer to the same underlying target; identity is reference
/// identity, not the raw value. The provider owns the target; the binding
/// holds at most one strong reference at a time and drops it on rebind.
#[derive(Clone)]
pub struct SurfaceTarget {
    pub(crate) raw: Arc<i64>,
}

impl SurfaceTarget {
    pub fn new(raw: i64) -> Self {
        Self { raw: Arc::new(raw) }
    }

    /// Native window value pushed down to the engine.
    pub fn raw(&self) -> i64 {
        *self.raw
    }

    pub fn same_target(&self, other: &SurfaceTarget) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }
}

/// Windowing-system object that owns a renderable target and raises its
/// lifecycle events on its own schedule, independent of playback.
pub trait SurfaceProvider: Send + Sync {
    /// The target currently offered, or none before creation / after
    /// destruction.
    fn current_target(&self) -> Option<SurfaceTarget>;
    fn add_observer(&self, observer: Arc<dyn SurfaceObserver>);
    fn remove_observer(&self, observer: &Arc<dyn SurfaceObserver>);
}

/// Receiver for a provider's target lifecycle notifications.
pub trait SurfaceObserver: Send + Sync {
    fn target_created(&self);
    /// Format or size changes are not forwarded to the engine; override
    /// if a consumer wants them.
    fn target_changed(&self, _format: i32, _width: i32, _height: i32) {}
    fn target_destroyed(&self);
}

struct BindingState {
    provider: Option<Weak<dyn SurfaceProvider>>,
    target: Option<SurfaceTarget>,
}

/// Keeps the engine's rendering target consistent with the provider's
/// lifecycle.
///
/// The binding weakly references the provider (it observes the windowing
/// object, it does not own it) and registers itself for lifecycle events.
/// Every accepted rebind ends with exactly one `set-surface` push; binding
/// the already-bound provider again is a no-op.
pub struct SurfaceBinding {
    guard: Arc<ReleaseGuard>,
    engine: Arc<EngineHandle>,
    weak_self: Weak<SurfaceBinding>,
    inner: Mutex<BindingState>,
}

impl SurfaceBinding {
    pub fn new(guard: Arc<ReleaseGuard>, engine: Arc<EngineHandle>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            guard,
            engine,
            weak_self: weak_self.clone(),
            inner: Mutex::new(BindingState {
                provider: None,
                target: None,
            }),
        })
    }

    fn as_observer(&self) -> Option<Arc<dyn SurfaceObserver>> {
        self.weak_self
            .upgrade()
            .map(|binding| binding as Arc<dyn SurfaceObserver>)
    }

    /// Rebinds the display to `provider`, or detaches it when `None`.
    ///
    /// Rebinding away from a provider drops the held target before the new
    /// one is acquired, so at most one target is strongly held outside the
    /// rebinding transaction. No-op after release.
    pub fn bind(&self, provider: Option<&Arc<dyn SurfaceProvider>>) {
        if self.guard.is_released() {
            return;
        }

        let old_provider = {
            let mut inner = self.inner.lock();
            let current = inner.provider.as_ref().and_then(Weak::upgrade);
            match (provider, &current) {
                // Same provider already bound: exactly one set-surface total.
                (Some(new), Some(cur)) if Arc::ptr_eq(new, cur) => return,
                // Nothing bound and nothing requested.
                (None, None) => return,
                _ => {}
            }

            // Release the previously held target before acquiring the new one.
            inner.target = None;
            inner.provider = provider.map(Arc::downgrade);
            current
        };

        if let Some(observer) = self.as_observer() {
            if let Some(old) = old_provider {
                old.remove_observer(&observer);
            }
            if let Some(new) = provider {
                new.add_observer(observer);
            }
        }

        // Registered before the read so a target created mid-bind still
        // reaches us as a lifecycle event instead of being missed.
        let new_target = provider.and_then(|p| p.current_target());
        {
            let mut inner = self.inner.lock();
            inner.target = new_target.clone();
        }
        self.engine.set_surface(new_target.as_ref());
    }

    /// Re-acquires the bound provider's current target and pushes it if it
    /// actually changed. Driven by the provider's created event.
    fn refresh_target(&self) {
        if self.guard.is_released() {
            return;
        }

        let push = {
            let mut inner = self.inner.lock();
            let provider = match inner.provider.as_ref().and_then(Weak::upgrade) {
                Some(provider) => provider,
                None => return,
            };
            let fresh = provider.current_target();
            let unchanged = match (&inner.target, &fresh) {
                (None, None) => true,
                (Some(held), Some(new)) => held.same_target(new),
                _ => false,
            };
            if unchanged {
                return;
            }
            inner.target = fresh.clone();
            fresh
        };

        self.engine.set_surface(push.as_ref());
    }

    /// True when a play command may be forwarded: either no display was
    /// requested at all, or the bound provider currently offers a target.
    pub fn render_ready(&self) -> bool {
        let inner = self.inner.lock();
        inner.provider.is_none() || inner.target.is_some()
    }

    /// Release-path detach: unregister from the provider and drop the held
    /// target without pushing anything to the engine, which is about to be
    /// destroyed. Runs after the guard has already flipped.
    pub(crate) fn teardown(&self) {
        let old_provider = {
            let mut inner = self.inner.lock();
            inner.target = None;
            inner.provider.take().and_then(|weak| weak.upgrade())
        };
        if let (Some(provider), Some(observer)) = (old_provider, self.as_observer()) {
            provider.remove_observer(&observer);
        }
    }
}

impl SurfaceObserver for SurfaceBinding {
    fn target_created(&self) {
        self.refresh_target();
    }

    fn target_destroyed(&self) {
        self.bind(None);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Provider double that lets tests drive the target lifecycle by hand.
    pub struct TestProvider {
        target: Mutex<Option<SurfaceTarget>>,
        observers: Mutex<Vec<Arc<dyn SurfaceObserver>>>,
    }

    impl TestProvider {
        pub fn new(raw: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                target: Mutex::new(raw.map(SurfaceTarget::new)),
                observers: Mutex::new(Vec::new()),
            })
        }

        pub fn as_provider(self: &Arc<Self>) -> Arc<dyn SurfaceProvider> {
            Arc::clone(self) as Arc<dyn SurfaceProvider>
        }

        fn snapshot(&self) -> Vec<Arc<dyn SurfaceObserver>> {
            self.observers.lock().clone()
        }

        pub fn create_target(&self, raw: i64) {
            *self.target.lock() = Some(SurfaceTarget::new(raw));
            for observer in self.snapshot() {
                observer.target_created();
            }
        }

        pub fn destroy_target(&self) {
            *self.target.lock() = None;
            for observer in self.snapshot() {
                observer.target_destroyed();
            }
        }

        pub fn observer_count(&self) -> usize {
            self.observers.lock().len()
        }

        pub fn held_target(&self) -> Option<SurfaceTarget> {
            self.target.lock().clone()
        }
    }

    impl SurfaceProvider for TestProvider {
        fn current_target(&self) -> Option<SurfaceTarget> {
            self.target.lock().clone()
        }

        fn add_observer(&self, observer: Arc<dyn SurfaceObserver>) {
            self.observers.lock().push(observer);
        }

        fn remove_observer(&self, observer: &Arc<dyn SurfaceObserver>) {
            self.observers
                .lock()
                .retain(|candidate| !Arc::ptr_eq(candidate, observer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestProvider;
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::engine::EngineHandle;

    fn binding_with_mock() -> (Arc<MockEngine>, Arc<SurfaceBinding>) {
        let mock = MockEngine::new();
        let engine = Arc::new(EngineHandle::create(mock.clone(), 1).unwrap());
        let guard = Arc::new(ReleaseGuard::new());
        (mock, SurfaceBinding::new(guard, engine))
    }

    #[test]
    fn test_bind_same_provider_is_idempotent() {
        let (mock, binding) = binding_with_mock();
        let provider = TestProvider::new(Some(0x1000));
        let dyn_provider = provider.as_provider();

        binding.bind(Some(&dyn_provider));
        binding.bind(Some(&dyn_provider));
        assert_eq!(mock.count("set_surface"), 1);
        assert_eq!(provider.observer_count(), 1);
    }

    #[test]
    fn test_rebinding_switches_provider_and_target() {
        let (mock, binding) = binding_with_mock();
        let a = TestProvider::new(Some(0xa));
        let b = TestProvider::new(Some(0xb));
        let dyn_a = a.as_provider();
        let dyn_b = b.as_provider();

        binding.bind(Some(&dyn_a));
        binding.bind(Some(&dyn_b));

        assert_eq!(mock.count("set_surface"), 2);
        assert_eq!(a.observer_count(), 0);
        assert_eq!(b.observer_count(), 1);
        let pushed = mock.last_surface.lock().clone().unwrap();
        assert_eq!(pushed.raw(), 0xb);
    }

    #[test]
    fn test_bind_none_detaches_and_pushes_no_surface() {
        let (mock, binding) = binding_with_mock();
        let provider = TestProvider::new(Some(0x1000));
        let dyn_provider = provider.as_provider();

        binding.bind(Some(&dyn_provider));
        binding.bind(None);

        assert_eq!(mock.count("set_surface"), 2);
        assert_eq!(provider.observer_count(), 0);
        assert!(mock.last_surface.lock().is_none());
        // bind(None) with nothing bound stays silent
        binding.bind(None);
        assert_eq!(mock.count("set_surface"), 2);
    }

    #[test]
    fn test_no_two_targets_held_across_rebind() {
        let (_mock, binding) = binding_with_mock();
        let a = TestProvider::new(Some(0xa));
        let b = TestProvider::new(Some(0xb));
        let dyn_a = a.as_provider();
        let dyn_b = b.as_provider();
        let target_a = a.held_target().unwrap();

        binding.bind(Some(&dyn_a));
        // provider + test + binding + the mock's retained set_surface copy
        assert_eq!(Arc::strong_count(&target_a.raw), 4);

        binding.bind(None);
        binding.bind(Some(&dyn_b));
        // binding dropped its copy and the mock now retains b's target,
        // leaving only the provider's and the test's references to a
        assert_eq!(Arc::strong_count(&target_a.raw), 2);
    }

    #[test]
    fn test_created_event_captures_fresh_target() {
        let (mock, binding) = binding_with_mock();
        let provider = TestProvider::new(None);
        let dyn_provider = provider.as_provider();

        binding.bind(Some(&dyn_provider));
        assert!(mock.last_surface.lock().is_none());
        assert!(!binding.render_ready());

        provider.create_target(0x2000);
        assert_eq!(mock.count("set_surface"), 2);
        assert_eq!(mock.last_surface.lock().clone().unwrap().raw(), 0x2000);
        assert!(binding.render_ready());
    }

    #[test]
    fn test_destroyed_event_detaches() {
        let (mock, binding) = binding_with_mock();
        let provider = TestProvider::new(Some(0x1000));
        let dyn_provider = provider.as_provider();

        binding.bind(Some(&dyn_provider));
        provider.destroy_target();

        assert_eq!(provider.observer_count(), 0);
        assert!(mock.last_surface.lock().is_none());
        assert!(binding.render_ready()); // no display requested anymore
    }

    #[test]
    fn test_bind_after_release_is_noop() {
        let mock = MockEngine::new();
        let engine = Arc::new(EngineHandle::create(mock.clone(), 1).unwrap());
        let guard = Arc::new(ReleaseGuard::new());
        let binding = SurfaceBinding::new(Arc::clone(&guard), engine);
        let provider = TestProvider::new(Some(0x1000));
        let dyn_provider = provider.as_provider();

        guard.try_release();
        binding.bind(Some(&dyn_provider));
        assert_eq!(mock.count("set_surface"), 0);
        assert_eq!(provider.observer_count(), 0);
    }
}

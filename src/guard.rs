// One-shot release gate shared by every component of the facade

use std::sync::atomic::{AtomicBool, Ordering};

/// Atomic Live -> Released flag, the only synchronization primitive the
/// facade core requires.
///
/// A command either observes Live and proceeds or observes Released and
/// no-ops; there is no intermediate state. The transition itself happens on
/// exactly one calling thread no matter how many race for it, which is what
/// makes engine teardown run exactly once.
pub struct ReleaseGuard {
    released: AtomicBool,
}

impl ReleaseGuard {
    pub fn new() -> Self {
        Self {
            released: AtomicBool::new(false),
        }
    }

    /// Performs the Live -> Released transition.
    ///
    /// Returns true only for the caller that actually flipped the flag;
    /// every concurrent or repeated caller gets false.
    pub fn try_release(&self) -> bool {
        self.released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Lock-free fast-path check, consulted before forwarding any command
    /// and again at event delivery time.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Default for ReleaseGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_release_transitions_once() {
        let guard = ReleaseGuard::new();
        assert!(!guard.is_released());
        assert!(guard.try_release());
        assert!(guard.is_released());
        assert!(!guard.try_release());
        assert!(guard.is_released());
    }

    #[test]
    fn test_concurrent_release_single_winner() {
        let guard = Arc::new(ReleaseGuard::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = Arc::clone(&guard);
            handles.push(thread::spawn(move || guard.try_release()));
        }
        let winners: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
        assert!(guard.is_released());
    }
}

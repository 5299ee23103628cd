use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use crate::cache_manager::GeocodeCache;

// Process-wide state shared by every exported function
pub struct ModuleState {
    // Geocoding results keyed by normalized address
    pub geocode_cache: GeocodeCache,
    pub initialized: bool,
}

lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            geocode_cache: GeocodeCache::new(),
            initialized: false,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::new()
    }
}

/// Force creation of the global state (and its empty geocode cache).
/// Returns true on the first call only.
pub fn init() -> bool {
    ModuleState::with_mut(|state| {
        if state.initialized {
            return false;
        }
        state.initialized = true;
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        // Another test may have initialized already; the second call must be a no-op either way
        init();
        assert!(!init());
        assert!(ModuleState::with(|state| state.initialized));
    }
}

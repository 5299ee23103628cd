use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use wasm_bindgen::prelude::*;

use crate::error::GeoError;

#[derive(Clone, Debug)]
pub struct CancellationToken {
    pub id: String,
    is_cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new(id: String) -> Self {
        Self {
            id,
            is_cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    pub fn throw_if_cancelled(&self) -> Result<(), GeoError> {
        if self.is_cancelled() {
            Err(GeoError::Cancelled(self.id.clone()))
        } else {
            Ok(())
        }
    }
}

/// Tracks the live token per operation id. Starting an operation again cancels
/// the previous run (cancel-and-restart) instead of queueing behind it.
#[derive(Default)]
pub struct CancellationManager {
    tokens: HashMap<String, CancellationToken>,
}

impl CancellationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_token(&mut self, id: &str) -> CancellationToken {
        let token = CancellationToken::new(id.to_string());
        if let Some(previous) = self.tokens.insert(id.to_string(), token.clone()) {
            previous.cancel();
        }
        token
    }

    pub fn cancel_token(&mut self, id: &str) -> bool {
        match self.tokens.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn get_token(&self, id: &str) -> Option<&CancellationToken> {
        self.tokens.get(id)
    }

    /// Forget a finished operation. Only removes the entry if it is still `token`,
    /// so a run that was superseded cannot drop its successor's token.
    pub fn release(&mut self, token: &CancellationToken) {
        let is_current = self
            .tokens
            .get(&token.id)
            .map(|current| Arc::ptr_eq(&current.is_cancelled, &token.is_cancelled))
            .unwrap_or(false);
        if is_current {
            self.tokens.remove(&token.id);
        }
    }

    pub fn cleanup_token(&mut self, id: &str) {
        self.tokens.remove(id);
    }
}

lazy_static! {
    static ref GLOBAL_CANCELLATION_MANAGER: Mutex<CancellationManager> =
        Mutex::new(CancellationManager::new());
}

pub fn with_manager<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut CancellationManager) -> R,
{
    GLOBAL_CANCELLATION_MANAGER
        .lock()
        .ok()
        .map(|mut manager| f(&mut manager))
}

/// Start (or restart) an operation and hand back its token.
pub fn begin_operation(id: &str) -> CancellationToken {
    with_manager(|manager| manager.create_token(id))
        .unwrap_or_else(|| CancellationToken::new(id.to_string()))
}

pub fn finish_operation(token: &CancellationToken) {
    with_manager(|manager| manager.release(token));
}

#[wasm_bindgen]
pub fn create_cancellation_token(id: &str) -> String {
    begin_operation(id).id
}

#[wasm_bindgen]
pub fn cancel_operation(id: &str) -> bool {
    with_manager(|manager| manager.cancel_token(id)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn cleanup_cancellation_token(id: &str) -> bool {
    with_manager(|manager| manager.cleanup_token(id)).is_some()
}

pub fn get_cancellation_token(id: &str) -> Option<CancellationToken> {
    with_manager(|manager| manager.get_token(id).cloned()).flatten()
}

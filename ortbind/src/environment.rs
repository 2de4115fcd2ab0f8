//! The process-wide ONNX Runtime environment.
//!
//! ONNX Runtime only allows one Env per process. It is created lazily by
//! the first session, shared by every session after that, and released at
//! process exit.

use std::sync::{Arc, PoisonError};

use tracing::debug;

use crate::api::{Api, ortsys};
use crate::error::{OrtError, Result};
use crate::ffi::{self, OrtApi, OrtEnv};
use crate::handle::Handle;

/// ONNX Runtime environment.
pub struct Environment {
    handle: Handle<OrtEnv>,
}

// OrtEnv is documented as safe to share between threads.
unsafe impl Send for Environment {}
unsafe impl Sync for Environment {}

impl Environment {
    fn create(api: &OrtApi) -> Result<Self> {
        let mut ptr = std::ptr::null_mut();
        ortsys!(api, CreateEnv(ffi::ORT_LOGGING_LEVEL_ERROR, c"Default".as_ptr(), &mut ptr))?;
        let handle = Handle::new(api, ptr);
        ortsys!(api, DisableTelemetryEvents(handle.as_ptr()))?;
        debug!("ort: environment created");
        Ok(Self { handle })
    }

    pub(crate) fn as_ptr(&self) -> *const OrtEnv {
        self.handle.as_ptr()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            self.handle.release();
            debug!("ort: environment released");
        }
    }
}

pub(crate) enum EnvSlot {
    Uninit,
    Ready(Arc<Environment>),
    TornDown,
}

impl Api {
    /// Returns the environment, creating it on first use.
    ///
    /// Concurrent callers block on the slot, so exactly one environment is
    /// ever created per table.
    pub fn environment(&self) -> Result<Arc<Environment>> {
        let mut slot = self.env.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            EnvSlot::Ready(env) => Ok(Arc::clone(env)),
            EnvSlot::TornDown => Err(OrtError::Binding(
                "environment already shut down".to_string(),
            )),
            EnvSlot::Uninit => {
                let env = Arc::new(Environment::create(self)?);
                *slot = EnvSlot::Ready(Arc::clone(&env));
                Ok(env)
            }
        }
    }

    /// Drops the singleton. The native environment is released once the
    /// last session holding it is gone. Registered with `atexit` for the
    /// global table.
    pub fn shutdown_environment(&self) {
        let mut slot = self.env.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, EnvSlot::TornDown);
        drop(slot);
        if let EnvSlot::Ready(env) = previous {
            debug!(sessions = Arc::strong_count(&env) - 1, "ort: environment shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::OrtError;
    use crate::mock;
    use std::sync::Arc;

    #[test]
    fn created_once_and_shared() {
        let engine = mock::lock();
        let a = engine.api().environment().unwrap();
        let b = engine.api().environment().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let stats = engine.stats();
        assert_eq!(stats.env_created, 1);
        assert_eq!(stats.telemetry_disabled, 1);
    }

    #[test]
    fn concurrent_first_use_creates_one() {
        let engine = mock::lock();
        let api = engine.api();
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(move || api.environment().map(|_| ())))
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(engine.stats().env_created, 1);
    }

    #[test]
    fn shutdown_releases_and_refuses_recreate() {
        let engine = mock::lock();
        let api = engine.api();
        let env = api.environment().unwrap();
        api.shutdown_environment();
        assert_eq!(engine.stats().env_released, 0);
        drop(env);
        assert_eq!(engine.stats().env_released, 1);

        let err = api.environment().err().unwrap();
        assert!(matches!(err, OrtError::Binding(_)));
        assert_eq!(engine.stats().env_created, 1);
    }
}

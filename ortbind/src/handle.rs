//! Owning wrapper for native handles.
//!
//! Every handle kind has its own `Release*` entry in the function table.
//! [`Release`] maps a kind to that entry so a [`Handle`] always calls the
//! right one, exactly once.

use std::fmt;
use std::mem;
use std::ptr;

use crate::ffi::{self, OrtApi};

/// A native handle kind with a matching release entry.
pub trait Release {
    fn release_fn(api: &OrtApi) -> Option<unsafe extern "C" fn(*mut Self)>;
}

macro_rules! release {
    ($($kind:ident => $entry:ident,)*) => {
        $(
            impl Release for ffi::$kind {
                fn release_fn(api: &OrtApi) -> Option<unsafe extern "C" fn(*mut Self)> {
                    api.$entry
                }
            }
        )*
    };
}

release! {
    OrtEnv => ReleaseEnv,
    OrtStatus => ReleaseStatus,
    OrtMemoryInfo => ReleaseMemoryInfo,
    OrtSession => ReleaseSession,
    OrtValue => ReleaseValue,
    OrtRunOptions => ReleaseRunOptions,
    OrtTypeInfo => ReleaseTypeInfo,
    OrtTensorTypeAndShapeInfo => ReleaseTensorTypeAndShapeInfo,
    OrtSessionOptions => ReleaseSessionOptions,
    OrtModelMetadata => ReleaseModelMetadata,
    OrtCUDAProviderOptionsV2 => ReleaseCUDAProviderOptions,
}

/// Owns one native object and releases it when dropped.
///
/// A null handle is valid and releasing it does nothing. The raw pointer is
/// not `Send`, so neither is the handle; wrappers that know their kind is
/// thread-safe opt in themselves.
pub struct Handle<T: Release> {
    ptr: *mut T,
    release: Option<unsafe extern "C" fn(*mut T)>,
}

impl<T: Release> Handle<T> {
    /// Takes ownership of `ptr`, released through the table entry for `T`.
    pub fn new(api: &OrtApi, ptr: *mut T) -> Self {
        Self {
            ptr,
            release: T::release_fn(api),
        }
    }

    /// Takes ownership of `ptr` with an explicit release function.
    pub fn with_release(ptr: *mut T, release: unsafe extern "C" fn(*mut T)) -> Self {
        Self {
            ptr,
            release: Some(release),
        }
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Releases the native object now. Later calls, and the eventual drop,
    /// do nothing.
    pub fn release(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let ptr = mem::replace(&mut self.ptr, ptr::null_mut());
        if let Some(release) = self.release {
            unsafe { release(ptr) };
        }
    }

    /// Gives up ownership without releasing.
    pub fn into_raw(mut self) -> *mut T {
        mem::replace(&mut self.ptr, ptr::null_mut())
    }
}

impl<T: Release> Drop for Handle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Release> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.ptr).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::OrtValue;
    use std::cell::Cell;
    use std::ptr::NonNull;

    thread_local! {
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn count_release(_value: *mut OrtValue) {
        RELEASED.with(|n| n.set(n.get() + 1));
    }

    // Each test runs on its own thread, so the counter is per test.
    fn released() -> usize {
        RELEASED.with(Cell::get)
    }

    #[test]
    fn release_twice_is_noop() {
        let before = released();
        let mut handle = Handle::with_release(NonNull::<OrtValue>::dangling().as_ptr(), count_release);
        handle.release();
        handle.release();
        drop(handle);
        assert_eq!(released() - before, 1);
    }

    #[test]
    fn null_is_never_released() {
        let before = released();
        let mut handle = Handle::with_release(ptr::null_mut::<OrtValue>(), count_release);
        assert!(handle.is_null());
        handle.release();
        drop(handle);
        assert_eq!(released(), before);
    }

    #[test]
    fn move_releases_once() {
        let before = released();
        let handle = Handle::with_release(NonNull::<OrtValue>::dangling().as_ptr(), count_release);
        let moved = vec![handle];
        drop(moved);
        assert_eq!(released() - before, 1);
    }

    #[test]
    fn into_raw_skips_release() {
        let before = released();
        let handle = Handle::with_release(NonNull::<OrtValue>::dangling().as_ptr(), count_release);
        let raw = handle.into_raw();
        assert!(!raw.is_null());
        assert_eq!(released(), before);
    }

    #[test]
    fn missing_entry_leaks_instead_of_crashing() {
        let api = OrtApi::empty();
        let mut handle = Handle::new(&api, NonNull::<OrtValue>::dangling().as_ptr());
        handle.release();
        assert!(handle.is_null());
    }
}

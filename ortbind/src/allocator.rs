//! Process-default allocator and CPU memory descriptor.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;

use crate::api::{Api, ortsys};
use crate::error::Result;
use crate::ffi::{self, OrtAllocator, OrtApi, OrtMemoryInfo};
use crate::handle::Handle;
use crate::status;

/// The engine's default allocator. Owned by the engine and never freed.
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    ptr: *mut OrtAllocator,
}

// The default allocator is a process-wide, thread-safe singleton.
unsafe impl Send for Allocator {}
unsafe impl Sync for Allocator {}

impl Allocator {
    pub fn as_ptr(&self) -> *mut OrtAllocator {
        self.ptr
    }
}

/// Describes ordinary CPU memory for tensors over caller-owned buffers.
#[derive(Debug)]
pub struct MemoryInfo(Handle<OrtMemoryInfo>);

// Immutable after creation.
unsafe impl Send for MemoryInfo {}
unsafe impl Sync for MemoryInfo {}

impl MemoryInfo {
    pub fn as_ptr(&self) -> *const OrtMemoryInfo {
        self.0.as_ptr()
    }
}

impl Api {
    pub(crate) fn allocator(&self) -> Result<Allocator> {
        self.allocator
            .get_or_try_init(|| {
                let mut ptr = ptr::null_mut();
                ortsys!(self, GetAllocatorWithDefaultOptions(&mut ptr))?;
                Ok(Allocator { ptr })
            })
            .copied()
    }

    pub(crate) fn cpu_memory_info(&self) -> Result<&MemoryInfo> {
        self.memory_info.get_or_try_init(|| {
            let mut ptr = ptr::null_mut();
            ortsys!(
                self,
                CreateCpuMemoryInfo(ffi::ORT_ARENA_ALLOCATOR, ffi::ORT_MEM_TYPE_DEFAULT, &mut ptr)
            )?;
            Ok(MemoryInfo(Handle::new(self, ptr)))
        })
    }
}

/// Memory handed out by the allocator, freed through it on drop.
pub(crate) struct Allocated<'a> {
    api: &'a OrtApi,
    allocator: Allocator,
    ptr: *mut c_void,
}

impl<'a> Allocated<'a> {
    pub(crate) fn new(api: &'a OrtApi, allocator: Allocator, ptr: *mut c_void) -> Self {
        Self {
            api,
            allocator,
            ptr,
        }
    }
}

impl Drop for Allocated<'_> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        if let Some(free) = self.api.AllocatorFree {
            let _ = status::check(self.api, unsafe { free(self.allocator.as_ptr(), ptr) });
        }
    }
}

/// Copies an allocator-owned C string and frees it.
pub(crate) fn take_string(api: &OrtApi, allocator: Allocator, ptr: *mut c_char) -> String {
    let owned = Allocated::new(api, allocator, ptr.cast());
    if owned.ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn allocator_is_cached() {
        let engine = mock::lock();
        let a = engine.api().allocator().unwrap();
        let b = engine.api().allocator().unwrap();
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn memory_info_is_created_once() {
        let engine = mock::lock();
        let first = engine.api().cpu_memory_info().unwrap().as_ptr();
        let second = engine.api().cpu_memory_info().unwrap().as_ptr();
        assert_eq!(first, second);
        assert_eq!(engine.live(), 1);
    }

    #[test]
    fn take_string_frees_through_allocator() {
        let engine = mock::lock();
        let api = engine.api();
        let allocator = api.allocator().unwrap();
        let raw = mock::alloc_string("producer");
        assert_eq!(engine.live(), 1);
        assert_eq!(take_string(api, allocator, raw), "producer");
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.stats().invalid_releases, 0);
    }
}

//! Semaphore adapter: in-place native representation.
//!
//! The native semaphore's size and alignment already satisfy the public
//! storage contract, so unlike the mutex and condition adapters there is no
//! heap indirection and destroy releases nothing.

use thiserror::Error;

use crate::os;

/// The native semaphore primitive reported failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("native semaphore operation failed")]
pub struct SemaphoreError;

/// Counting semaphore stored directly in the handle.
#[repr(C, align(32))]
pub struct Semaphore {
    native: os::OsSemaphore,
}

impl Semaphore {
    fn native_ptr(&self) -> *mut os::OsSemaphore {
        &self.native as *const os::OsSemaphore as *mut os::OsSemaphore
    }

    /// Initialize in place with `count` permits. Any previous state is
    /// discarded.
    pub fn init(&mut self, count: i32) {
        // SAFETY: in-place initialization of caller-owned storage.
        unsafe { os::semaphore_init(self.native_ptr(), count) };
    }

    /// Increment the count, waking a waiter if any.
    pub fn post(&self) -> Result<(), SemaphoreError> {
        // SAFETY: `self.native` is a live native semaphore.
        let rc = unsafe { os::semaphore_signal(self.native_ptr()) };
        if rc < 0 { Err(SemaphoreError) } else { Ok(()) }
    }

    /// Block until the count is positive, then decrement it.
    pub fn wait(&self) -> Result<(), SemaphoreError> {
        // SAFETY: as above.
        let rc = unsafe { os::semaphore_wait(self.native_ptr()) };
        if rc < 0 { Err(SemaphoreError) } else { Ok(()) }
    }

    /// Current count. Never blocks.
    #[must_use]
    pub fn value(&self) -> i32 {
        // SAFETY: as above.
        unsafe { os::semaphore_count(self.native_ptr()) }
    }

    /// No-op: the semaphore owns no separate allocation.
    pub fn destroy(&mut self) {}
}

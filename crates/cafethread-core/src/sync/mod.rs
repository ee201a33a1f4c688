//! Synchronization adapters over the native fast-path primitives.
//!
//! Mutex and condition-variable handles are pointer-sized slots that own
//! one heap-allocated native object each; the semaphore is represented in
//! place because its native size already satisfies the public storage
//! contract. The shared allocate/free/null-marker discipline for the two
//! indirect handles lives here.

pub mod cond;
pub mod mutex;
pub mod sem;

pub use cond::CondHandle;
pub use mutex::MutexHandle;
pub use sem::{Semaphore, SemaphoreError};

use core::mem::size_of;
use core::ptr::NonNull;

use thiserror::Error;

use crate::os;

/// Native synchronization objects are given 32-byte alignment on the heap.
pub const SYNC_OBJECT_ALIGN: usize = 32;

/// The heap could not supply storage for a native synchronization object.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("native synchronization object allocation failed")]
pub struct SyncInitError;

/// Operation attempted through a handle whose initialization never
/// succeeded (or was never run): the stored null marker.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("synchronization handle is not initialized")]
pub struct HandleUninitialized;

fn alloc_native<T>() -> Option<NonNull<T>> {
    NonNull::new(os::heap_alloc(size_of::<T>(), SYNC_OBJECT_ALIGN).cast::<T>())
}

unsafe fn free_native<T>(object: NonNull<T>) {
    // SAFETY: `object` came from `alloc_native`, i.e. the default heap.
    unsafe { os::heap_free(object.as_ptr().cast::<u8>()) };
}

//! Mutex adapter: a pointer-sized handle owning one heap-allocated native
//! fast mutex.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::os;

use super::{HandleUninitialized, SyncInitError, alloc_native, free_native};

/// Opaque mutex handle. Either uninitialized (the all-zero pattern) or the
/// owner of one native fast mutex on the heap. Copies of the handle's
/// storage share that object; no reference counting is performed, so
/// destroying while another thread still operates on it is a caller error.
#[repr(transparent)]
#[derive(Debug)]
pub struct MutexHandle(Option<NonNull<os::OsFastMutex>>);

// The public storage contract: exactly one pointer.
const _: () = assert!(size_of::<MutexHandle>() == size_of::<*mut ()>());

impl MutexHandle {
    /// A handle in the uninitialized state.
    pub const UNINIT: Self = Self(None);

    /// Allocate and initialize the native mutex this handle will own.
    ///
    /// On allocation failure the handle is left holding the null marker and
    /// must not be used until a later init succeeds.
    pub fn init(&mut self) -> Result<(), SyncInitError> {
        match alloc_native::<os::OsFastMutex>() {
            Some(native) => {
                // SAFETY: fresh, exclusively-owned storage of the right size.
                unsafe { os::fast_mutex_init(native.as_ptr()) };
                self.0 = Some(native);
                Ok(())
            }
            None => {
                self.0 = None;
                Err(SyncInitError)
            }
        }
    }

    /// Release the native mutex, if one was ever successfully initialized.
    /// The handle reverts to the uninitialized state.
    pub fn destroy(&mut self) {
        if let Some(native) = self.0.take() {
            // SAFETY: the handle owned this object; `take` prevents reuse.
            unsafe { free_native(native) };
        }
    }

    /// Block until the mutex is acquired.
    pub fn lock(&self) -> Result<(), HandleUninitialized> {
        let native = self.0.ok_or(HandleUninitialized)?;
        // SAFETY: `Some` implies a live native object per the handle
        // invariant.
        unsafe { os::fast_mutex_lock(native.as_ptr()) };
        Ok(())
    }

    /// Attempt to acquire without blocking. `Ok(false)` means contended.
    pub fn try_lock(&self) -> Result<bool, HandleUninitialized> {
        let native = self.0.ok_or(HandleUninitialized)?;
        // SAFETY: see `lock`.
        Ok(unsafe { os::fast_mutex_try_lock(native.as_ptr()) })
    }

    /// Release the mutex. Must be called by the current holder.
    pub fn unlock(&self) -> Result<(), HandleUninitialized> {
        let native = self.0.ok_or(HandleUninitialized)?;
        // SAFETY: see `lock`.
        unsafe { os::fast_mutex_unlock(native.as_ptr()) };
        Ok(())
    }

    pub(crate) fn native(&self) -> Option<NonNull<os::OsFastMutex>> {
        self.0
    }
}

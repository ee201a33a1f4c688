//! Condition-variable adapter: mirrors the mutex adapter's heap
//! indirection over the native fast condition.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::os;

use super::{HandleUninitialized, MutexHandle, SyncInitError, alloc_native, free_native};

/// Opaque condition-variable handle; same ownership discipline as
/// [`MutexHandle`].
#[repr(transparent)]
#[derive(Debug)]
pub struct CondHandle(Option<NonNull<os::OsFastCond>>);

const _: () = assert!(size_of::<CondHandle>() == size_of::<*mut ()>());

impl CondHandle {
    /// A handle in the uninitialized state.
    pub const UNINIT: Self = Self(None);

    /// Allocate and initialize the native condition this handle will own.
    pub fn init(&mut self) -> Result<(), SyncInitError> {
        match alloc_native::<os::OsFastCond>() {
            Some(native) => {
                // SAFETY: fresh, exclusively-owned storage of the right size.
                unsafe { os::fast_cond_init(native.as_ptr()) };
                self.0 = Some(native);
                Ok(())
            }
            None => {
                self.0 = None;
                Err(SyncInitError)
            }
        }
    }

    /// Release the native condition, if one was ever successfully
    /// initialized. The handle reverts to the uninitialized state.
    pub fn destroy(&mut self) {
        if let Some(native) = self.0.take() {
            // SAFETY: the handle owned this object; `take` prevents reuse.
            unsafe { free_native(native) };
        }
    }

    /// Wake at least one waiter.
    pub fn signal(&self) -> Result<(), HandleUninitialized> {
        let native = self.0.ok_or(HandleUninitialized)?;
        // SAFETY: `Some` implies a live native object.
        unsafe { os::fast_cond_signal(native.as_ptr()) };
        Ok(())
    }

    /// Wake waiters. On this platform's fast-path primitive this is the
    /// same native operation as [`signal`](Self::signal); callers must not
    /// rely on broadcast observably differing from signal under contention.
    pub fn broadcast(&self) -> Result<(), HandleUninitialized> {
        self.signal()
    }

    /// Atomically release `mutex`, block until signaled, then re-acquire
    /// `mutex` before returning. The caller must hold `mutex` locked.
    pub fn wait(&self, mutex: &MutexHandle) -> Result<(), HandleUninitialized> {
        let native = self.0.ok_or(HandleUninitialized)?;
        let native_mutex = mutex.native().ok_or(HandleUninitialized)?;
        // SAFETY: both objects are live per the handle invariants; the
        // native wait performs the release-block-reacquire protocol itself.
        unsafe { os::fast_cond_wait(native.as_ptr(), native_mutex.as_ptr()) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_handle_reports_rather_than_dereferences() {
        let cond = CondHandle::UNINIT;
        assert_eq!(cond.signal(), Err(HandleUninitialized));
        assert_eq!(cond.broadcast(), Err(HandleUninitialized));
        let mutex = MutexHandle::UNINIT;
        assert_eq!(cond.wait(&mutex), Err(HandleUninitialized));
    }

    #[test]
    fn wait_requires_an_initialized_mutex() {
        let mut cond = CondHandle::UNINIT;
        cond.init().expect("cond init failed");
        let mutex = MutexHandle::UNINIT;
        assert_eq!(cond.wait(&mutex), Err(HandleUninitialized));
        cond.destroy();
    }

    #[test]
    fn signal_without_waiters_is_harmless_and_reinit_is_fresh() {
        let mut cond = CondHandle::UNINIT;
        cond.init().expect("cond init failed");
        cond.signal().expect("signal failed");
        cond.broadcast().expect("broadcast failed");
        cond.destroy();

        cond.init().expect("re-init failed");
        cond.signal().expect("signal after re-init failed");
        cond.destroy();
    }
}

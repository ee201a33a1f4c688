//! ABI layer for the `<semaphore.h>` surface.
//!
//! The `sem_*` family reports failure POSIX-style: `-1` with thread-local
//! errno, rather than a returned errno value.

use core::ffi::{c_int, c_uint};

use cafethread_core::errno;

use crate::types::sem_t;

/// POSIX `sem_init`. The process-shared flag is not meaningful on this
/// platform and is ignored.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn sem_init(sem: *mut sem_t, _pshared: c_int, value: c_uint) -> c_int {
    if sem.is_null() {
        errno::set_errno(errno::EINVAL);
        return -1;
    }
    // SAFETY: caller-owned in-place semaphore storage.
    unsafe { &mut *sem }.init(value as i32);
    0
}

/// POSIX `sem_post`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn sem_post(sem: *mut sem_t) -> c_int {
    if sem.is_null() {
        errno::set_errno(errno::EINVAL);
        return -1;
    }
    // SAFETY: caller-owned in-place semaphore storage.
    match unsafe { &*sem }.post() {
        Ok(()) => 0,
        Err(_) => {
            errno::set_errno(errno::EINVAL);
            -1
        }
    }
}

/// POSIX `sem_wait`. Blocks until the count is positive.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn sem_wait(sem: *mut sem_t) -> c_int {
    if sem.is_null() {
        errno::set_errno(errno::EINVAL);
        return -1;
    }
    // SAFETY: caller-owned in-place semaphore storage.
    match unsafe { &*sem }.wait() {
        Ok(()) => 0,
        Err(_) => {
            errno::set_errno(errno::EINVAL);
            -1
        }
    }
}

/// POSIX `sem_getvalue`. Never blocks; always succeeds for valid pointers.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn sem_getvalue(sem: *mut sem_t, sval: *mut c_int) -> c_int {
    if sem.is_null() || sval.is_null() {
        errno::set_errno(errno::EINVAL);
        return -1;
    }
    // SAFETY: both pointers validated non-null above.
    unsafe { *sval = (*sem).value() };
    0
}

/// POSIX `sem_destroy`. No separate allocation exists, so this is a no-op
/// that always succeeds.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn sem_destroy(sem: *mut sem_t) -> c_int {
    if sem.is_null() {
        errno::set_errno(errno::EINVAL);
        return -1;
    }
    // SAFETY: caller-owned in-place semaphore storage.
    unsafe { &mut *sem }.destroy();
    0
}

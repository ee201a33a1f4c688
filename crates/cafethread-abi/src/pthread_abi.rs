//! ABI layer for the `<pthread.h>` surface: thread lifecycle, mutexes and
//! condition variables.

use core::ffi::{c_int, c_void};
use core::ptr::NonNull;

use cafethread_core::config::ThreadDefaults;
use cafethread_core::errno;
use cafethread_core::os::OsThread;
use cafethread_core::thread::{self, StartRoutine, ThreadCreateError, ThreadManager};

use crate::types::{
    pthread_attr_t, pthread_cond_t, pthread_condattr_t, pthread_mutex_t, pthread_mutexattr_t,
    pthread_t,
};

/// Process-wide manager applying the stock defaults when creation
/// attributes are omitted.
static MANAGER: ThreadManager = ThreadManager::new(ThreadDefaults::STOCK);

// ===========================================================================
// Thread operations
// ===========================================================================

/// POSIX `pthread_create`.
///
/// Returns `0` on success, otherwise an errno-style integer; on failure the
/// output handle is set to zero.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_create(
    thread_out: *mut pthread_t,
    attr: *const pthread_attr_t,
    start_routine: Option<StartRoutine>,
    arg: *mut c_void,
) -> c_int {
    if thread_out.is_null() {
        return errno::EINVAL;
    }
    let Some(start) = start_routine else {
        // SAFETY: `thread_out` was validated non-null above.
        unsafe { *thread_out = 0 };
        return errno::EINVAL;
    };
    // SAFETY: a non-null `attr` points to caller-provided attributes.
    let attributes = if attr.is_null() {
        None
    } else {
        Some(unsafe { *attr })
    };

    // SAFETY: the caller supplies a valid start routine and argument.
    match unsafe { MANAGER.create(attributes, start, arg) } {
        Ok(handle) => {
            // SAFETY: validated non-null above.
            unsafe { *thread_out = handle.as_ptr() as pthread_t };
            0
        }
        Err(err) => {
            // SAFETY: validated non-null above.
            unsafe { *thread_out = 0 };
            match err {
                ThreadCreateError::AllocationFailed(_) => errno::ENOMEM,
                ThreadCreateError::NativeRefused => errno::EAGAIN,
            }
        }
    }
}

/// Create a thread pinned to `core_id` (0, 1 or 2) with default priority
/// and stack size. An out-of-range core id falls back to the default
/// affinity.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_create_on_core(
    thread_out: *mut pthread_t,
    start_routine: Option<StartRoutine>,
    arg: *mut c_void,
    core_id: u32,
) -> c_int {
    let attributes = MANAGER.defaults().pinned_to_core(core_id);
    // SAFETY: same contract as `pthread_create`.
    unsafe { pthread_create(thread_out, &attributes, start_routine, arg) }
}

/// Create a thread with explicit stack size, core and priority; a zero
/// stack size, out-of-range core id or out-of-range priority each fall
/// back to the corresponding default.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_create_ex(
    thread_out: *mut pthread_t,
    start_routine: Option<StartRoutine>,
    arg: *mut c_void,
    stack_size: u32,
    core_id: u32,
    priority: u32,
) -> c_int {
    let attributes = MANAGER.defaults().customized(stack_size, core_id, priority);
    // SAFETY: same contract as `pthread_create`.
    unsafe { pthread_create(thread_out, &attributes, start_routine, arg) }
}

/// POSIX `pthread_join`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_join(thread: pthread_t, retval: *mut *mut c_void) -> c_int {
    let Some(handle) = NonNull::new(thread as *mut OsThread) else {
        return errno::EINVAL;
    };
    // SAFETY: the handle came from `pthread_create`; joining consumes it.
    match unsafe { thread::join(handle) } {
        Ok(exit) => {
            if !retval.is_null() {
                // SAFETY: caller-provided out pointer.
                unsafe { *retval = exit };
            }
            0
        }
        Err(_) => errno::EINVAL,
    }
}

/// POSIX `pthread_cancel`. Cancellation is advisory on this platform: the
/// request is forwarded to the native scheduler and this always reports
/// success.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cancel(thread: pthread_t) -> c_int {
    if let Some(handle) = NonNull::new(thread as *mut OsThread) {
        // SAFETY: forwarding to the native advisory cancel request.
        unsafe { thread::cancel(handle) };
    }
    0
}

// ===========================================================================
// Mutex operations
// ===========================================================================

/// POSIX `pthread_mutex_init`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_mutex_init(
    mutex: *mut pthread_mutex_t,
    _attr: *const pthread_mutexattr_t,
) -> c_int {
    if mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &mut *mutex }.init() {
        Ok(()) => 0,
        Err(_) => errno::ENOMEM,
    }
}

/// POSIX `pthread_mutex_destroy`. Always succeeds.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int {
    if mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    unsafe { &mut *mutex }.destroy();
    0
}

/// POSIX `pthread_mutex_lock`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_mutex_lock(mutex: *mut pthread_mutex_t) -> c_int {
    if mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &*mutex }.lock() {
        Ok(()) => 0,
        Err(_) => errno::EINVAL,
    }
}

/// POSIX `pthread_mutex_trylock`. Returns `EBUSY` when the mutex is
/// already held; never blocks.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int {
    if mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &*mutex }.try_lock() {
        Ok(true) => 0,
        Ok(false) => errno::EBUSY,
        Err(_) => errno::EINVAL,
    }
}

/// POSIX `pthread_mutex_unlock`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int {
    if mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &*mutex }.unlock() {
        Ok(()) => 0,
        Err(_) => errno::EINVAL,
    }
}

// ===========================================================================
// Condition variable operations
// ===========================================================================

/// POSIX `pthread_cond_init`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cond_init(
    cond: *mut pthread_cond_t,
    _attr: *const pthread_condattr_t,
) -> c_int {
    if cond.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &mut *cond }.init() {
        Ok(()) => 0,
        Err(_) => errno::ENOMEM,
    }
}

/// POSIX `pthread_cond_destroy`. Always succeeds.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cond_destroy(cond: *mut pthread_cond_t) -> c_int {
    if cond.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    unsafe { &mut *cond }.destroy();
    0
}

/// POSIX `pthread_cond_signal`.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cond_signal(cond: *mut pthread_cond_t) -> c_int {
    if cond.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &*cond }.signal() {
        Ok(()) => 0,
        Err(_) => errno::EINVAL,
    }
}

/// POSIX `pthread_cond_broadcast`.
///
/// The fast-path native condition has a single wake operation, so this is
/// the same operation as `pthread_cond_signal`; callers must not assume
/// its observable effect differs under contention.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
    if cond.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage.
    match unsafe { &*cond }.broadcast() {
        Ok(()) => 0,
        Err(_) => errno::EINVAL,
    }
}

/// POSIX `pthread_cond_wait`. The caller must hold `mutex` locked.
#[cfg_attr(all(feature = "cafe", target_arch = "powerpc"), unsafe(no_mangle))]
pub unsafe extern "C" fn pthread_cond_wait(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
) -> c_int {
    if cond.is_null() || mutex.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: caller-owned handle storage for both objects.
    match unsafe { (*cond).wait(&*mutex) } {
        Ok(()) => 0,
        Err(_) => errno::EINVAL,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;

    #[test]
    fn create_rejects_null_out_param() {
        // SAFETY: exercising the null-argument boundary checks.
        let rc = unsafe { pthread_create(ptr::null_mut(), ptr::null(), None, ptr::null_mut()) };
        assert_eq!(rc, errno::EINVAL);
    }

    #[test]
    fn create_rejects_missing_start_routine() {
        let mut thread: pthread_t = 0xFFFF;
        // SAFETY: output pointer is valid; the missing routine is the point.
        let rc = unsafe { pthread_create(&mut thread, ptr::null(), None, ptr::null_mut()) };
        assert_eq!(rc, errno::EINVAL);
        assert_eq!(thread, 0);
    }

    #[test]
    fn join_rejects_the_zero_handle() {
        // SAFETY: the zero handle never reaches the native join.
        assert_eq!(unsafe { pthread_join(0, ptr::null_mut()) }, errno::EINVAL);
    }

    #[test]
    fn cancel_of_the_zero_handle_still_reports_success() {
        // SAFETY: the zero handle is ignored.
        assert_eq!(unsafe { pthread_cancel(0) }, 0);
    }

    #[test]
    fn mutex_ops_reject_null_handles() {
        // SAFETY: exercising the null-argument boundary checks.
        unsafe {
            assert_eq!(pthread_mutex_init(ptr::null_mut(), ptr::null()), errno::EINVAL);
            assert_eq!(pthread_mutex_lock(ptr::null_mut()), errno::EINVAL);
            assert_eq!(pthread_mutex_trylock(ptr::null_mut()), errno::EINVAL);
            assert_eq!(pthread_mutex_unlock(ptr::null_mut()), errno::EINVAL);
            assert_eq!(pthread_mutex_destroy(ptr::null_mut()), errno::EINVAL);
        }
    }

    #[test]
    fn cond_ops_reject_null_handles() {
        // SAFETY: exercising the null-argument boundary checks.
        unsafe {
            assert_eq!(pthread_cond_init(ptr::null_mut(), ptr::null()), errno::EINVAL);
            assert_eq!(pthread_cond_signal(ptr::null_mut()), errno::EINVAL);
            assert_eq!(pthread_cond_broadcast(ptr::null_mut()), errno::EINVAL);
            assert_eq!(
                pthread_cond_wait(ptr::null_mut(), ptr::null_mut()),
                errno::EINVAL
            );
            assert_eq!(pthread_cond_destroy(ptr::null_mut()), errno::EINVAL);
        }
    }

    #[test]
    fn zeroed_mutex_storage_is_the_uninitialized_state() {
        let mutex: *mut pthread_mutex_t = Box::into_raw(Box::new(
            // SAFETY: all-zero storage is the documented uninitialized state.
            unsafe { core::mem::zeroed() },
        ));
        // SAFETY: valid handle storage that was never initialized.
        unsafe {
            assert_eq!(pthread_mutex_lock(mutex), errno::EINVAL);
            assert_eq!(pthread_mutex_trylock(mutex), errno::EINVAL);
            assert_eq!(pthread_mutex_destroy(mutex), 0);
            drop(Box::from_raw(mutex));
        }
    }
}

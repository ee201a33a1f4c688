#![cfg(not(target_arch = "powerpc"))]

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use cafethread_abi::pthread_abi::{
    pthread_cancel, pthread_create, pthread_create_ex, pthread_create_on_core, pthread_join,
    pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock, pthread_mutex_unlock,
};
use cafethread_abi::types::{pthread_attr_t, pthread_mutex_t, pthread_t};
use cafethread_core::config::{AFFINITY_CPU0, AFFINITY_CPU1, AFFINITY_CPU2};
use cafethread_core::os::{OsThread, thread_cancel_requested_for_tests};
use cafethread_core::thread::creation_attributes;

/// Entry that returns its argument as the exit value.
unsafe extern "C" fn echo_entry(arg: *mut c_void) -> *mut c_void {
    arg
}

fn native_handle(thread: pthread_t) -> NonNull<OsThread> {
    NonNull::new(thread as *mut OsThread).expect("thread handle is zero")
}

#[test]
fn create_and_join_returns_entry_value() {
    let sentinel = 0x5EED_usize;
    let mut thread: pthread_t = 0;
    let mut exit: *mut c_void = ptr::null_mut();
    // SAFETY: echo_entry treats its argument as a plain integer.
    unsafe {
        assert_eq!(
            pthread_create(
                &mut thread,
                ptr::null(),
                Some(echo_entry),
                sentinel as *mut c_void
            ),
            0
        );
        assert_ne!(thread, 0);
        assert_eq!(pthread_join(thread, &mut exit), 0);
    }
    assert_eq!(exit as usize, sentinel);
}

#[test]
fn join_with_null_retval_discards_the_exit_value() {
    let mut thread: pthread_t = 0;
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create(&mut thread, ptr::null(), Some(echo_entry), ptr::null_mut()),
            0
        );
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn second_join_of_the_same_thread_fails() {
    let mut thread: pthread_t = 0;
    // SAFETY: as above; the second join only uses the handle as a lookup key.
    unsafe {
        assert_eq!(
            pthread_create(&mut thread, ptr::null(), Some(echo_entry), ptr::null_mut()),
            0
        );
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
        assert_ne!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn omitted_attributes_capture_stock_defaults() {
    let mut thread: pthread_t = 0;
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create(&mut thread, ptr::null(), Some(echo_entry), ptr::null_mut()),
            0
        );
        // The footer stays live until join reclaims the thread.
        let captured = creation_attributes(native_handle(thread));
        assert_eq!(captured.flags, AFFINITY_CPU1);
        assert_eq!(captured.priority, 15);
        assert_eq!(captured.stack_size, 131_072);
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn supplied_attributes_are_captured_verbatim() {
    let attr = pthread_attr_t {
        flags: AFFINITY_CPU0,
        priority: 4,
        stack_size: 70_000, // intentionally not 32-byte aligned
    };
    let mut thread: pthread_t = 0;
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create(&mut thread, &attr, Some(echo_entry), ptr::null_mut()),
            0
        );
        assert_eq!(creation_attributes(native_handle(thread)), attr);
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn create_on_core_pins_affinity_and_defaults_the_rest() {
    let mut thread: pthread_t = 0;
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create_on_core(&mut thread, Some(echo_entry), ptr::null_mut(), 2),
            0
        );
        let captured = creation_attributes(native_handle(thread));
        assert_eq!(captured.flags, AFFINITY_CPU2);
        assert_eq!(captured.priority, 15);
        assert_eq!(captured.stack_size, 131_072);
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn create_ex_defaults_zero_and_out_of_range_fields() {
    let mut thread: pthread_t = 0;
    // stack 0 -> default, core 9 -> default affinity, priority 99 -> default.
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create_ex(&mut thread, Some(echo_entry), ptr::null_mut(), 0, 9, 99),
            0
        );
        let captured = creation_attributes(native_handle(thread));
        assert_eq!(captured.flags, AFFINITY_CPU1);
        assert_eq!(captured.priority, 15);
        assert_eq!(captured.stack_size, 131_072);
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }

    // All fields in range are taken as supplied.
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create_ex(&mut thread, Some(echo_entry), ptr::null_mut(), 65_536, 0, 31),
            0
        );
        let captured = creation_attributes(native_handle(thread));
        assert_eq!(captured.flags, AFFINITY_CPU0);
        assert_eq!(captured.priority, 31);
        assert_eq!(captured.stack_size, 65_536);
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

#[test]
fn cancel_is_recorded_and_always_reports_success() {
    let mut thread: pthread_t = 0;
    // SAFETY: as above.
    unsafe {
        assert_eq!(
            pthread_create(&mut thread, ptr::null(), Some(echo_entry), ptr::null_mut()),
            0
        );
        assert_eq!(pthread_cancel(thread), 0);
        assert!(thread_cancel_requested_for_tests(thread));
        // Cancellation is advisory; the thread still finishes and joins.
        assert_eq!(pthread_join(thread, ptr::null_mut()), 0);
    }
}

// ---------------------------------------------------------------------------
// Mutexed shared counter
// ---------------------------------------------------------------------------

#[repr(C)]
struct CounterJob {
    mutex: *mut pthread_mutex_t,
    counter: *mut u64,
}

unsafe extern "C" fn counting_entry(arg: *mut c_void) -> *mut c_void {
    // SAFETY: `arg` points to a CounterJob that outlives the thread.
    let job = unsafe { &*arg.cast::<CounterJob>() };
    for _ in 0..1000 {
        // SAFETY: the job's mutex and counter stay valid until joined.
        unsafe {
            pthread_mutex_lock(job.mutex);
            *job.counter += 1;
            pthread_mutex_unlock(job.mutex);
        }
    }
    ptr::null_mut()
}

#[test]
fn n_threads_of_mutexed_increments_sum_exactly() {
    const WORKERS: usize = 4;

    let mutex: *mut pthread_mutex_t = Box::into_raw(Box::new(
        // SAFETY: all-zero storage is the documented uninitialized state.
        unsafe { std::mem::zeroed() },
    ));
    let counter: *mut u64 = Box::into_raw(Box::new(0u64));
    // SAFETY: valid caller-owned handle storage.
    unsafe { assert_eq!(pthread_mutex_init(mutex, ptr::null()), 0) };

    let jobs: Vec<Box<CounterJob>> = (0..WORKERS)
        .map(|_| Box::new(CounterJob { mutex, counter }))
        .collect();

    let mut threads = Vec::with_capacity(WORKERS);
    for job in &jobs {
        let mut thread: pthread_t = 0;
        let arg = &**job as *const CounterJob as *mut c_void;
        // SAFETY: the job outlives the thread (joined below).
        unsafe {
            assert_eq!(
                pthread_create(&mut thread, ptr::null(), Some(counting_entry), arg),
                0
            );
        }
        threads.push(thread);
    }
    for thread in threads {
        // SAFETY: each thread joined exactly once.
        unsafe { assert_eq!(pthread_join(thread, ptr::null_mut()), 0) };
    }

    // SAFETY: all workers joined; exclusive access again.
    unsafe {
        assert_eq!(*counter, (WORKERS * 1000) as u64);
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        drop(Box::from_raw(mutex));
        drop(Box::from_raw(counter));
    }
    drop(jobs);
}

//! Bindings to the real `coreinit` primitives (device builds).
//!
//! The native objects are opaque blobs at their device sizes; the scheduler
//! and primitive routines are the only code that interprets them.

use core::cell::UnsafeCell;
use core::ffi::{c_char, c_void};

use super::{OsThreadDeallocator, OsThreadEntry};

/// Native thread control block, opaque at this layer.
#[repr(C, align(8))]
pub struct OsThread {
    _storage: UnsafeCell<[u8; 0x6a0]>,
}

// SAFETY: the scheduler owns and serializes all mutation of the control
// block; this layer only passes its address around.
unsafe impl Send for OsThread {}
// SAFETY: as above.
unsafe impl Sync for OsThread {}

/// Native fast-path mutex, opaque at this layer.
#[repr(C, align(4))]
pub struct OsFastMutex {
    _storage: UnsafeCell<[u8; 0x2c]>,
}

// SAFETY: the native primitive serializes access internally.
unsafe impl Send for OsFastMutex {}
// SAFETY: as above.
unsafe impl Sync for OsFastMutex {}

/// Native fast-path condition variable, opaque at this layer.
#[repr(C, align(4))]
pub struct OsFastCond {
    _storage: UnsafeCell<[u8; 0x1c]>,
}

// SAFETY: the native primitive serializes access internally.
unsafe impl Send for OsFastCond {}
// SAFETY: as above.
unsafe impl Sync for OsFastCond {}

/// Native counting semaphore, opaque at this layer.
#[repr(C, align(4))]
pub struct OsSemaphore {
    _storage: UnsafeCell<[u8; 0x20]>,
}

// SAFETY: the native primitive serializes access internally.
unsafe impl Send for OsSemaphore {}
// SAFETY: as above.
unsafe impl Sync for OsSemaphore {}

unsafe extern "C" {
    fn OSCreateThread(
        thread: *mut OsThread,
        entry: OsThreadEntry,
        argc: i32,
        argv: *mut c_void,
        stack: *mut c_void,
        stack_size: u32,
        priority: i32,
        attributes: u8,
    ) -> i32;
    fn OSSetThreadDeallocator(thread: *mut OsThread, deallocator: OsThreadDeallocator);
    fn OSResumeThread(thread: *mut OsThread) -> i32;
    fn OSJoinThread(thread: *mut OsThread, exit_code: *mut i32) -> i32;
    fn OSCancelThread(thread: *mut OsThread);

    fn OSFastMutex_Init(mutex: *mut OsFastMutex, name: *const c_char);
    fn OSFastMutex_Lock(mutex: *mut OsFastMutex);
    fn OSFastMutex_TryLock(mutex: *mut OsFastMutex) -> i32;
    fn OSFastMutex_Unlock(mutex: *mut OsFastMutex);

    fn OSFastCond_Init(cond: *mut OsFastCond, name: *const c_char);
    fn OSFastCond_Signal(cond: *mut OsFastCond);
    fn OSFastCond_Wait(cond: *mut OsFastCond, mutex: *mut OsFastMutex);

    fn OSInitSemaphore(sem: *mut OsSemaphore, count: i32);
    fn OSSignalSemaphore(sem: *mut OsSemaphore) -> i32;
    fn OSWaitSemaphore(sem: *mut OsSemaphore) -> i32;
    fn OSGetSemaphoreCount(sem: *mut OsSemaphore) -> i32;

    fn MEMAllocFromDefaultHeapEx(size: u32, alignment: i32) -> *mut c_void;
    fn MEMFreeToDefaultHeap(ptr: *mut c_void);
}

/// Construct a suspended thread in caller-provided control-block storage,
/// with a caller-provided stack. `stack` is the stack top; the stack grows
/// down from it. Returns false if the scheduler refuses.
pub unsafe fn thread_create(
    thread: *mut OsThread,
    entry: OsThreadEntry,
    argc: i32,
    argv: *mut c_void,
    stack: *mut u8,
    stack_size: u32,
    priority: i32,
    attributes: u8,
) -> bool {
    // SAFETY: forwarded to the scheduler with the caller's storage contract.
    unsafe {
        OSCreateThread(
            thread,
            entry,
            argc,
            argv,
            stack.cast::<c_void>(),
            stack_size,
            priority,
            attributes,
        ) != 0
    }
}

/// Register the reclamation callback on a constructed thread.
pub unsafe fn thread_set_deallocator(thread: *mut OsThread, deallocator: OsThreadDeallocator) {
    // SAFETY: direct call on a constructed control block.
    unsafe { OSSetThreadDeallocator(thread, deallocator) };
}

/// Resume a suspended thread. Returns the previous suspend count.
pub unsafe fn thread_resume(thread: *mut OsThread) -> i32 {
    // SAFETY: direct call on a constructed control block.
    unsafe { OSResumeThread(thread) }
}

/// Block until the thread exits; write its exit code. Returns false when the
/// handle is invalid or the thread is not joinable.
pub unsafe fn thread_join(thread: *mut OsThread, exit_code: *mut i32) -> bool {
    // SAFETY: direct call; the scheduler validates joinability.
    unsafe { OSJoinThread(thread, exit_code) != 0 }
}

/// Advisory cancellation request; honored at the scheduler's discretion.
pub unsafe fn thread_cancel(thread: *mut OsThread) {
    // SAFETY: direct call on a constructed control block.
    unsafe { OSCancelThread(thread) };
}

/// Initialize a fast mutex in place.
pub unsafe fn fast_mutex_init(mutex: *mut OsFastMutex) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { OSFastMutex_Init(mutex, core::ptr::null()) };
}

/// Block until the fast mutex is acquired.
pub unsafe fn fast_mutex_lock(mutex: *mut OsFastMutex) {
    // SAFETY: direct call on an initialized native mutex.
    unsafe { OSFastMutex_Lock(mutex) };
}

/// Attempt to acquire without blocking.
pub unsafe fn fast_mutex_try_lock(mutex: *mut OsFastMutex) -> bool {
    // SAFETY: direct call on an initialized native mutex.
    unsafe { OSFastMutex_TryLock(mutex) != 0 }
}

/// Release the fast mutex.
pub unsafe fn fast_mutex_unlock(mutex: *mut OsFastMutex) {
    // SAFETY: direct call on an initialized native mutex.
    unsafe { OSFastMutex_Unlock(mutex) };
}

/// Initialize a fast condition in place.
pub unsafe fn fast_cond_init(cond: *mut OsFastCond) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { OSFastCond_Init(cond, core::ptr::null()) };
}

/// Wake the condition's waiters. The fast-path primitive has a single wake
/// operation; there is no separate wake-one.
pub unsafe fn fast_cond_signal(cond: *mut OsFastCond) {
    // SAFETY: direct call on an initialized native condition.
    unsafe { OSFastCond_Signal(cond) };
}

/// Release `mutex`, block until signaled, re-acquire `mutex`.
pub unsafe fn fast_cond_wait(cond: *mut OsFastCond, mutex: *mut OsFastMutex) {
    // SAFETY: direct call; the native primitive performs the
    // release-block-reacquire protocol.
    unsafe { OSFastCond_Wait(cond, mutex) };
}

/// Initialize a semaphore in place with `count` permits.
pub unsafe fn semaphore_init(sem: *mut OsSemaphore, count: i32) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { OSInitSemaphore(sem, count) };
}

/// Increment the count, waking a waiter if any. Returns the previous count,
/// negative on failure.
pub unsafe fn semaphore_signal(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: direct call on an initialized native semaphore.
    unsafe { OSSignalSemaphore(sem) }
}

/// Block until the count is positive, then decrement. Returns the count
/// observed before the decrement, negative on failure.
pub unsafe fn semaphore_wait(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: direct call on an initialized native semaphore.
    unsafe { OSWaitSemaphore(sem) }
}

/// Read the current count without blocking.
pub unsafe fn semaphore_count(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: direct call on an initialized native semaphore.
    unsafe { OSGetSemaphoreCount(sem) }
}

/// Allocate `size` bytes at `align` from the default heap. Null on failure.
#[must_use]
pub fn heap_alloc(size: usize, align: usize) -> *mut u8 {
    // SAFETY: the default heap accepts any size/alignment pair.
    unsafe { MEMAllocFromDefaultHeapEx(size as u32, align as i32).cast::<u8>() }
}

/// Return an allocation obtained from [`heap_alloc`]. Null is ignored.
pub unsafe fn heap_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: `ptr` came from the default heap.
    unsafe { MEMFreeToDefaultHeap(ptr.cast::<c_void>()) };
}

//! Host stand-in for the `coreinit` primitive surface.
//!
//! Mirrors the device semantics closely enough for the rest of the crate to
//! be exercised off-device: threads are carried by `std::thread` through a
//! registry keyed by control-block address, the fast mutex is a CAS word
//! with yield parking, the fast condition is a wake sequence counter, the
//! semaphore is an atomic count, and the default heap is a tracking
//! allocator whose outstanding-allocation ledger tests can audit.

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use parking_lot::{Condvar, Mutex};

use super::{OsThreadDeallocator, OsThreadEntry};

const THREAD_TAG: u32 = 0x7448_5244; // "tHRD"

// ---------------------------------------------------------------------------
// Native object layouts (host)
// ---------------------------------------------------------------------------

/// Native thread control block (host layout).
#[repr(C, align(8))]
pub struct OsThread {
    pub tag: u32,
    pub entry: usize,
    pub argc: i32,
    pub argv: usize,
    pub stack_top: usize,
    pub stack_size: u32,
    pub priority: i32,
    pub attributes: u8,
}

/// Native fast-path mutex (host layout): a single CAS word.
#[repr(C, align(4))]
pub struct OsFastMutex {
    word: AtomicI32,
}

/// Native fast-path condition (host layout): a wake sequence counter.
#[repr(C, align(4))]
pub struct OsFastCond {
    seq: AtomicU32,
}

/// Native counting semaphore (host layout).
#[repr(C, align(4))]
pub struct OsSemaphore {
    count: AtomicI32,
}

// ---------------------------------------------------------------------------
// Thread registry
// ---------------------------------------------------------------------------

/// Resume gate: carriers park here until `thread_resume` opens the gate,
/// so threads are constructed suspended exactly like the device scheduler
/// builds them.
struct StartGate {
    opened: Mutex<bool>,
    resume: Condvar,
}

impl StartGate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            opened: Mutex::new(false),
            resume: Condvar::new(),
        })
    }

    fn open(&self) {
        let mut opened = self.opened.lock();
        *opened = true;
        self.resume.notify_all();
    }

    fn wait(&self) {
        let mut opened = self.opened.lock();
        while !*opened {
            self.resume.wait(&mut opened);
        }
    }
}

struct ThreadRecord {
    join: thread::JoinHandle<i32>,
    gate: Arc<StartGate>,
    deallocator: Option<OsThreadDeallocator>,
    stack_top: usize,
    cancel_requested: bool,
}

type ThreadTable = HashMap<usize, ThreadRecord>;

fn thread_table() -> &'static Mutex<ThreadTable> {
    static TABLE: OnceLock<Mutex<ThreadTable>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Construct a suspended thread in caller-provided control-block storage.
///
/// The carrier thread is spawned immediately but parks on the resume gate,
/// so the entry does not run until [`thread_resume`]. Returns false when the
/// host cannot spawn a carrier.
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
    if thread.is_null() {
        return false;
    }

    let gate = StartGate::new();
    let entry_addr = entry as usize;
    let argv_addr = argv as usize;
    let carrier_gate = Arc::clone(&gate);
    let spawned = thread::Builder::new().spawn(move || {
        carrier_gate.wait();
        // SAFETY: `entry_addr` was produced from an `OsThreadEntry` above and
        // round-trips exactly through `usize`.
        let entry: OsThreadEntry = unsafe { mem::transmute(entry_addr) };
        entry(argc, argv_addr as *mut c_void)
    });
    let Ok(join) = spawned else {
        return false;
    };

    // SAFETY: caller passes writable control-block storage.
    unsafe {
        thread.write(OsThread {
            tag: THREAD_TAG,
            entry: entry_addr,
            argc,
            argv: argv_addr,
            stack_top: stack as usize,
            stack_size,
            priority,
            attributes,
        });
    }
    thread_table().lock().insert(
        thread as usize,
        ThreadRecord {
            join,
            gate,
            deallocator: None,
            stack_top: stack as usize,
            cancel_requested: false,
        },
    );
    true
}

/// Register the reclamation callback on a constructed thread.
pub unsafe fn thread_set_deallocator(thread: *mut OsThread, deallocator: OsThreadDeallocator) {
    if let Some(record) = thread_table().lock().get_mut(&(thread as usize)) {
        record.deallocator = Some(deallocator);
    }
}

/// Resume a suspended thread. Returns the previous suspend count, or -1 for
/// an unknown handle.
pub unsafe fn thread_resume(thread: *mut OsThread) -> i32 {
    match thread_table().lock().get(&(thread as usize)) {
        Some(record) => {
            record.gate.open();
            1
        }
        None => -1,
    }
}

/// Block until the thread exits, write its exit code, then invoke the
/// registered deallocator (reclamation). Returns false when the handle is
/// unknown or the thread was already joined.
pub unsafe fn thread_join(thread: *mut OsThread, exit_code: *mut i32) -> bool {
    let record = thread_table().lock().remove(&(thread as usize));
    let Some(record) = record else {
        return false;
    };

    let code = record.join.join().unwrap_or(-1);
    if !exit_code.is_null() {
        // SAFETY: caller-provided out pointer.
        unsafe { *exit_code = code };
    }
    // Reclamation: after this the control-block storage may be gone.
    if let Some(deallocator) = record.deallocator {
        deallocator(thread, record.stack_top as *mut c_void);
    }
    true
}

/// Advisory cancellation request; the host carrier cannot be interrupted,
/// matching the cooperative device semantics.
pub unsafe fn thread_cancel(thread: *mut OsThread) {
    if let Some(record) = thread_table().lock().get_mut(&(thread as usize)) {
        record.cancel_requested = true;
    }
}

/// Test hook: whether a cancellation request was recorded for `thread`.
#[doc(hidden)]
#[must_use]
pub fn thread_cancel_requested_for_tests(thread: usize) -> bool {
    thread_table()
        .lock()
        .get(&thread)
        .is_some_and(|record| record.cancel_requested)
}

// ---------------------------------------------------------------------------
// Fast mutex
// ---------------------------------------------------------------------------

/// Initialize a fast mutex in place.
pub unsafe fn fast_mutex_init(mutex: *mut OsFastMutex) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { (*mutex).word = AtomicI32::new(0) };
}

/// Block until the fast mutex is acquired.
pub unsafe fn fast_mutex_lock(mutex: *mut OsFastMutex) {
    // SAFETY: caller guarantees an initialized native mutex.
    let word = unsafe { &(*mutex).word };
    loop {
        if word
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        thread::yield_now();
    }
}

/// Attempt to acquire without blocking.
pub unsafe fn fast_mutex_try_lock(mutex: *mut OsFastMutex) -> bool {
    // SAFETY: caller guarantees an initialized native mutex.
    let word = unsafe { &(*mutex).word };
    word.compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
}

/// Release the fast mutex.
pub unsafe fn fast_mutex_unlock(mutex: *mut OsFastMutex) {
    // SAFETY: caller guarantees an initialized native mutex.
    let word = unsafe { &(*mutex).word };
    word.store(0, Ordering::Release);
}

// ---------------------------------------------------------------------------
// Fast condition
// ---------------------------------------------------------------------------

/// Initialize a fast condition in place.
pub unsafe fn fast_cond_init(cond: *mut OsFastCond) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { (*cond).seq = AtomicU32::new(0) };
}

/// Wake the condition's waiters. The fast-path primitive has a single wake
/// operation; there is no separate wake-one.
pub unsafe fn fast_cond_signal(cond: *mut OsFastCond) {
    // SAFETY: caller guarantees an initialized native condition.
    let seq = unsafe { &(*cond).seq };
    seq.fetch_add(1, Ordering::Release);
}

/// Release `mutex`, block until the next wake, re-acquire `mutex`.
pub unsafe fn fast_cond_wait(cond: *mut OsFastCond, mutex: *mut OsFastMutex) {
    // SAFETY: caller guarantees initialized native objects.
    let seq = unsafe { &(*cond).seq };
    let observed = seq.load(Ordering::Acquire);
    // SAFETY: the caller holds `mutex` locked, per the wait contract.
    unsafe { fast_mutex_unlock(mutex) };
    while seq.load(Ordering::Acquire) == observed {
        thread::yield_now();
    }
    // SAFETY: re-acquire before returning to the caller.
    unsafe { fast_mutex_lock(mutex) };
}

// ---------------------------------------------------------------------------
// Semaphore
// ---------------------------------------------------------------------------

/// Initialize a semaphore in place with `count` permits.
pub unsafe fn semaphore_init(sem: *mut OsSemaphore, count: i32) {
    // SAFETY: caller provides writable native-object storage.
    unsafe { (*sem).count = AtomicI32::new(count) };
}

/// Increment the count, waking a waiter if any. Returns the previous count
/// (never negative on the host).
pub unsafe fn semaphore_signal(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: caller guarantees an initialized native semaphore.
    let count = unsafe { &(*sem).count };
    count.fetch_add(1, Ordering::AcqRel)
}

/// Block until the count is positive, then decrement. Returns the count
/// observed before the decrement.
pub unsafe fn semaphore_wait(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: caller guarantees an initialized native semaphore.
    let count = unsafe { &(*sem).count };
    loop {
        let observed = count.load(Ordering::Acquire);
        if observed > 0 {
            if count
                .compare_exchange(observed, observed - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return observed;
            }
        } else {
            thread::yield_now();
        }
    }
}

/// Read the current count without blocking.
pub unsafe fn semaphore_count(sem: *mut OsSemaphore) -> i32 {
    // SAFETY: caller guarantees an initialized native semaphore.
    let count = unsafe { &(*sem).count };
    count.load(Ordering::Acquire)
}

// ---------------------------------------------------------------------------
// Default heap
// ---------------------------------------------------------------------------

fn heap_ledger() -> &'static Mutex<HashMap<usize, Layout>> {
    static LEDGER: OnceLock<Mutex<HashMap<usize, Layout>>> = OnceLock::new();
    LEDGER.get_or_init(|| Mutex::new(HashMap::new()))
}

static FAIL_NEXT_ALLOCATION: AtomicBool = AtomicBool::new(false);

/// Allocate `size` bytes at `align` from the default heap. Null on failure.
#[must_use]
pub fn heap_alloc(size: usize, align: usize) -> *mut u8 {
    if size == 0 || FAIL_NEXT_ALLOCATION.swap(false, Ordering::AcqRel) {
        return std::ptr::null_mut();
    }
    let Ok(layout) = Layout::from_size_align(size, align) else {
        return std::ptr::null_mut();
    };
    // SAFETY: `layout` has non-zero size.
    let ptr = unsafe { alloc::alloc(layout) };
    if !ptr.is_null() {
        heap_ledger().lock().insert(ptr as usize, layout);
    }
    ptr
}

/// Return an allocation obtained from [`heap_alloc`]. Null is ignored.
pub unsafe fn heap_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let layout = heap_ledger().lock().remove(&(ptr as usize));
    if let Some(layout) = layout {
        // SAFETY: `ptr` was allocated with exactly this layout.
        unsafe { alloc::dealloc(ptr, layout) };
    }
}

/// Number of default-heap allocations currently outstanding.
#[must_use]
pub fn heap_outstanding_allocations() -> usize {
    heap_ledger().lock().len()
}

/// Test hook: make the next [`heap_alloc`] report exhaustion.
#[doc(hidden)]
pub fn heap_fail_next_allocation_for_tests() {
    FAIL_NEXT_ALLOCATION.store(true, Ordering::Release);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

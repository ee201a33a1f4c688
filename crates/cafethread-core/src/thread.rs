//! Thread lifecycle management over the native scheduler.
//!
//! Each thread lives in ONE allocation: the stack region first, then a
//! footer carrying the creation snapshot, the back-reference to the
//! allocation base, the start packet, and finally the native control block.
//! The opaque handle handed to callers is the address of that embedded
//! control block; the scheduler hands the same address back to the
//! deallocation callback, which recovers the footer by layout offset and
//! frees the whole allocation.
//!
//! Ownership of the allocation is single and deterministic: the creator
//! frees it iff native construction fails, otherwise the scheduler-invoked
//! deallocation callback frees it exactly once at reclamation. The two
//! paths are mutually exclusive on any allocation.

use core::ffi::c_void;
use core::mem::{offset_of, size_of};
use core::ptr::{self, NonNull};

use thiserror::Error;

use crate::config::{ThreadAttributes, ThreadDefaults};
use crate::layout::{ALLOCATION_ALIGN, StackPlan};
use crate::os;

/// Signature of a portable thread entry function.
pub type StartRoutine = unsafe extern "C" fn(*mut c_void) -> *mut c_void;

// ---------------------------------------------------------------------------
// Footer layout
// ---------------------------------------------------------------------------

/// Metadata block placed after a thread's stack region, inside the same
/// allocation. `native` must remain the final field: the stack grows down
/// from the footer's base address.
#[repr(C)]
pub struct ThreadFooter {
    /// Creation attribute snapshot, kept for inspection after the fact.
    /// Holds the requested (pre-alignment) stack size.
    creation: ThreadAttributes,
    /// Base of the combined allocation; what the deallocation callback frees.
    stack_base: *mut u8,
    /// Start packet: entry function carried to the trampoline.
    entry: Option<StartRoutine>,
    /// Start packet: argument carried to the trampoline.
    arg: *mut c_void,
    _reserved: [u32; 3],
    /// Native control block. Its address is the public thread handle.
    native: os::OsThread,
}

/// Byte distance from the footer base to the embedded control block.
/// Derived from the layout, so it stays exact if the footer changes.
const NATIVE_OFFSET: usize = offset_of!(ThreadFooter, native);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes of [`ThreadManager::create`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThreadCreateError {
    /// The combined stack+footer allocation could not be satisfied.
    #[error("combined stack allocation of {0} bytes failed")]
    AllocationFailed(usize),
    /// The native scheduler refused to construct the thread.
    #[error("native thread construction refused")]
    NativeRefused,
}

/// The native join primitive reported failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("thread handle is invalid or not joinable")]
pub struct JoinError;

// ---------------------------------------------------------------------------
// Thread manager
// ---------------------------------------------------------------------------

/// Creates and starts threads, substituting a fixed set of defaults for
/// omitted creation attributes.
#[derive(Debug, Clone, Copy)]
pub struct ThreadManager {
    defaults: ThreadDefaults,
}

impl ThreadManager {
    /// A manager applying `defaults` wherever attributes are omitted.
    #[must_use]
    pub const fn new(defaults: ThreadDefaults) -> Self {
        Self { defaults }
    }

    /// The defaults applied when creation attributes are omitted.
    #[must_use]
    pub const fn defaults(&self) -> ThreadDefaults {
        self.defaults
    }

    /// Create and start a thread running `entry(arg)`.
    ///
    /// The returned handle is the address of the thread's embedded native
    /// control block. Once this returns `Ok`, the allocation backing the
    /// thread belongs to the native scheduler, which reclaims it through
    /// the deallocation callback after the thread exits and is joined.
    ///
    /// # Safety
    ///
    /// `entry` must be safe to call on a new thread with `arg`, and `arg`
    /// must remain valid for the thread's lifetime.
    pub unsafe fn create(
        &self,
        attributes: Option<ThreadAttributes>,
        entry: StartRoutine,
        arg: *mut c_void,
    ) -> Result<NonNull<os::OsThread>, ThreadCreateError> {
        let attributes = self.defaults.resolve(attributes);
        let plan = StackPlan::new(attributes.stack_size as usize, size_of::<ThreadFooter>());

        let base = os::heap_alloc(plan.total(), ALLOCATION_ALIGN);
        let Some(base) = NonNull::new(base) else {
            return Err(ThreadCreateError::AllocationFailed(plan.total()));
        };
        // SAFETY: `base` spans `plan.total()` writable bytes.
        unsafe { ptr::write_bytes(base.as_ptr(), 0, plan.total()) };

        // SAFETY: the footer region starts `footer_offset` bytes in and is
        // 32-byte aligned by construction (64-byte base, 32-byte stack).
        let footer = unsafe { base.as_ptr().add(plan.footer_offset()) }.cast::<ThreadFooter>();
        // SAFETY: `footer` is in-bounds, aligned, and exclusively ours until
        // native construction succeeds.
        unsafe {
            (*footer).creation = attributes;
            (*footer).stack_base = base.as_ptr();
            (*footer).entry = Some(entry);
            (*footer).arg = arg;
        }

        // SAFETY: projecting the final footer field; stays in-bounds.
        let native = unsafe { &raw mut (*footer).native };
        // SAFETY: control block, stack and footer all live inside the fresh
        // allocation; the stack grows down from the footer base.
        let created = unsafe {
            os::thread_create(
                native,
                thread_trampoline,
                0,
                footer.cast::<c_void>(),
                footer.cast::<u8>(),
                plan.stack_size() as u32,
                i32::from(attributes.priority),
                attributes.flags,
            )
        };
        if !created {
            // SAFETY: construction failed, so ownership never transferred;
            // this is the creator's (only) free path.
            unsafe { os::heap_free(base.as_ptr()) };
            return Err(ThreadCreateError::NativeRefused);
        }

        // SAFETY: register reclamation before the thread can run and exit,
        // then let it start; threads are constructed suspended.
        unsafe {
            os::thread_set_deallocator(native, release_thread_allocation);
            os::thread_resume(native);
        }
        // SAFETY: `native` points into a live allocation.
        Ok(unsafe { NonNull::new_unchecked(native) })
    }
}

// ---------------------------------------------------------------------------
// Trampoline and reclamation
// ---------------------------------------------------------------------------

/// Native entry registered for every thread. Receives the footer address
/// through the pointer-width `argv` slot, reconstructs the start packet from
/// its named fields and runs it. The entry's return value, truncated to the
/// native exit-code width, becomes the thread's exit code.
extern "C" fn thread_trampoline(_argc: i32, argv: *mut c_void) -> i32 {
    let footer = argv.cast::<ThreadFooter>();
    // SAFETY: the scheduler passes back exactly the footer address supplied
    // at creation, and the footer outlives the thread.
    let (entry, arg) = unsafe { ((*footer).entry, (*footer).arg) };
    let Some(entry) = entry else {
        return 0;
    };
    // SAFETY: `entry`/`arg` satisfy the contract given to `create`.
    let exit = unsafe { entry(arg) };
    exit as usize as i32
}

/// Deallocation callback, invoked by the scheduler exactly once per thread
/// after it has exited and been reclaimed. Never runs for a thread whose
/// native construction failed: that path frees the allocation directly.
extern "C" fn release_thread_allocation(thread: *mut os::OsThread, _stack: *mut c_void) {
    // SAFETY: `thread` is the address of a footer's `native` field; stepping
    // back `NATIVE_OFFSET` bytes lands on the footer base.
    let footer = unsafe { thread.cast::<u8>().sub(NATIVE_OFFSET) }.cast::<ThreadFooter>();
    // SAFETY: the footer is still live; the back-reference was stored at
    // creation and names the allocation base.
    let base = unsafe { (*footer).stack_base };
    // SAFETY: `base` is the combined allocation, freed here exactly once.
    unsafe { os::heap_free(base) };
}

// ---------------------------------------------------------------------------
// Handle operations
// ---------------------------------------------------------------------------

/// Block until the thread behind `handle` exits; return its exit value.
///
/// # Safety
///
/// `handle` must come from [`ThreadManager::create`] and must not have been
/// joined already; joining consumes the handle.
pub unsafe fn join(handle: NonNull<os::OsThread>) -> Result<*mut c_void, JoinError> {
    let mut exit_code: i32 = 0;
    // SAFETY: live native control block per the caller contract.
    let joined = unsafe { os::thread_join(handle.as_ptr(), &mut exit_code) };
    if joined {
        Ok(exit_code as isize as *mut c_void)
    } else {
        Err(JoinError)
    }
}

/// Request cooperative cancellation. Advisory: the native scheduler decides
/// if and when the thread observes it.
///
/// # Safety
///
/// `handle` must refer to a live (not yet reclaimed) thread.
pub unsafe fn cancel(handle: NonNull<os::OsThread>) {
    // SAFETY: forwarded to the native cancel request.
    unsafe { os::thread_cancel(handle.as_ptr()) };
}

/// Read back the attribute snapshot captured when `handle` was created.
///
/// # Safety
///
/// `handle` must refer to a live (not yet reclaimed) thread.
#[must_use]
pub unsafe fn creation_attributes(handle: NonNull<os::OsThread>) -> ThreadAttributes {
    // SAFETY: same offset recovery as the deallocation callback.
    let footer = unsafe { handle.as_ptr().cast::<u8>().sub(NATIVE_OFFSET) }.cast::<ThreadFooter>();
    // SAFETY: the footer is live while the thread is.
    unsafe { (*footer).creation }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

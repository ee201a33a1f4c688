//! Native Cafe OS (`coreinit`) primitive surface.
//!
//! Everything in this module is an external collaborator: threads, the
//! fast-path mutex/condition family, semaphores and the default heap are
//! invoked, never reimplemented. Device builds (`cafe` feature on the
//! PowerPC target) bind the real `coreinit` symbols; every other build uses
//! a host stand-in with the same surface so the crate is fully exercisable
//! off-device.

#[cfg(all(feature = "cafe", target_arch = "powerpc"))]
mod ffi;
#[cfg(all(feature = "cafe", target_arch = "powerpc"))]
pub use ffi::*;

#[cfg(not(all(feature = "cafe", target_arch = "powerpc")))]
mod host;
#[cfg(not(all(feature = "cafe", target_arch = "powerpc")))]
pub use host::*;

use core::ffi::c_void;

/// Native thread entry point signature. The scheduler passes the `argc`
/// and `argv` values supplied at construction straight through.
pub type OsThreadEntry = extern "C" fn(argc: i32, argv: *mut c_void) -> i32;

/// Callback invoked by the scheduler, exactly once, when a thread is
/// reclaimed after exiting and being joined. Receives the control-block
/// address and the stack pointer supplied at construction.
pub type OsThreadDeallocator = extern "C" fn(thread: *mut OsThread, stack: *mut c_void);

//! Public C type shapes for the adapted POSIX surface.
//!
//! These shapes are given constraints, not designs: the thread handle is a
//! pointer-width integer, the mutex/condition handles are pointer-sized
//! opaque storage, and the semaphore is the native object in place.

use core::ffi::c_void;

use cafethread_core::config::ThreadAttributes;
use cafethread_core::sync::{CondHandle, MutexHandle, Semaphore};

/// Opaque thread identifier: the address of the thread's embedded native
/// control block, or zero after a failed create.
pub type pthread_t = usize;

/// Thread creation attributes: affinity flags, priority (0 = highest,
/// 31 = lowest) and requested stack size in bytes.
pub type pthread_attr_t = ThreadAttributes;

/// Pointer-sized opaque mutex storage. Zero-initialized storage is the
/// documented uninitialized state.
pub type pthread_mutex_t = MutexHandle;

/// Pointer-sized opaque condition-variable storage.
pub type pthread_cond_t = CondHandle;

/// In-place native semaphore storage, 32-byte aligned.
pub type sem_t = Semaphore;

/// Mutex creation attributes are not consulted on this platform.
pub type pthread_mutexattr_t = c_void;

/// Condition-variable creation attributes are not consulted on this
/// platform.
pub type pthread_condattr_t = c_void;

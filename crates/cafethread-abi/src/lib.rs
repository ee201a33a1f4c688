//! # cafethread-abi
//!
//! ABI-compatible `extern "C"` boundary exposing the POSIX threading
//! surface (`pthread_*`, `sem_*`) over `cafethread-core`.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> core adapters -> native primitives
//! ```
//!
//! Every function returns `0` on success to match the POSIX convention
//! being adapted. There is no logging or diagnostic channel; failure is
//! communicated solely through return codes (and thread-local errno for
//! the `sem_*` family).
//!
//! Symbols are exported unmangled only on device builds (`cafe` feature on
//! the PowerPC target). Host builds keep them mangled so that test
//! binaries never shadow the system C library's own `pthread_*` symbols,
//! which would re-route `std::thread` through this crate.

// The extern "C" exports accept raw pointers from C callers; the boundary
// checks are inlined per function, so per-function safety docs would be
// redundant boilerplate.
#![allow(clippy::missing_safety_doc)]
#![allow(non_camel_case_types)]

pub mod pthread_abi;
pub mod sem_abi;
pub mod types;

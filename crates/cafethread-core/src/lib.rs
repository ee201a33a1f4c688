//! # cafethread-core
//!
//! Thread lifecycle and synchronization semantics for a POSIX-style
//! threading surface on Cafe OS.
//!
//! The native `coreinit` primitives (threads, the fast-path mutex/condition
//! family, semaphores, the default heap) are external collaborators reached
//! through [`os`]; this crate owns the combined stack+footer thread
//! allocation scheme and the opaque-handle adapters built on top of them.
//! The safe modules hold the arithmetic and policy; raw-memory work is
//! confined to the modules explicitly allowed below.

#![deny(unsafe_code)]

pub mod config;
pub mod errno;
pub mod layout;
#[allow(unsafe_code)]
pub mod os;
#[allow(unsafe_code)]
pub mod sync;
#[allow(unsafe_code)]
pub mod thread;

//! Error number definitions.
//!
//! errno-style result codes for the adapted POSIX surface, with
//! thread-local errno storage for the `sem_*` family (which reports
//! failure as `-1` + errno rather than a returned code).

use std::cell::Cell;

thread_local! {
    static ERRNO: Cell<i32> = const { Cell::new(0) };
}

/// Operation not permitted.
pub const EPERM: i32 = 1;
/// No such process.
pub const ESRCH: i32 = 3;
/// Resource temporarily unavailable.
pub const EAGAIN: i32 = 11;
/// Out of memory.
pub const ENOMEM: i32 = 12;
/// Device or resource busy.
pub const EBUSY: i32 = 16;
/// Invalid argument.
pub const EINVAL: i32 = 22;

/// Returns the current thread-local errno value.
#[must_use]
pub fn get_errno() -> i32 {
    ERRNO.get()
}

/// Sets the current thread-local errno value.
pub fn set_errno(value: i32) {
    ERRNO.set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_is_thread_local() {
        set_errno(EBUSY);
        assert_eq!(get_errno(), EBUSY);

        let other = std::thread::spawn(|| {
            assert_eq!(get_errno(), 0);
            set_errno(EINVAL);
            get_errno()
        });
        assert_eq!(other.join().unwrap(), EINVAL);
        assert_eq!(get_errno(), EBUSY);
    }
}
